use std::collections::HashMap;

use crate::bytecode::{
    chunk::Chunk,
    op::{Instruction, Opcode},
};

/// Print disassembly of a chunk
pub fn print_chunk(chunk: &Chunk) {
    println!("════════════════════════════════════════");
    println!(" bytecode");
    println!(" {} instructions", chunk.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble(chunk));
    println!();
}

/// Return disassembly as a String
pub fn disassemble(chunk: &Chunk) -> String {
    let instructions = chunk.instructions();
    let jump_targets = collect_jump_targets(instructions);
    let mut output = String::new();

    for (ip, ins) in instructions.iter().enumerate() {
        let is_target = jump_targets.contains(&ip);
        if is_target {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!("{:04} ", ip));
        output.push_str(if is_target { "► " } else { "  " });
        output.push_str(&format_instruction(ins, ip));
        output.push('\n');
    }

    output
}

fn collect_jump_targets(instructions: &[Instruction]) -> Vec<usize> {
    let mut targets = Vec::new();

    for ins in instructions {
        // FCALL targets are function entries, marked like any other jump.
        if let Some(target) = ins.target()
            && target >= 0
        {
            let target = target as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn arrow(ip: usize, target: i64) -> &'static str {
    if target <= ip as i64 { "↑" } else { "↓" }
}

/// One instruction, mnemonic padded to a fixed column.
pub fn format_instruction(ins: &Instruction, ip: usize) -> String {
    let name = ins.opcode.mnemonic();
    match ins.opcode {
        Opcode::MovRi => format!("{:<11} r{}, {}", name, ins.reg(0), ins.imm(1)),
        Opcode::MovRr => format!("{:<11} r{}, r{}", name, ins.reg(0), ins.reg(1)),

        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::Pow
        | Opcode::CmpGe
        | Opcode::CmpLt
        | Opcode::CmpLe
        | Opcode::CmpGt
        | Opcode::CmpEq
        | Opcode::CmpNe => format!(
            "{:<11} r{}, r{}, r{}",
            name,
            ins.reg(0),
            ins.reg(1),
            ins.reg(2)
        ),

        Opcode::Jmp | Opcode::FCall => {
            let target = ins.imm(0);
            format!("{:<11} {} (→ {:04})", name, arrow(ip, target), target)
        }
        Opcode::IfTrue | Opcode::IfFalse => {
            let target = ins.imm(1);
            format!(
                "{:<11} r{}, {} (→ {:04})",
                name,
                ins.reg(0),
                arrow(ip, target),
                target
            )
        }
        Opcode::Blt | Opcode::Ble | Opcode::Bgt | Opcode::Bge | Opcode::Beq | Opcode::Bne => {
            let target = ins.imm(2);
            format!(
                "{:<11} r{}, r{}, {} (→ {:04})",
                name,
                ins.reg(0),
                ins.reg(1),
                arrow(ip, target),
                target
            )
        }

        Opcode::DebugLog => format!("{:<11} r{}", name, ins.imm(0)),
        Opcode::Halt | Opcode::FRet => name.to_string(),

        Opcode::MovRm
        | Opcode::MovRc
        | Opcode::MovMi
        | Opcode::MovMm
        | Opcode::MovMr
        | Opcode::MovMc => format!("{:<11} ; reserved {:02x?}", name, ins.operands),
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Print bytecode statistics
pub fn print_chunk_stats(chunk: &Chunk) {
    println!("=== BYTECODE STATISTICS ===\n");

    let total = chunk.len();
    println!("Instructions:     {}", total);
    println!();

    let counts = count_ops(chunk.instructions());

    println!("Op frequency:");
    let mut counts: Vec<_> = counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (op, count) in counts.iter().take(10) {
        let pct = (**count as f64 / total as f64) * 100.0;
        println!("  {:<14} {:>4} ({:>5.1}%)", op, count, pct);
    }
}

fn count_ops(instructions: &[Instruction]) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for ins in instructions {
        *counts.entry(ins.opcode.mnemonic()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::emit;

    fn sample() -> Chunk {
        // if (1 < 2) { 7 }
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 1);
        emit::mov_ri(&mut chunk, 2, 2);
        emit::cmp_lt(&mut chunk, 3, 1, 2);
        emit::if_true(&mut chunk, 3, 5);
        emit::jmp(&mut chunk, 6);
        emit::mov_ri(&mut chunk, 4, 7);
        emit::halt(&mut chunk);
        chunk
    }

    #[test]
    fn test_disassemble_lines() {
        let output = disassemble(&sample());
        assert!(output.contains("0000   MOV_RI      r1, 1"));
        assert!(output.contains("CMP_LT      r3, r1, r2"));
        assert!(output.contains("IF_TRUE     r3, ↓ (→ 0005)"));
        assert!(output.contains("JMP         ↓ (→ 0006)"));
        assert!(output.contains("HALT"));
    }

    #[test]
    fn test_jump_targets_marked() {
        let output = disassemble(&sample());
        assert!(output.contains("0005 ► MOV_RI"));
        assert!(output.contains("0006 ► HALT"));
        assert_eq!(output.matches('┌').count(), 2);
    }

    #[test]
    fn test_backward_jump_arrow() {
        let mut chunk = Chunk::new();
        emit::mov_ri(&mut chunk, 1, 0);
        emit::jmp(&mut chunk, 0);
        let line = format_instruction(&chunk.instructions()[1], 1);
        assert!(line.contains('↑'));
    }

    #[test]
    fn test_reserved_opcode_formats() {
        let ins = Instruction::new(Opcode::MovMc);
        assert!(format_instruction(&ins, 0).starts_with("MOV_MC"));
    }

    #[test]
    fn test_op_counts() {
        let counts = count_ops(sample().instructions());
        assert_eq!(counts.get("MOV_RI"), Some(&3));
        assert_eq!(counts.get("CMP_LT"), Some(&1));
        assert_eq!(counts.get("ADD"), None);
    }
}
