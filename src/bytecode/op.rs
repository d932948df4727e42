use serde::{Deserialize, Serialize};

/// Size of an instruction's operand area in bytes.
pub const OPERAND_BYTES: usize = 12;

// =============================================================================
// OPCODE - Instruction set
// =============================================================================
//
// Operand notation: R = register index (1 byte), I = signed 64-bit value
// (8 bytes, native byte order), M = register + offset, C = constant pool slot.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// `MOV_RI dst, imm` - R I
    MovRi,
    /// Reserved: register <- memory.
    MovRm,
    /// `MOV_RR dst, src` - R R
    MovRr,
    /// Reserved: register <- constant pool.
    MovRc,
    /// Reserved: memory <- immediate.
    MovMi,
    /// Reserved: memory <- memory.
    MovMm,
    /// Reserved: memory <- register.
    MovMr,
    /// Reserved: memory <- constant pool.
    MovMc,

    // arithmetic: dst, lhs, rhs - R R R
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    Halt,
    /// `FCALL target` - I
    FCall,
    FRet,
    /// `DEBUG_LOG reg` - I (register index)
    DebugLog,

    // compare-and-branch: lhs, rhs, target - R R I
    Blt,
    Ble,
    Bgt,
    Bge,
    Beq,
    Bne,
    /// `JMP target` - I
    Jmp,

    // comparison: dst, lhs, rhs - R R R; dst <- 1 or 0
    CmpGe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpEq,
    CmpNe,

    /// `IF_TRUE reg, target` - R I
    IfTrue,
    /// `IF_FALSE reg, target` - R I
    IfFalse,
}

impl Opcode {
    /// Offset of the jump target inside the operand area, for opcodes that
    /// carry one.
    pub fn target_offset(self) -> Option<usize> {
        match self {
            Opcode::Jmp | Opcode::FCall => Some(0),
            Opcode::IfTrue | Opcode::IfFalse => Some(1),
            Opcode::Blt | Opcode::Ble | Opcode::Bgt | Opcode::Bge | Opcode::Beq | Opcode::Bne => {
                Some(2)
            }
            _ => None,
        }
    }

    /// Memory and constant-pool moves. Encodable, but nothing generates them
    /// and the VM rejects them.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Opcode::MovRm
                | Opcode::MovRc
                | Opcode::MovMi
                | Opcode::MovMm
                | Opcode::MovMr
                | Opcode::MovMc
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::MovRi => "MOV_RI",
            Opcode::MovRm => "MOV_RM",
            Opcode::MovRr => "MOV_RR",
            Opcode::MovRc => "MOV_RC",
            Opcode::MovMi => "MOV_MI",
            Opcode::MovMm => "MOV_MM",
            Opcode::MovMr => "MOV_MR",
            Opcode::MovMc => "MOV_MC",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Pow => "POW",
            Opcode::Halt => "HALT",
            Opcode::FCall => "FCALL",
            Opcode::FRet => "FRET",
            Opcode::DebugLog => "DEBUG_LOG",
            Opcode::Blt => "BLT",
            Opcode::Ble => "BLE",
            Opcode::Bgt => "BGT",
            Opcode::Bge => "BGE",
            Opcode::Beq => "BEQ",
            Opcode::Bne => "BNE",
            Opcode::Jmp => "JMP",
            Opcode::CmpGe => "CMP_GE",
            Opcode::CmpLt => "CMP_LT",
            Opcode::CmpLe => "CMP_LE",
            Opcode::CmpGt => "CMP_GT",
            Opcode::CmpEq => "CMP_EQ",
            Opcode::CmpNe => "CMP_NE",
            Opcode::IfTrue => "IF_TRUE",
            Opcode::IfFalse => "IF_FALSE",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One fixed-width instruction: an opcode and 12 operand bytes whose layout
/// depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: [u8; OPERAND_BYTES],
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operands: [0; OPERAND_BYTES],
        }
    }

    /// Register index stored at byte `index`.
    pub fn reg(&self, index: usize) -> u8 {
        self.operands[index]
    }

    pub fn set_reg(&mut self, index: usize, reg: u8) {
        self.operands[index] = reg;
    }

    /// Signed 64-bit value stored at byte `offset`.
    pub fn imm(&self, offset: usize) -> i64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.operands[offset..offset + 8]);
        i64::from_ne_bytes(bytes)
    }

    pub fn set_imm(&mut self, offset: usize, value: i64) {
        self.operands[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
    }

    /// Jump target, for opcodes that carry one.
    pub fn target(&self) -> Option<i64> {
        self.opcode.target_offset().map(|offset| self.imm(offset))
    }
}
