//! Instruction emitters.
//!
//! Each helper encodes one instruction, appends it to the chunk and returns
//! its index so the caller can backpatch forward jumps.

use crate::{
    bytecode::{
        chunk::Chunk,
        op::{Instruction, Opcode},
    },
    lang::op::BinaryOp,
};

/// Register index.
pub type Reg = u8;

fn rrr(chunk: &mut Chunk, opcode: Opcode, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    let mut ins = Instruction::new(opcode);
    ins.set_reg(0, dst);
    ins.set_reg(1, lhs);
    ins.set_reg(2, rhs);
    chunk.push(ins)
}

fn with_target(chunk: &mut Chunk, opcode: Opcode, target: i64) -> usize {
    let mut ins = Instruction::new(opcode);
    ins.set_imm(0, target);
    chunk.push(ins)
}

pub fn mov_ri(chunk: &mut Chunk, dst: Reg, imm: i64) -> usize {
    let mut ins = Instruction::new(Opcode::MovRi);
    ins.set_reg(0, dst);
    ins.set_imm(1, imm);
    chunk.push(ins)
}

pub fn mov_rr(chunk: &mut Chunk, dst: Reg, src: Reg) -> usize {
    let mut ins = Instruction::new(Opcode::MovRr);
    ins.set_reg(0, dst);
    ins.set_reg(1, src);
    chunk.push(ins)
}

/// Any three-register instruction: arithmetic or comparison.
pub fn arith(chunk: &mut Chunk, opcode: Opcode, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, opcode, dst, lhs, rhs)
}

pub fn add(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Add, dst, lhs, rhs)
}

pub fn sub(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Sub, dst, lhs, rhs)
}

pub fn mul(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Mul, dst, lhs, rhs)
}

pub fn div(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Div, dst, lhs, rhs)
}

pub fn modulo(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Mod, dst, lhs, rhs)
}

pub fn pow(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::Pow, dst, lhs, rhs)
}

pub fn cmp_eq(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpEq, dst, lhs, rhs)
}

pub fn cmp_ne(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpNe, dst, lhs, rhs)
}

pub fn cmp_lt(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpLt, dst, lhs, rhs)
}

pub fn cmp_le(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpLe, dst, lhs, rhs)
}

pub fn cmp_gt(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpGt, dst, lhs, rhs)
}

pub fn cmp_ge(chunk: &mut Chunk, dst: Reg, lhs: Reg, rhs: Reg) -> usize {
    rrr(chunk, Opcode::CmpGe, dst, lhs, rhs)
}

pub fn halt(chunk: &mut Chunk) -> usize {
    chunk.push(Instruction::new(Opcode::Halt))
}

pub fn fcall(chunk: &mut Chunk, target: i64) -> usize {
    with_target(chunk, Opcode::FCall, target)
}

pub fn fret(chunk: &mut Chunk) -> usize {
    chunk.push(Instruction::new(Opcode::FRet))
}

pub fn debug_log(chunk: &mut Chunk, reg: Reg) -> usize {
    let mut ins = Instruction::new(Opcode::DebugLog);
    ins.set_imm(0, i64::from(reg));
    chunk.push(ins)
}

pub fn jmp(chunk: &mut Chunk, target: i64) -> usize {
    with_target(chunk, Opcode::Jmp, target)
}

pub fn if_true(chunk: &mut Chunk, reg: Reg, target: i64) -> usize {
    let mut ins = Instruction::new(Opcode::IfTrue);
    ins.set_reg(0, reg);
    ins.set_imm(1, target);
    chunk.push(ins)
}

pub fn if_false(chunk: &mut Chunk, reg: Reg, target: i64) -> usize {
    let mut ins = Instruction::new(Opcode::IfFalse);
    ins.set_reg(0, reg);
    ins.set_imm(1, target);
    chunk.push(ins)
}

/// Compare-and-branch (`BLT` .. `BNE`).
pub fn branch(chunk: &mut Chunk, opcode: Opcode, lhs: Reg, rhs: Reg, target: i64) -> usize {
    let mut ins = Instruction::new(opcode);
    ins.set_reg(0, lhs);
    ins.set_reg(1, rhs);
    ins.set_imm(2, target);
    chunk.push(ins)
}

/// The three-register opcode that computes `op`.
pub fn opcode_for(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Pow => Opcode::Pow,
        BinaryOp::Lt => Opcode::CmpLt,
        BinaryOp::Le => Opcode::CmpLe,
        BinaryOp::Gt => Opcode::CmpGt,
        BinaryOp::Ge => Opcode::CmpGe,
        BinaryOp::Eq => Opcode::CmpEq,
        BinaryOp::Ne => Opcode::CmpNe,
    }
}
