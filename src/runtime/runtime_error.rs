use thiserror::Error;

use crate::bytecode::op::Opcode;

/// Fault raised while executing bytecode. `pc` is the address of the
/// faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("division by zero at {pc:04}")]
    DivisionByZero { pc: usize },

    #[error("modulo by zero at {pc:04}")]
    ModuloByZero { pc: usize },

    #[error("zero raised to a negative power at {pc:04}")]
    ZeroToNegativePower { pc: usize },

    #[error("return with an empty return stack at {pc:04}")]
    ReturnStackUnderflow { pc: usize },

    #[error("program counter {pc} outside the program (len {len})")]
    PcOutOfRange { pc: usize, len: usize },

    #[error("jump to invalid address {target} at {pc:04}")]
    BadJumpTarget { pc: usize, target: i64 },

    #[error("register index {reg} out of range at {pc:04}")]
    BadRegister { pc: usize, reg: i64 },

    #[error("reserved opcode {opcode} at {pc:04}")]
    ReservedOpcode { pc: usize, opcode: Opcode },

    #[error("call depth limit exceeded ({limit}) at {pc:04} - possible infinite recursion")]
    CallDepthExceeded { pc: usize, limit: usize },

    #[error("execution step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },
}

impl RuntimeError {
    /// Address of the instruction that faulted, if there is one.
    pub fn pc(&self) -> Option<usize> {
        match self {
            RuntimeError::DivisionByZero { pc }
            | RuntimeError::ModuloByZero { pc }
            | RuntimeError::ZeroToNegativePower { pc }
            | RuntimeError::ReturnStackUnderflow { pc }
            | RuntimeError::PcOutOfRange { pc, .. }
            | RuntimeError::BadJumpTarget { pc, .. }
            | RuntimeError::BadRegister { pc, .. }
            | RuntimeError::ReservedOpcode { pc, .. }
            | RuntimeError::CallDepthExceeded { pc, .. } => Some(*pc),
            RuntimeError::StepLimitExceeded { .. } => None,
        }
    }
}
