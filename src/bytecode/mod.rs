//! # Register bytecode
//!
//! Instruction encoding, the append-only instruction buffer, the code
//! generator that lowers the tree into it, and a disassembler.

pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod emit;
pub mod generator;
pub mod op;

pub use chunk::{Chunk, ChunkError};
pub use compile::{generate, generate_block};
pub use compile_error::CompileError;
pub use generator::Generator;
pub use op::{Instruction, Opcode};
