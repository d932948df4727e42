use thiserror::Error;

use crate::bytecode::{chunk::ChunkError, compile_error::CompileError};
use crate::frontend::parser_error::ParserError;
use crate::runtime::runtime_error::RuntimeError;

/// Exit status for parse and generation failures (`-1` as a process status).
pub const EXIT_COMPILE_FAILURE: i32 = 255;
/// Exit status for I/O and runtime failures.
pub const EXIT_FAILURE: i32 = 1;

/// Any failure of the pipeline, as reported by the drivers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", join(.0))]
    Parse(Vec<ParserError>),

    #[error("empty program")]
    EmptyProgram,

    #[error("{}", join(.0))]
    Compile(Vec<CompileError>),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("bytecode image: {0}")]
    Image(#[from] ChunkError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Parse(_) | Error::EmptyProgram | Error::Compile(_) => EXIT_COMPILE_FAILURE,
            _ => EXIT_FAILURE,
        }
    }
}
