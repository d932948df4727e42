use thiserror::Error;

use crate::bytecode::chunk::ChunkError;

/// Error reported while lowering the tree to bytecode.
///
/// Names carry the scope-qualified spelling (`global@f@x`) so that errors in
/// function bodies can be told apart from top-level ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("the var `{0}` is not mutable")]
    ImmutableVariable(String),

    #[error("undefined var `{0}`")]
    UndefinedVariable(String),

    #[error("undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("redefined function `{0}`")]
    DuplicateFunction(String),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("function `{name}` takes {expected} argument(s), {found} given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("out of registers")]
    RegistersExhausted,

    /// Internal generator error (shouldn't happen in normal use)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChunkError> for CompileError {
    fn from(err: ChunkError) -> Self {
        CompileError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CompileError::ImmutableVariable("global@x".to_string());
        assert_eq!(err.to_string(), "the var `global@x` is not mutable");

        let err = CompileError::ArityMismatch {
            name: "add".to_string(),
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "function `add` takes 2 argument(s), 1 given");
    }

    #[test]
    fn test_from_chunk_error() {
        let err: CompileError = ChunkError::OutOfRange { index: 3, len: 1 }.into();
        assert!(matches!(err, CompileError::Internal(_)));
        assert!(err.to_string().contains("out of range"));
    }
}
