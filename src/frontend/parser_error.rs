use thiserror::Error;

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions of the token the parser was
/// looking at when it gave up on the construct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}
