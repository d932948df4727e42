//! # LMX language core
//!
//! The abstract syntax tree produced by the parser, the operator semantics
//! shared by every execution path, the tree-walking evaluator and the
//! register value type.

pub mod eval;
pub mod node;
pub mod op;
pub mod value;

pub use eval::{EvalError, evaluate};
pub use node::{Block, Node};
pub use value::Value;
