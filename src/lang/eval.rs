use thiserror::Error;

use crate::lang::node::{Block, Node};
use crate::lang::op::{ArithError, BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("zero raised to a negative power")]
    ZeroToNegativePower,
}

impl From<ArithError> for EvalError {
    fn from(e: ArithError) -> Self {
        match e {
            ArithError::DivisionByZero => EvalError::DivisionByZero,
            ArithError::ModuloByZero => EvalError::ModuloByZero,
            ArithError::ZeroToNegativePower => EvalError::ZeroToNegativePower,
        }
    }
}

/// Tree-walking evaluation.
///
/// Covers literals, operators, `if` and statement sequences. Nodes that need
/// runtime state (variables, calls, returns) evaluate to `0`. For every
/// literal-only expression the result matches what the compiled bytecode
/// leaves in its result register.
pub fn evaluate(node: &Node) -> Result<i64, EvalError> {
    match node {
        Node::Program(children) => {
            let mut result = 0;
            for child in children {
                result = evaluate(child)?;
            }
            Ok(result)
        }
        Node::NumberLiteral(n) => Ok(*n),
        Node::Binary { op, left, right } => {
            let op = BinaryOp::from_text(op).ok_or_else(|| EvalError::UnknownOperator(op.clone()))?;
            let a = evaluate(left)?;
            let b = evaluate(right)?;
            Ok(op.apply(a, b)?)
        }
        Node::Unary { op, operand } => {
            let op = UnaryOp::from_text(op).ok_or_else(|| EvalError::UnknownOperator(op.clone()))?;
            Ok(op.apply(evaluate(operand)?))
        }
        Node::Block(block) => {
            evaluate_block(block)?;
            Ok(0)
        }
        Node::If {
            condition,
            then_block,
            else_block,
        } => {
            if evaluate(condition)? != 0 {
                evaluate_block(then_block)
            } else if let Some(else_block) = else_block {
                evaluate_block(else_block)
            } else {
                Ok(0)
            }
        }
        Node::RpnExpr(_)
        | Node::VarDecl { .. }
        | Node::VarRef(_)
        | Node::FuncDecl { .. }
        | Node::FuncCall { .. }
        | Node::Return(_) => Ok(0),
    }
}

/// Evaluates a block's statements in order; a block's own value is `0`.
fn evaluate_block(block: &Block) -> Result<i64, EvalError> {
    for stmt in &block.stmts {
        evaluate(stmt)?;
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Node {
        Node::NumberLiteral(n)
    }

    #[test]
    fn test_literal_and_operators() {
        let expr = Node::binary("+", num(1), Node::binary("*", num(2), num(3)));
        assert_eq!(evaluate(&expr), Ok(7));
        assert_eq!(evaluate(&Node::binary("%", num(7), num(2))), Ok(1));
        assert_eq!(evaluate(&Node::binary("^", num(2), num(10))), Ok(1024));
        assert_eq!(evaluate(&Node::unary("-", num(5))), Ok(-5));
        assert_eq!(evaluate(&Node::unary("!", num(0))), Ok(1));
        assert_eq!(evaluate(&Node::binary("<=", num(2), num(2))), Ok(1));
    }

    #[test]
    fn test_bare_assign_operator_is_an_error() {
        let expr = Node::binary("=", num(1), num(1));
        assert_eq!(
            evaluate(&expr),
            Err(EvalError::UnknownOperator("=".to_string()))
        );
        let expr = Node::binary("!", num(1), num(1));
        assert!(evaluate(&expr).is_err());
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate(&Node::binary("/", num(1), num(0))),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_program_returns_last_child() {
        let program = Node::Program(vec![num(1), num(2), num(3)]);
        assert_eq!(evaluate(&program), Ok(3));
        assert_eq!(evaluate(&Node::Program(vec![])), Ok(0));
    }

    #[test]
    fn test_block_evaluates_to_zero() {
        let block = Node::Block(Block::new(vec![num(42)]));
        assert_eq!(evaluate(&block), Ok(0));
    }

    #[test]
    fn test_if_takes_branch() {
        let taken = Node::If {
            condition: Box::new(Node::binary("<", num(1), num(2))),
            then_block: Block::new(vec![num(10)]),
            else_block: None,
        };
        assert_eq!(evaluate(&taken), Ok(0));

        // The untaken branch is not evaluated at all.
        let skipped = Node::If {
            condition: Box::new(num(0)),
            then_block: Block::new(vec![Node::binary("/", num(1), num(0))]),
            else_block: Some(Block::new(vec![num(1)])),
        };
        assert_eq!(evaluate(&skipped), Ok(0));
    }

    #[test]
    fn test_runtime_nodes_are_zero() {
        assert_eq!(evaluate(&Node::var_ref("x")), Ok(0));
        assert_eq!(evaluate(&Node::call("f", vec![num(1)])), Ok(0));
        assert_eq!(evaluate(&Node::RpnExpr(vec!["1".into()])), Ok(0));
    }
}
