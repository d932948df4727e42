/// A brace-delimited statement sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Node>,
}

impl Block {
    pub fn new(stmts: Vec<Node>) -> Self {
        Block { stmts }
    }
}

/// Abstract syntax tree node.
///
/// The tree is built once by the parser and only read afterwards; every node
/// owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Top-level statement list.
    Program(Vec<Node>),

    /// `left op right`, operator kept as source text (`+`, `<=`, `==`, ...).
    Binary {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Prefix `+`, `-` or `!`.
    Unary { op: String, operand: Box<Node> },

    NumberLiteral(i64),

    /// Reverse-Polish expression. Reserved: the parser never builds it and
    /// both evaluation and generation treat it as inert.
    RpnExpr(Vec<String>),

    /// `let name = value` (immutable) or `name = value` (mutable).
    VarDecl {
        name: String,
        value: Box<Node>,
        mutable: bool,
    },

    VarRef(String),

    Block(Block),

    If {
        condition: Box<Node>,
        then_block: Block,
        else_block: Option<Block>,
    },

    FuncDecl {
        name: String,
        params: Vec<String>,
        body: Block,
    },

    FuncCall { name: String, args: Vec<Node> },

    Return(Box<Node>),
}

impl Node {
    pub fn binary(op: &str, left: Node, right: Node) -> Node {
        Node::Binary {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: &str, operand: Node) -> Node {
        Node::Unary {
            op: op.to_string(),
            operand: Box::new(operand),
        }
    }

    pub fn var_decl(name: &str, value: Node, mutable: bool) -> Node {
        Node::VarDecl {
            name: name.to_string(),
            value: Box::new(value),
            mutable,
        }
    }

    pub fn var_ref(name: &str) -> Node {
        Node::VarRef(name.to_string())
    }

    pub fn call(name: &str, args: Vec<Node>) -> Node {
        Node::FuncCall {
            name: name.to_string(),
            args,
        }
    }

    /// Short name of the variant, used in diagnostics and tree dumps.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Program(_) => "program",
            Node::Binary { .. } => "binary",
            Node::Unary { .. } => "unary",
            Node::NumberLiteral(_) => "number",
            Node::RpnExpr(_) => "rpn",
            Node::VarDecl { .. } => "var-decl",
            Node::VarRef(_) => "var-ref",
            Node::Block(_) => "block",
            Node::If { .. } => "if",
            Node::FuncDecl { .. } => "func-decl",
            Node::FuncCall { .. } => "call",
            Node::Return(_) => "return",
        }
    }

    /// True if the node's value lives in a variable's register, which must
    /// outlive the expression reading it. Looks through unary `+`, which
    /// hands back its operand's register unchanged.
    pub fn holds_binding(&self) -> bool {
        match self {
            Node::VarDecl { .. } | Node::VarRef(_) => true,
            Node::Unary { op, operand } if op == "+" => operand.holds_binding(),
            _ => false,
        }
    }
}
