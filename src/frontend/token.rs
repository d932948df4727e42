/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    // Assignment and punctuation
    Assign,
    Colon,
    ColonColon,
    Comma,
    Not,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Literals
    Number,
    String,
    True,
    False,
    Ident,

    // Keywords
    Func,
    Return,
    If,
    Else,
    Let,

    Unknown,
}

impl TokenKind {
    /// Maps an identifier spelling to its keyword or boolean kind.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        match ident {
            "func" => Some(TokenKind::Func),
            "return" => Some(TokenKind::Return),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "let" => Some(TokenKind::Let),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
        )
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Func | TokenKind::Return | TokenKind::If | TokenKind::Else | TokenKind::Let
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Eof => "EOF",
            TokenKind::Plus => "OPER_PLUS",
            TokenKind::Minus => "OPER_MINUS",
            TokenKind::Star => "OPER_MUL",
            TokenKind::Slash => "OPER_DIV",
            TokenKind::Percent => "OPER_MOD",
            TokenKind::Caret => "OPER_POW",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Colon => "COLON",
            TokenKind::ColonColon => "COL_COLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Not => "NOT",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACK",
            TokenKind::RBracket => "RBRACK",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Eq => "EQ",
            TokenKind::NotEq => "NE",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::LtEq => "LE",
            TokenKind::GtEq => "GE",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Ident => "IDENT",
            TokenKind::Func => "KW_FUNC",
            TokenKind::Return => "KW_RETURN",
            TokenKind::If => "KW_IF",
            TokenKind::Else => "KW_ELSE",
            TokenKind::Let => "KW_LET",
            TokenKind::Unknown => "UNKNOWN",
        };
        f.pad(name)
    }
}

/// A token with its source text and the 1-based position of its first
/// character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?}) at {}:{}", self.kind, self.text, self.line, self.col)
    }
}
