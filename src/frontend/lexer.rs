use crate::frontend::token::{Token, TokenKind};

/// Converts source text into a token sequence.
///
/// Tokenizing never fails: characters that start no token become
/// `TokenKind::Unknown` tokens for the parser to reject. The sequence always
/// ends with exactly one `TokenKind::Eof`.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    /// Consumes the current char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn read_string(&mut self) -> String {
        self.advance(); // opening quote
        let text = self.read_while(|c| c != '"');
        // An unterminated literal simply runs to the end of input.
        self.eat('"');
        text
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let (line, col) = (self.line, self.col);
        let tok = |kind: TokenKind, text: &str| Token::new(kind, text, line, col);

        let Some(ch) = self.current() else {
            return tok(TokenKind::Eof, "");
        };

        if ch.is_ascii_digit() {
            let digits = self.read_while(|c| c.is_ascii_digit());
            return tok(TokenKind::Number, &digits);
        }

        if ch.is_alphabetic() {
            let ident = self.read_while(char::is_alphanumeric);
            let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident);
            return tok(kind, &ident);
        }

        if ch == '"' {
            let text = self.read_string();
            return tok(TokenKind::String, &text);
        }

        self.advance();
        match ch {
            '+' => tok(TokenKind::Plus, "+"),
            '-' => tok(TokenKind::Minus, "-"),
            '*' => tok(TokenKind::Star, "*"),
            '/' => tok(TokenKind::Slash, "/"),
            '%' => tok(TokenKind::Percent, "%"),
            '^' => tok(TokenKind::Caret, "^"),
            '(' => tok(TokenKind::LParen, "("),
            ')' => tok(TokenKind::RParen, ")"),
            '[' => tok(TokenKind::LBracket, "["),
            ']' => tok(TokenKind::RBracket, "]"),
            '{' => tok(TokenKind::LBrace, "{"),
            '}' => tok(TokenKind::RBrace, "}"),
            ',' => tok(TokenKind::Comma, ","),
            '=' if self.eat('=') => tok(TokenKind::Eq, "=="),
            '=' => tok(TokenKind::Assign, "="),
            '!' if self.eat('=') => tok(TokenKind::NotEq, "!="),
            '!' => tok(TokenKind::Not, "!"),
            '<' if self.eat('=') => tok(TokenKind::LtEq, "<="),
            '<' => tok(TokenKind::Lt, "<"),
            '>' if self.eat('=') => tok(TokenKind::GtEq, ">="),
            '>' => tok(TokenKind::Gt, ">"),
            ':' if self.eat(':') => tok(TokenKind::ColonColon, "::"),
            ':' => tok(TokenKind::Colon, ":"),
            other => tok(TokenKind::Unknown, &other.to_string()),
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

/// Convenience wrapper around `Lexer::tokenize`.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
