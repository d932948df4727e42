use log::error;

use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::node::{Block, Node};

/// Recursive-descent parser for LMX.
///
/// Precedence, lowest first:
/// - comparison (`== != < > <= >=`, right-associative)
/// - additive (`+ -`)
/// - multiplicative (`* / % ^`)
/// - prefix (`+ - !`)
/// - primary (number, `true`/`false`, `( expr )`, variable, call)
///
/// Errors do not abort parsing. Each one is recorded with its position and
/// sets a sticky flag; the caller must check `has_error()` before using the
/// tree. There is no resynchronization, but every error path either consumes
/// a token or stops at end of input, so parsing always terminates.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Set while parsing a function body; `return` is rejected otherwise.
    in_function: bool,
    errors: Vec<ParserError>,
}

impl Parser {
    /// Creates a parser over lexer output. A missing end-of-file token is
    /// appended so lookahead never runs off the end.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|t| t.is(TokenKind::Eof)) {
            let (line, col) = tokens.last().map(|t| (t.line, t.col)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, col));
        }
        Parser {
            tokens,
            pos: 0,
            in_function: false,
            errors: Vec::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParserError> {
        self.errors
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing EOF token.
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_next(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + 1).min(last)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().is(kind)
    }

    fn at_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn error(&mut self, message: impl Into<String>) {
        let token = self.current();
        let err = ParserError {
            message: message.into(),
            line: token.line,
            col: token.col,
        };
        error!("parse error: {}", err);
        self.errors.push(err);
    }

    /// Consumes a token of the given kind, or records `message` and leaves
    /// the stream untouched.
    fn expect(&mut self, kind: TokenKind, message: &str) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            self.error(message);
            false
        }
    }

    /// Parses statements until end of input.
    pub fn parse_program(&mut self) -> Node {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            if self.check(TokenKind::RBrace) {
                self.error("unexpected '}'");
                self.advance();
                continue;
            }
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            }
        }
        Node::Program(stmts)
    }

    /// Parses a single statement.
    ///
    /// Returns `None` when the statement was malformed (an error has been
    /// recorded) or when the input is empty.
    pub fn parse_statement(&mut self) -> Option<Node> {
        let start = self.pos;
        let node = self.statement();
        // Never leave the cursor where it was on failure.
        if node.is_none() && self.pos == start && !self.at_eof() {
            self.advance();
        }
        node
    }

    fn statement(&mut self) -> Option<Node> {
        match self.current().kind {
            TokenKind::Eof => None,
            TokenKind::Let => self.parse_let(),
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => {
                self.advance();
                self.parse_if()
            }
            TokenKind::Ident if self.peek_next().is(TokenKind::Assign) => {
                let name = self.advance().text;
                self.advance(); // '='
                let value = self.parse_expr()?;
                Some(Node::var_decl(&name, value, true))
            }
            _ => self.parse_expr(),
        }
    }

    /// `let name = expr`
    fn parse_let(&mut self) -> Option<Node> {
        self.advance(); // 'let'
        if !self.check(TokenKind::Ident) {
            self.error("expected identifier after 'let'");
            return None;
        }
        let name = self.advance().text;
        if !self.expect(TokenKind::Assign, "expected '=' after variable name") {
            return None;
        }
        let value = self.parse_expr()?;
        Some(Node::var_decl(&name, value, false))
    }

    /// `return expr`, only inside a function body.
    fn parse_return(&mut self) -> Option<Node> {
        self.advance(); // 'return'
        if !self.in_function {
            self.error("'return' outside of a function");
        }
        let value = self.parse_expr()?;
        Some(Node::Return(Box::new(value)))
    }

    /// `func name(a, b) { ... }`
    fn parse_func_decl(&mut self) -> Option<Node> {
        self.advance(); // 'func'
        if !self.check(TokenKind::Ident) {
            self.error("expected function name after 'func'");
            return None;
        }
        let name = self.advance().text;
        if !self.expect(TokenKind::LParen, "expected '(' after function name") {
            return None;
        }

        let mut params = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::Ident => params.push(self.advance().text),
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => {
                    self.error("expected identifier, ',' or ')' in parameter list");
                    return None;
                }
            }
        }

        let outer = std::mem::replace(&mut self.in_function, true);
        let body = self.parse_block();
        self.in_function = outer;

        Some(Node::FuncDecl { name, params, body })
    }

    /// `if (cond) { ... } [else { ... } | else if ...]`, after the `if`.
    fn parse_if(&mut self) -> Option<Node> {
        self.expect(TokenKind::LParen, "expected '(' after 'if'");
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "expected ')' after condition");
        let then_block = self.parse_block();

        let else_block = if self.check(TokenKind::Else) {
            self.advance();
            if self.check(TokenKind::If) {
                self.advance();
                let nested = self.parse_if()?;
                Some(Block::new(vec![nested]))
            } else {
                Some(self.parse_block())
            }
        } else {
            None
        };

        Some(Node::If {
            condition: Box::new(condition),
            then_block,
            else_block,
        })
    }

    /// `{ stmt* }`. Stops at the matching `}` or at end of input.
    fn parse_block(&mut self) -> Block {
        if !self.expect(TokenKind::LBrace, "expected '{'") {
            return Block::default();
        }
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            }
        }
        self.expect(TokenKind::RBrace, "expected '}'");
        Block::new(stmts)
    }

    /// Full expression, comparison tier included.
    pub fn parse_expr(&mut self) -> Option<Node> {
        let left = self.parse_additive()?;
        if self.current().kind.is_comparison() {
            let op = self.advance().text;
            let right = self.parse_expr()?;
            return Some(Node::binary(&op, left, right));
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Node> {
        let mut node = self.parse_term()?;
        while self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
            let op = self.advance().text;
            let right = self.parse_term()?;
            node = Node::binary(&op, node, right);
        }
        Some(node)
    }

    fn parse_term(&mut self) -> Option<Node> {
        let mut node = self.parse_unary()?;
        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::Caret
        ) {
            let op = self.advance().text;
            let right = self.parse_unary()?;
            node = Node::binary(&op, node, right);
        }
        Some(node)
    }

    fn parse_unary(&mut self) -> Option<Node> {
        if matches!(
            self.current().kind,
            TokenKind::Plus | TokenKind::Minus | TokenKind::Not
        ) {
            let op = self.advance().text;
            let operand = self.parse_unary()?;
            return Some(Node::unary(&op, operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Node> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                match token.text.parse::<i64>() {
                    Ok(n) => Some(Node::NumberLiteral(n)),
                    Err(_) => {
                        self.error(format!("integer literal out of range: {}", token.text));
                        None
                    }
                }
            }
            TokenKind::True => {
                self.advance();
                Some(Node::NumberLiteral(1))
            }
            TokenKind::False => {
                self.advance();
                Some(Node::NumberLiteral(0))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "missing closing ')'");
                Some(inner)
            }
            TokenKind::Ident => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    Some(Node::call(&token.text, args))
                } else {
                    Some(Node::var_ref(&token.text))
                }
            }
            TokenKind::Eof => {
                self.error("unexpected end of input, expected expression");
                None
            }
            TokenKind::String => {
                self.error("string literals are not supported in expressions");
                self.advance();
                None
            }
            TokenKind::Unknown => {
                self.error(format!("unexpected character '{}'", token.text));
                self.advance();
                None
            }
            _ => {
                self.error(format!("unexpected token '{}'", token.text));
                self.advance();
                None
            }
        }
    }

    /// Call arguments after the opening `(`, through the closing `)`.
    fn parse_args(&mut self) -> Option<Vec<Node>> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            self.advance();
            return Some(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Some(args);
                }
                _ => {
                    self.error("missing ',' or ')' in argument list");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Node {
        let mut parser = Parser::new(tokenize(source));
        let program = parser.parse_program();
        assert!(!parser.has_error(), "unexpected errors: {:?}", parser.errors());
        program
    }

    fn parse_err(source: &str) -> Vec<ParserError> {
        let mut parser = Parser::new(tokenize(source));
        parser.parse_program();
        assert!(parser.has_error(), "expected a parse error for {:?}", source);
        parser.into_errors()
    }

    fn stmts(source: &str) -> Vec<Node> {
        match parse(source) {
            Node::Program(stmts) => stmts,
            other => panic!("expected program, got {:?}", other),
        }
    }

    fn num(n: i64) -> Node {
        Node::NumberLiteral(n)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            stmts("1 + 2 * 3"),
            vec![Node::binary("+", num(1), Node::binary("*", num(2), num(3)))]
        );
    }

    #[test]
    fn test_additive_is_left_associative() {
        assert_eq!(
            stmts("1 - 2 - 3"),
            vec![Node::binary("-", Node::binary("-", num(1), num(2)), num(3))]
        );
    }

    #[test]
    fn test_comparison_is_right_associative_and_lowest() {
        assert_eq!(
            stmts("1 < 2 + 3 == 4"),
            vec![Node::binary(
                "<",
                num(1),
                Node::binary("==", Node::binary("+", num(2), num(3)), num(4))
            )]
        );
    }

    #[test]
    fn test_unary_binds_tighter_than_binary() {
        assert_eq!(
            stmts("-2 + 3"),
            vec![Node::binary("+", Node::unary("-", num(2)), num(3))]
        );
        assert_eq!(stmts("!!1"), vec![Node::unary("!", Node::unary("!", num(1)))]);
    }

    #[test]
    fn test_parenthesized() {
        assert_eq!(
            stmts("(1 + 2) * 3"),
            vec![Node::binary("*", Node::binary("+", num(1), num(2)), num(3))]
        );
    }

    #[test]
    fn test_let_is_immutable_and_assign_is_mutable() {
        assert_eq!(
            stmts("let x = 5 y = x"),
            vec![
                Node::var_decl("x", num(5), false),
                Node::var_decl("y", Node::var_ref("x"), true),
            ]
        );
    }

    #[test]
    fn test_call() {
        assert_eq!(
            stmts("add(1, 2 * 3) f()"),
            vec![
                Node::call("add", vec![num(1), Node::binary("*", num(2), num(3))]),
                Node::call("f", vec![]),
            ]
        );
    }

    #[test]
    fn test_func_decl() {
        assert_eq!(
            stmts("func add(a, b) { return a + b }"),
            vec![Node::FuncDecl {
                name: "add".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                body: Block::new(vec![Node::Return(Box::new(Node::binary(
                    "+",
                    Node::var_ref("a"),
                    Node::var_ref("b")
                )))]),
            }]
        );
    }

    #[test]
    fn test_if_else_if_chain() {
        let parsed = stmts("if (x < 1) { 1 } else if (x < 2) { 2 } else { 3 }");
        assert_eq!(
            parsed,
            vec![Node::If {
                condition: Box::new(Node::binary("<", Node::var_ref("x"), num(1))),
                then_block: Block::new(vec![num(1)]),
                else_block: Some(Block::new(vec![Node::If {
                    condition: Box::new(Node::binary("<", Node::var_ref("x"), num(2))),
                    then_block: Block::new(vec![num(2)]),
                    else_block: Some(Block::new(vec![num(3)])),
                }])),
            }]
        );
    }

    #[test]
    fn test_statement_after_if_is_not_swallowed() {
        let parsed = stmts("if (1) { 2 } 3");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], num(3));
    }

    #[test]
    fn test_booleans_are_numbers() {
        assert_eq!(stmts("true false"), vec![num(1), num(0)]);
    }

    #[test]
    fn test_return_outside_function() {
        let errors = parse_err("return 1");
        assert_eq!(errors[0].message, "'return' outside of a function");
        assert_eq!((errors[0].line, errors[0].col), (1, 8));
    }

    #[test]
    fn test_return_flag_restored_after_function() {
        let errors = parse_err("func f() { return 1 }\nreturn 2");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
    }

    #[test]
    fn test_nested_function_keeps_return_valid() {
        parse("func outer() { func inner() { return 1 } return inner() }");
    }

    #[test]
    fn test_missing_close_paren() {
        let errors = parse_err("(1 + 2");
        assert_eq!(errors[0].message, "missing closing ')'");
    }

    #[test]
    fn test_unknown_character_rejected() {
        let errors = parse_err("1 + @");
        assert_eq!(errors[0].message, "unexpected character '@'");
        assert_eq!((errors[0].line, errors[0].col), (1, 5));
    }

    #[test]
    fn test_unterminated_block() {
        let errors = parse_err("func f() { 1");
        assert_eq!(errors.last().unwrap().message, "expected '}'");
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let errors = parse_err("99999999999999999999");
        assert!(errors[0].message.contains("out of range"));
    }

    #[test]
    fn test_garbage_terminates() {
        let errors = parse_err(") ] , :: } = let 5");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_parse_statement_single() {
        let mut parser = Parser::new(tokenize("x = 1 + 1"));
        let node = parser.parse_statement();
        assert!(!parser.has_error());
        assert_eq!(
            node,
            Some(Node::var_decl("x", Node::binary("+", num(1), num(1)), true))
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Node::Program(vec![]));
        let mut parser = Parser::new(Vec::new());
        assert_eq!(parser.parse_statement(), None);
        assert!(!parser.has_error());
    }
}
