use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the bare source text
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        for t in tokens {
            println!("{}", self.render(t));
        }
    }

    /// One listing line: position, category, kind and text.
    pub fn render(&self, t: &Token) -> String {
        let colr = if self.color { self.color(t.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };
        let category = self.category(t.kind);

        if self.show_debug_repr {
            format!(
                "[{:02}:{:02}] {}{:<8} {:<10} {:?}{}",
                t.line, t.col, colr, category, t.kind, t.text, reset
            )
        } else {
            format!(
                "[{:02}:{:02}] {}{:<8} {}{}",
                t.line, t.col, colr, category, t.text, reset
            )
        }
    }

    fn category(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => "EOF",

            // literals
            Number => "NUMBER",
            String => "STRING",
            True | False => "BOOL",

            // names
            Ident => "IDENT",

            // structure
            LParen | RParen => "PAREN",
            LBracket | RBracket => "BRACKET",
            LBrace | RBrace => "BRACE",
            Colon | ColonColon | Comma => "PUNCT",

            // ops / comparisons
            Plus | Minus | Star | Slash | Percent | Caret | Not => "OP",
            Eq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            Assign => "ASSIGN",

            Func | Return | If | Else | Let => "KEYWORD",
            Unknown => "UNKNOWN",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => Self::DIM,
            String => Self::GRN,
            Number | True | False => Self::CYN,
            Ident => Self::YEL,
            Plus | Minus | Star | Slash | Percent | Caret | Not | Assign => Self::MAG,
            Eq | NotEq | Lt | LtEq | Gt | GtEq => Self::MAG,
            Unknown => Self::RED,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    #[test]
    fn test_render_plain() {
        let tokens = tokenize("let x = 5");
        let dumper = TokenDumper::new().no_color();
        assert_eq!(
            dumper.render(&tokens[0]),
            "[01:01] KEYWORD  KW_LET     \"let\""
        );
        assert_eq!(
            dumper.render(&tokens[3]),
            "[01:09] NUMBER   NUMBER     \"5\""
        );
    }

    #[test]
    fn test_render_pretty() {
        let tokens = tokenize("a <= b");
        let dumper = TokenDumper::new().no_color().pretty();
        assert_eq!(dumper.render(&tokens[1]), "[01:03] CMP      <=");
    }

    #[test]
    fn test_render_colored() {
        let tokens = tokenize("@");
        let line = TokenDumper::new().render(&tokens[0]);
        assert!(line.starts_with("[01:01] \x1b[31m"));
        assert!(line.ends_with("\x1b[0m"));
    }
}
