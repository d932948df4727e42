//! Operator semantics shared by the tree-walking evaluator and the VM.
//!
//! Both execution paths decode operators through this module so that a
//! literal-only expression produces the same value either way.

/// Binary operator, decoded from its source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Failure of an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    DivisionByZero,
    ModuloByZero,
    /// `0 ^ n` with negative `n`.
    ZeroToNegativePower,
}

impl BinaryOp {
    /// Decodes operator text by its first character, using the second
    /// character to tell `<`/`<=` and `>`/`>=` apart. `=` and `!` are only
    /// operators when followed by `=`; bare `=` or `!` yields `None`.
    pub fn from_text(text: &str) -> Option<BinaryOp> {
        let mut chars = text.chars();
        let first = chars.next()?;
        let second = chars.next();
        let op = match (first, second) {
            ('+', _) => BinaryOp::Add,
            ('-', _) => BinaryOp::Sub,
            ('*', _) => BinaryOp::Mul,
            ('/', _) => BinaryOp::Div,
            ('%', _) => BinaryOp::Mod,
            ('^', _) => BinaryOp::Pow,
            ('<', Some('=')) => BinaryOp::Le,
            ('<', _) => BinaryOp::Lt,
            ('>', Some('=')) => BinaryOp::Ge,
            ('>', _) => BinaryOp::Gt,
            ('=', Some('=')) => BinaryOp::Eq,
            ('!', Some('=')) => BinaryOp::Ne,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    /// Applies the operator to two 64-bit integers.
    ///
    /// Add/sub/mul wrap on overflow, division and modulo truncate toward
    /// zero, comparisons produce `1` or `0`.
    pub fn apply(self, a: i64, b: i64) -> Result<i64, ArithError> {
        let value = match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(ArithError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(ArithError::ModuloByZero);
                }
                a.wrapping_rem(b)
            }
            BinaryOp::Pow => int_pow(a, b)?,
            BinaryOp::Lt => (a < b) as i64,
            BinaryOp::Le => (a <= b) as i64,
            BinaryOp::Gt => (a > b) as i64,
            BinaryOp::Ge => (a >= b) as i64,
            BinaryOp::Eq => (a == b) as i64,
            BinaryOp::Ne => (a != b) as i64,
        };
        Ok(value)
    }
}

/// Integer exponentiation with the truncation a floating-point `pow`
/// followed by an integer cast would give: a negative exponent yields `0`
/// unless the base is `1` or `-1`.
pub fn int_pow(base: i64, exp: i64) -> Result<i64, ArithError> {
    if exp < 0 {
        return match base {
            0 => Err(ArithError::ZeroToNegativePower),
            1 => Ok(1),
            -1 => Ok(if exp % 2 == 0 { 1 } else { -1 }),
            _ => Ok(0),
        };
    }

    let mut result: i64 = 1;
    let mut base = base;
    let mut exp = exp as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    Ok(result)
}

/// Prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

impl UnaryOp {
    pub fn from_text(text: &str) -> Option<UnaryOp> {
        match text {
            "+" => Some(UnaryOp::Plus),
            "-" => Some(UnaryOp::Neg),
            "!" => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn apply(self, value: i64) -> i64 {
        match self {
            UnaryOp::Plus => value,
            UnaryOp::Neg => 0i64.wrapping_sub(value),
            UnaryOp::Not => (value == 0) as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_disambiguates_second_char() {
        assert_eq!(BinaryOp::from_text("<"), Some(BinaryOp::Lt));
        assert_eq!(BinaryOp::from_text("<="), Some(BinaryOp::Le));
        assert_eq!(BinaryOp::from_text(">"), Some(BinaryOp::Gt));
        assert_eq!(BinaryOp::from_text(">="), Some(BinaryOp::Ge));
        assert_eq!(BinaryOp::from_text("=="), Some(BinaryOp::Eq));
        assert_eq!(BinaryOp::from_text("!="), Some(BinaryOp::Ne));
    }

    #[test]
    fn test_bare_assign_and_not_are_not_binary_ops() {
        assert_eq!(BinaryOp::from_text("="), None);
        assert_eq!(BinaryOp::from_text("!"), None);
        assert_eq!(BinaryOp::from_text(""), None);
        assert_eq!(BinaryOp::from_text("&"), None);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(BinaryOp::Mod.apply(7, 2), Ok(1));
        assert_eq!(BinaryOp::Pow.apply(2, 10), Ok(1024));
        assert_eq!(BinaryOp::Div.apply(-7, 2), Ok(-3));
        assert_eq!(BinaryOp::Mod.apply(-7, 2), Ok(-1));
        assert_eq!(BinaryOp::Add.apply(i64::MAX, 1), Ok(i64::MIN));
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        assert_eq!(BinaryOp::Div.apply(1, 0), Err(ArithError::DivisionByZero));
        assert_eq!(BinaryOp::Mod.apply(1, 0), Err(ArithError::ModuloByZero));
    }

    #[test]
    fn test_comparisons_yield_one_or_zero() {
        assert_eq!(BinaryOp::Lt.apply(1, 2), Ok(1));
        assert_eq!(BinaryOp::Ge.apply(1, 2), Ok(0));
        assert_eq!(BinaryOp::Ne.apply(3, 3), Ok(0));
    }

    #[test]
    fn test_negative_exponent_truncates() {
        assert_eq!(int_pow(2, -1), Ok(0));
        assert_eq!(int_pow(1, -5), Ok(1));
        assert_eq!(int_pow(-1, -3), Ok(-1));
        assert_eq!(int_pow(-1, -4), Ok(1));
        assert_eq!(int_pow(0, -1), Err(ArithError::ZeroToNegativePower));
        assert_eq!(int_pow(0, 0), Ok(1));
        assert_eq!(int_pow(-3, 3), Ok(-27));
    }

    #[test]
    fn test_unary() {
        assert_eq!(UnaryOp::Neg.apply(5), -5);
        assert_eq!(UnaryOp::Not.apply(0), 1);
        assert_eq!(UnaryOp::Not.apply(7), 0);
        assert_eq!(UnaryOp::Plus.apply(7), 7);
    }
}
