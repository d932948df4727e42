/// Contents of one VM register.
///
/// The generator only ever produces `Integer` values; the other variants
/// exist so a register can carry any scalar the bytecode format can encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),

    /// 64-bit floating-point number.
    Float(f64),

    /// Boolean value.
    Bool(bool),
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    /// Integer view of the register, as arithmetic instructions read it.
    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Integer(n) => *n,
            Value::Float(f) => *f as i64,
            Value::Bool(b) => *b as i64,
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.as_i64() != 0
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_view() {
        assert_eq!(Value::Integer(-3).as_i64(), -3);
        assert_eq!(Value::Float(2.9).as_i64(), 2);
        assert_eq!(Value::Bool(true).as_i64(), 1);
        assert_eq!(Value::default().as_i64(), 0);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(5).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
    }
}
