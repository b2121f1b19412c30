//! Value trait implementations: constructors, From traits, PartialEq

use super::*;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Create a symbol value
    pub fn symbol(s: impl AsRef<str>) -> Self {
        Value::Symbol(Rc::from(s.as_ref()))
    }

    /// Create an array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(ArrayValue::new(items)))
    }

    /// Create a hash value from pairs; later keys win
    pub fn hash(pairs: Vec<(Value, Value)>) -> Self {
        Value::Hash(Rc::new(HashValue::from_pairs(pairs)))
    }

    /// Create a range value
    pub fn range(start: Value, end: Value, exclusive: bool) -> Self {
        Value::Range(Rc::new(RangeValue::new(start, end, exclusive)))
    }

    /// Wrap a proc
    pub fn proc(p: Proc) -> Self {
        Value::Proc(Rc::new(p))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Non-negative integer as a `usize`.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|n| usize::try_from(n).ok())
    }

    /// Array payload.
    pub fn as_array(&self) -> Option<&Rc<ArrayValue>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Hash payload.
    pub fn as_hash(&self) -> Option<&Rc<HashValue>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Class or module payload.
    pub fn as_class(&self) -> Option<&Rc<Class>> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Proc payload.
    pub fn as_proc(&self) -> Option<&Rc<Proc>> {
        match self {
            Value::Proc(p) => Some(p),
            _ => None,
        }
    }

    /// Whether the value is `nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

// ═══════════════════════════════════════════════════════════════════
// PartialEq Implementation
// ═══════════════════════════════════════════════════════════════════

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,

            // Numbers compare by value across widths
            (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => {
                self.as_i64() == other.as_i64()
            }
            (Value::Float(_), _) | (_, Value::Float(_))
                if self.is_numeric() && other.is_numeric() =>
            {
                self.as_f64() == other.as_f64()
            }

            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,

            // Collections (element-wise comparison)
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || a.to_vec() == b.to_vec()
            }
            (Value::Hash(a), Value::Hash(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                a.len() == b.len()
                    && a.entries()
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| other == *v))
            }
            (Value::Range(a), Value::Range(b)) => {
                a.exclusive == b.exclusive && a.start == b.start && a.end == b.end
            }
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),

            (Value::Native(a), Value::Native(b)) => a.native_eq(b),
            (Value::NativeNamespace(a), Value::NativeNamespace(b)) => a == b,

            // Everything else by identity
            _ => matches!((self.heap_id(), other.heap_id()), (Some(a), Some(b)) if a == b),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Trait Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Value::Float(n as f64), Value::Long)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl From<Rc<Class>> for Value {
    fn from(c: Rc<Class>) -> Self {
        Value::Class(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_width_numeric_equality() {
        assert_eq!(Value::Int(2), Value::Long(2));
        assert_eq!(Value::Long(2), Value::Float(2.0));
        assert_ne!(Value::Long(2), Value::string("2"));
    }

    #[test]
    fn test_string_never_equals_symbol() {
        assert_ne!(Value::string("a"), Value::symbol("a"));
    }

    #[test]
    fn test_hash_equality_ignores_order() {
        let a = Value::hash(vec![
            (Value::symbol("x"), Value::Long(1)),
            (Value::symbol("y"), Value::Long(2)),
        ]);
        let b = Value::hash(vec![
            (Value::symbol("y"), Value::Long(2)),
            (Value::symbol("x"), Value::Long(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Nil);
        assert_eq!(Value::from(Some("x")), Value::string("x"));
    }
}
