//! Generic three-way comparison
//!
//! Numbers compare across integer widths and floats. Strings compare with
//! each other, and with numbers when they hold a numeric literal. Arrays
//! compare element-wise. Anything else is unordered and yields `None`,
//! which `<=>` reports as `nil`.

use std::cmp::Ordering;

use crate::Value;

/// Order two values, or `None` when they are not comparable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => {
            Some(left.as_i64()?.cmp(&right.as_i64()?))
        }
        (l, r) if l.is_numeric() && r.is_numeric() => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Symbol(a), Value::Symbol(b)) => Some(a.cmp(b)),
        (Value::Str(s), n) if n.is_numeric() => numeric_text(s)?.partial_cmp(&n.as_f64()?),
        (n, Value::Str(s)) if n.is_numeric() => n.as_f64()?.partial_cmp(&numeric_text(s)?),
        (Value::Array(a), Value::Array(b)) => {
            let (a, b) = (a.to_vec(), b.to_vec());
            for (x, y) in a.iter().zip(b.iter()) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        (Value::Nil, Value::Nil) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) if a == b => Some(Ordering::Equal),
        (l, r) if l.same(r) => Some(Ordering::Equal),
        _ => None,
    }
}

fn numeric_text(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// `<=>` result: -1, 0, 1 or `nil`.
pub fn spaceship(left: &Value, right: &Value) -> Value {
    match compare(left, right) {
        Some(ordering) => Value::Long(ordering as i64),
        None => Value::Nil,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mixed_numeric() {
        assert_eq!(compare(&Value::Int(2), &Value::Long(3)), Some(Ordering::Less));
        assert_eq!(compare(&Value::Long(2), &Value::Float(2.0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_numeric_string() {
        assert_eq!(compare(&Value::string("10"), &Value::Long(9)), Some(Ordering::Greater));
        assert_eq!(compare(&Value::string("abc"), &Value::Long(9)), None);
    }

    #[test]
    fn test_arrays_lexicographic() {
        let a = Value::array(vec![Value::Long(1), Value::Long(2)]);
        let b = Value::array(vec![Value::Long(1), Value::Long(3)]);
        assert_eq!(compare(&a, &b), Some(Ordering::Less));
    }

    #[test]
    fn test_spaceship_unordered_is_nil() {
        assert_eq!(spaceship(&Value::Long(1), &Value::string("x")), Value::Nil);
        assert_eq!(spaceship(&Value::Long(1), &Value::Long(2)), Value::Long(-1));
    }
}
