//! Hashable wrapper for Value to enable use as hash keys

use std::hash::{Hash, Hasher};

use super::Value;

/// A wrapper for Value that implements Hash and Eq.
///
/// Integers hash by numeric value regardless of width, floats by bit
/// pattern, strings and symbols by contents (a string never equals a
/// symbol), arrays by their elements. Everything else hashes by identity.
#[derive(Debug, Clone)]
pub struct HashKey(pub Value);

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Nil => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Int(_) | Value::Long(_) => {
            2u8.hash(state);
            value.as_i64().hash(state);
        }
        Value::Float(f) => {
            3u8.hash(state);
            f.to_bits().hash(state);
        }
        Value::Str(s) => {
            4u8.hash(state);
            s.hash(state);
        }
        Value::Symbol(s) => {
            5u8.hash(state);
            s.hash(state);
        }
        Value::Array(a) => {
            6u8.hash(state);
            for item in a.to_vec() {
                hash_value(&item, state);
            }
        }
        Value::NativeNamespace(path) => {
            7u8.hash(state);
            path.hash(state);
        }
        other => {
            8u8.hash(state);
            other.heap_id().hash(state);
        }
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => a.as_i64() == b.as_i64(),
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) | (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.to_vec(), y.to_vec());
            x.len() == y.len() && x.iter().zip(&y).all(|(a, b)| key_eq(a, b))
        }
        (Value::NativeNamespace(x), Value::NativeNamespace(y)) => x == y,
        _ => matches!((a.heap_id(), b.heap_id()), (Some(x), Some(y)) if x == y),
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

impl Eq for HashKey {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_string_and_symbol_differ() {
        assert_ne!(HashKey(Value::string("a")), HashKey(Value::symbol("a")));
    }

    #[test]
    fn test_int_widths_are_one_key() {
        let mut set = HashSet::new();
        set.insert(HashKey(Value::Int(7)));
        assert!(set.contains(&HashKey(Value::Long(7))));
    }

    #[test]
    fn test_arrays_hash_by_contents() {
        let a = HashKey(Value::array(vec![Value::Long(1), Value::string("x")]));
        let b = HashKey(Value::array(vec![Value::Long(1), Value::string("x")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_objects_hash_by_identity() {
        let a = Value::hash(vec![]);
        let b = Value::hash(vec![]);
        assert_eq!(HashKey(a.clone()), HashKey(a.clone()));
        assert_ne!(HashKey(a), HashKey(b));
    }
}
