//! Compound value types: arrays, hashes and ranges

use std::cell::{Cell, Ref, RefCell};

use indexmap::IndexMap;

use super::{HashKey, Value};
use crate::error::EvalError;

/// A mutable, freezable array.
#[derive(Debug, Default)]
pub struct ArrayValue {
    items: RefCell<Vec<Value>>,
    frozen: Cell<bool>,
}

impl ArrayValue {
    /// Create an array from its items.
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }
    }

    /// Borrow the items. The borrow must not be held across script calls.
    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    /// Snapshot of the items, safe to iterate while calling back into
    /// script code.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether the array has no items.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Item at a possibly negative index.
    pub fn get(&self, index: i64) -> Option<Value> {
        let items = self.items.borrow();
        let index = resolve_index(index, items.len())?;
        items.get(index).cloned()
    }

    /// Append an item.
    pub fn push(&self, value: Value) -> Result<(), EvalError> {
        self.modify(|items| items.push(value))
    }

    /// Store at a possibly negative index, padding with `nil`.
    pub fn set(&self, index: i64, value: Value) -> Result<(), EvalError> {
        let len = self.len();
        let Some(index) = resolve_index(index, len).or_else(|| {
            // positive indexes past the end grow the array
            usize::try_from(index).ok()
        }) else {
            return Err(EvalError::Range {
                message: format!("index {} too small for array; minimum: -{}", index, len),
            });
        };
        self.modify(|items| {
            if index >= items.len() {
                items.resize(index + 1, Value::Nil);
            }
            items[index] = value;
        })
    }

    /// Apply a mutation, failing when frozen.
    pub fn modify<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, EvalError> {
        self.check_frozen()?;
        Ok(f(&mut self.items.borrow_mut()))
    }

    /// Fail with a frozen error when frozen.
    pub fn check_frozen(&self) -> Result<(), EvalError> {
        if self.frozen.get() {
            return Err(EvalError::frozen(format!(
                "can't modify frozen Array: {}",
                super::inspect(&Value::Array(std::rc::Rc::new(ArrayValue::new(self.to_vec()))))
            )));
        }
        Ok(())
    }

    /// Freeze in place.
    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    /// Whether frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }
}

/// Map a possibly negative index onto `0..len`.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// A mutable, insertion-ordered, freezable hash.
#[derive(Debug)]
pub struct HashValue {
    entries: RefCell<IndexMap<HashKey, Value>>,
    default: RefCell<Value>,
    frozen: Cell<bool>,
}

impl Default for HashValue {
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

impl HashValue {
    /// Create a hash from its entries.
    pub fn new(entries: IndexMap<HashKey, Value>) -> Self {
        Self {
            entries: RefCell::new(entries),
            default: RefCell::new(Value::Nil),
            frozen: Cell::new(false),
        }
    }

    /// Create a hash from key/value pairs; later keys win.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (HashKey(k), v))
                .collect(),
        )
    }

    /// Value for missing keys.
    pub fn default_value(&self) -> Value {
        self.default.borrow().clone()
    }

    /// Set the value for missing keys.
    pub fn set_default(&self, value: Value) {
        *self.default.borrow_mut() = value;
    }

    /// Look a key up.
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries.borrow().get(&HashKey(key.clone())).cloned()
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.borrow().contains_key(&HashKey(key.clone()))
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: Value, value: Value) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.entries.borrow_mut().insert(HashKey(key), value);
        Ok(())
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&self, key: &Value) -> Result<Option<Value>, EvalError> {
        self.check_frozen()?;
        Ok(self
            .entries
            .borrow_mut()
            .shift_remove(&HashKey(key.clone())))
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.entries.borrow_mut().clear();
        Ok(())
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of the keys.
    pub fn keys(&self) -> Vec<Value> {
        self.entries.borrow().keys().map(|k| k.0.clone()).collect()
    }

    /// Snapshot of the values.
    pub fn values(&self) -> Vec<Value> {
        self.entries.borrow().values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the hash has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Fail with a frozen error when frozen.
    pub fn check_frozen(&self) -> Result<(), EvalError> {
        if self.frozen.get() {
            return Err(EvalError::frozen("can't modify frozen Hash"));
        }
        Ok(())
    }

    /// Freeze in place.
    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    /// Whether frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }
}

/// An immutable range of values.
#[derive(Debug, Clone)]
pub struct RangeValue {
    /// Lower bound
    pub start: Value,
    /// Upper bound
    pub end: Value,
    /// `...` excludes the upper bound
    pub exclusive: bool,
}

impl RangeValue {
    /// Create a range.
    pub fn new(start: Value, end: Value, exclusive: bool) -> Self {
        Self {
            start,
            end,
            exclusive,
        }
    }

    /// Integer bounds as an inclusive pair, when both bounds are integers.
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        let start = self.start.as_i64()?;
        let end = self.end.as_i64()?;
        Some(if self.exclusive {
            (start, end.saturating_sub(1))
        } else {
            (start, end)
        })
    }

    /// Numeric containment. Requires numeric bounds and subject.
    pub fn contains_numeric(&self, value: &Value) -> bool {
        let (Some(start), Some(end), Some(v)) =
            (self.start.as_f64(), self.end.as_f64(), value.as_f64())
        else {
            return false;
        };
        if self.exclusive {
            start <= v && v < end
        } else {
            start <= v && v <= end
        }
    }

    /// Items of an integer range.
    pub fn to_vec(&self) -> Result<Vec<Value>, EvalError> {
        let Some((start, end)) = self.int_bounds() else {
            return Err(EvalError::type_error(format!(
                "can't iterate from {}",
                self.start.type_name()
            )));
        };
        Ok((start..=end).map(Value::Long).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_index() {
        let array = ArrayValue::new(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
        assert_eq!(array.get(-1), Some(Value::Long(3)));
        assert_eq!(array.get(3), None);
    }

    #[test]
    fn test_set_pads_with_nil() {
        let array = ArrayValue::new(vec![]);
        array.set(2, Value::Long(9)).unwrap();
        assert_eq!(array.to_vec(), vec![Value::Nil, Value::Nil, Value::Long(9)]);
    }

    #[test]
    fn test_frozen_array_rejects_push() {
        let array = ArrayValue::new(vec![Value::Long(1)]);
        array.freeze();
        let err = array.push(Value::Long(2)).unwrap_err();
        assert!(matches!(err, EvalError::Frozen { .. }));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_hash_keeps_insertion_order() {
        let hash = HashValue::default();
        hash.insert(Value::symbol("b"), Value::Long(1)).unwrap();
        hash.insert(Value::symbol("a"), Value::Long(2)).unwrap();
        hash.remove(&Value::symbol("b")).unwrap();
        hash.insert(Value::symbol("b"), Value::Long(3)).unwrap();
        assert_eq!(hash.keys(), vec![Value::symbol("a"), Value::symbol("b")]);
    }

    #[test]
    fn test_integer_and_long_keys_collide() {
        let hash = HashValue::default();
        hash.insert(Value::Int(1), Value::string("x")).unwrap();
        assert_eq!(hash.get(&Value::Long(1)), Some(Value::string("x")));
    }

    #[test]
    fn test_exclusive_range() {
        let range = RangeValue::new(Value::Long(1), Value::Long(4), true);
        assert_eq!(range.to_vec().unwrap().len(), 3);
        assert!(!range.contains_numeric(&Value::Long(4)));
        assert!(range.contains_numeric(&Value::Float(3.5)));
    }
}
