//! Value representation for runtime values

mod callable;
mod compound;
mod display;
mod hashable;
mod impls;
mod object;

pub use callable::{Args, BuiltinFn, BuiltinFnPtr, Method, MethodDef, Proc, ProcBody};
pub use compound::{ArrayValue, HashValue, RangeValue};
pub(crate) use callable::next_id;
pub(crate) use compound::resolve_index;
pub(crate) use display::format_float;
pub use display::inspect;
pub use hashable::HashKey;
pub use object::{Class, ClassKind, Cref, Object};

use std::rc::Rc;

use crate::native::{NativeObject, NativeType};

/// Runtime value of the interpreter.
///
/// Values are organized into three tiers:
/// - Tier 1: Immediates (no allocation)
/// - Tier 2: Shared heap values (`Rc`-wrapped, interior mutability where the
///   language allows mutation)
/// - Tier 3: Callables, classes and host objects
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Immediates
    // ═══════════════════════════════════════════════════════════════════
    /// `nil`
    Nil,

    /// `true` / `false`
    Bool(bool),

    /// 32-bit integer, produced by host conversions and 32-bit arithmetic
    Int(i32),

    /// 64-bit integer (the type of integer literals)
    Long(i64),

    /// Double precision float
    Float(f64),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Shared heap values
    // ═══════════════════════════════════════════════════════════════════
    /// Immutable string
    Str(Rc<str>),

    /// Interned-by-value symbol
    Symbol(Rc<str>),

    /// Mutable array
    Array(Rc<ArrayValue>),

    /// Mutable insertion-ordered hash
    Hash(Rc<HashValue>),

    /// Immutable range
    Range(Rc<RangeValue>),

    /// Compiled regular expression
    Regex(Rc<regex::Regex>),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 3: Objects and callables
    // ═══════════════════════════════════════════════════════════════════
    /// Instance of a script class
    Object(Rc<Object>),

    /// Class or module
    Class(Rc<Class>),

    /// Block, proc or lambda
    Proc(Rc<Proc>),

    /// Host object wrapped by the native bridge
    Native(Rc<NativeObject>),

    /// Reference to a registered host type
    NativeType(Rc<NativeType>),

    /// Partial qualified host namespace (`Host` in `Host::Text::Builder`)
    NativeNamespace(Rc<str>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name of the built-in class of the value, for messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "NilClass".into(),
            Value::Bool(true) => "TrueClass".into(),
            Value::Bool(false) => "FalseClass".into(),
            Value::Int(_) | Value::Long(_) => "Integer".into(),
            Value::Float(_) => "Float".into(),
            Value::Str(_) => "String".into(),
            Value::Symbol(_) => "Symbol".into(),
            Value::Array(_) => "Array".into(),
            Value::Hash(_) => "Hash".into(),
            Value::Range(_) => "Range".into(),
            Value::Regex(_) => "Regexp".into(),
            Value::Object(o) => o.class().name().to_string(),
            Value::Class(c) if c.is_module() => "Module".into(),
            Value::Class(_) => "Class".into(),
            Value::Proc(_) => "Proc".into(),
            Value::Native(n) => n.native_type().name().to_string(),
            Value::NativeType(_) | Value::NativeNamespace(_) => "NativeType".into(),
        }
    }

    /// Integer or float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Float(_))
    }

    /// Integer value widened to 64 bits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            Value::Long(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String or symbol contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Freezing
    // ═══════════════════════════════════════════════════════════════════

    /// Freeze the value in place. Immediates and strings are always frozen.
    pub fn freeze(&self) {
        match self {
            Value::Array(a) => a.freeze(),
            Value::Hash(h) => h.freeze(),
            Value::Object(o) => o.freeze(),
            Value::Class(c) => c.freeze(),
            _ => {}
        }
    }

    /// Whether mutation is rejected.
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Array(a) => a.is_frozen(),
            Value::Hash(h) => h.is_frozen(),
            Value::Object(o) => o.is_frozen(),
            Value::Class(c) => c.is_frozen(),
            Value::Proc(_) | Value::Native(_) => false,
            _ => true,
        }
    }

    /// Freeze the value and everything reachable from it. Cycles are
    /// visited once.
    pub fn deep_freeze(&self) {
        let mut visited = Vec::new();
        self.deep_freeze_inner(&mut visited);
    }

    fn deep_freeze_inner(&self, visited: &mut Vec<usize>) {
        let Some(id) = self.heap_id() else {
            return;
        };
        if visited.contains(&id) {
            return;
        }
        visited.push(id);
        self.freeze();

        match self {
            Value::Array(a) => {
                for item in a.to_vec() {
                    item.deep_freeze_inner(visited);
                }
            }
            Value::Hash(h) => {
                for (k, v) in h.entries() {
                    k.deep_freeze_inner(visited);
                    v.deep_freeze_inner(visited);
                }
            }
            Value::Object(o) => {
                for (_, v) in o.ivars() {
                    v.deep_freeze_inner(visited);
                }
            }
            _ => {}
        }
    }

    /// Address of the shared allocation, for identity comparisons.
    pub fn heap_id(&self) -> Option<usize> {
        Some(match self {
            Value::Array(a) => Rc::as_ptr(a) as *const () as usize,
            Value::Hash(h) => Rc::as_ptr(h) as *const () as usize,
            Value::Range(r) => Rc::as_ptr(r) as *const () as usize,
            Value::Regex(r) => Rc::as_ptr(r) as *const () as usize,
            Value::Object(o) => Rc::as_ptr(o) as *const () as usize,
            Value::Class(c) => Rc::as_ptr(c) as *const () as usize,
            Value::Proc(p) => Rc::as_ptr(p) as *const () as usize,
            Value::Native(n) => Rc::as_ptr(n) as *const () as usize,
            Value::NativeType(t) => Rc::as_ptr(t) as *const () as usize,
            _ => return None,
        })
    }

    /// Identity comparison (`equal?`).
    pub fn same(&self, other: &Value) -> bool {
        match (self.heap_id(), other.heap_id()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Long(0).truthy());
        assert!(Value::string("").truthy());
    }

    #[test]
    fn test_strings_are_frozen() {
        assert!(Value::string("a").is_frozen());
        assert!(!Value::array(vec![]).is_frozen());
    }

    #[test]
    fn test_deep_freeze_nested() {
        let inner = Value::array(vec![Value::Long(1)]);
        let outer = Value::array(vec![inner.clone()]);
        outer.deep_freeze();
        assert!(outer.is_frozen());
        assert!(inner.is_frozen());
    }

    #[test]
    fn test_deep_freeze_self_reference_terminates() {
        let array = Value::array(vec![]);
        if let Value::Array(a) = &array {
            a.push(array.clone()).unwrap();
        }
        array.deep_freeze();
        assert!(array.is_frozen());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Long(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(1.5).as_i64(), None);
    }
}
