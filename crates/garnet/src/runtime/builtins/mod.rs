//! Builtin methods of the core classes
//!
//! Each submodule installs the methods of one class family. Builtins are
//! plain closures over `(machine, self, args)`; blocks arrive in
//! `args.block` and are called through the machine so that `next`,
//! `break` and `return` behave as they do for script methods.

mod array;
mod exception;
mod hash;
mod kernel;
mod module;
mod numeric;
mod proc;
mod range;
mod string;

use std::cmp::Ordering;
use std::rc::Rc;

use super::{CoreClasses, Machine};
use crate::eval::compare::compare;
use crate::value::{Args, ArrayValue, BuiltinFn, Class, HashValue, Proc, RangeValue, Value};
use crate::EvalError;

/// Install every builtin on a freshly bootstrapped hierarchy.
pub(super) fn install(core: &CoreClasses) {
    kernel::install(core);
    module::install(core);
    numeric::install(core);
    string::install(core);
    array::install(core);
    hash::install(core);
    range::install(core);
    proc::install(core);
    exception::install(core);
}

fn define(
    class: &Rc<Class>,
    name: &str,
    arity: i32,
    func: impl Fn(&Machine, &Value, Args) -> Result<Value, EvalError> + 'static,
) {
    class.define_builtin(BuiltinFn::new(name, arity, func));
}

fn define_static(
    class: &Rc<Class>,
    name: &str,
    arity: i32,
    func: impl Fn(&Machine, &Value, Args) -> Result<Value, EvalError> + 'static,
) {
    class
        .singleton_class()
        .define_builtin(BuiltinFn::new(name, arity, func));
}

// ═══════════════════════════════════════════════════════════════════════
// Receiver and argument helpers
// ═══════════════════════════════════════════════════════════════════════

fn wrong_receiver(expected: &str, got: &Value) -> EvalError {
    EvalError::type_error(format!("expected {}, got {}", expected, got.type_name()))
}

fn this_array(this: &Value) -> Result<&Rc<ArrayValue>, EvalError> {
    this.as_array().ok_or_else(|| wrong_receiver("Array", this))
}

fn this_hash(this: &Value) -> Result<&Rc<HashValue>, EvalError> {
    this.as_hash().ok_or_else(|| wrong_receiver("Hash", this))
}

fn this_str(this: &Value) -> Result<&str, EvalError> {
    match this {
        Value::Str(s) => Ok(s),
        other => Err(wrong_receiver("String", other)),
    }
}

fn int_arg(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(_) | Value::Long(_) => Ok(value.as_i64().unwrap_or_default()),
        Value::Float(x) => Ok(*x as i64),
        other => Err(EvalError::type_error(format!(
            "no implicit conversion of {} into Integer",
            conversion_name(other)
        ))),
    }
}

fn str_arg(value: &Value) -> Result<&str, EvalError> {
    match value {
        Value::Str(s) | Value::Symbol(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "no implicit conversion of {} into String",
            conversion_name(other)
        ))),
    }
}

fn conversion_name(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        other => other.type_name(),
    }
}

/// `start, count` slicing over a sequence of `len` items. A start equal to
/// `len` yields an empty span; anything further out yields `None`.
fn slice_span(start: i64, count: i64, len: usize) -> Option<(usize, usize)> {
    let n = i64::try_from(len).ok()?;
    let start = if start < 0 { start + n } else { start };
    if start < 0 || start > n || count < 0 {
        return None;
    }
    let end = start.saturating_add(count).min(n);
    Some((start as usize, (end - start) as usize))
}

/// Range slicing (`a[1..-2]`), with negative bounds counted from the end
/// and `nil` bounds open.
fn range_span(range: &RangeValue, len: usize) -> Result<Option<(usize, usize)>, EvalError> {
    let n = len as i64;
    let start = match &range.start {
        Value::Nil => 0,
        other => int_arg(other)?,
    };
    let end = match &range.end {
        Value::Nil => n,
        other => {
            let end = int_arg(other)?;
            let end = if end < 0 { end + n } else { end };
            if range.exclusive {
                end
            } else {
                end + 1
            }
        }
    };
    let start = if start < 0 { start + n } else { start };
    Ok(slice_span(start, (end - start).max(0), len))
}

/// Call a block with positional arguments.
fn yield_block(rt: &Machine, block: &Rc<Proc>, args: Vec<Value>) -> Result<Value, EvalError> {
    rt.call_proc(block, Args::new(args))
}

/// Ordering for `sort`, `min` and `max`: the block when given, otherwise
/// the generic comparer.
fn ordering(
    rt: &Machine,
    block: Option<&Rc<Proc>>,
    a: &Value,
    b: &Value,
) -> Result<Ordering, EvalError> {
    let result = match block {
        Some(block) => yield_block(rt, block, vec![a.clone(), b.clone()])?,
        None => match compare(a, b) {
            Some(ordering) => return Ok(ordering),
            None if matches!(a, Value::Object(_)) => {
                rt.call_method(a, "<=>", Args::new(vec![b.clone()]))?
            }
            None => Value::Nil,
        },
    };
    result
        .as_i64()
        .map(|n| n.cmp(&0))
        .ok_or_else(|| {
            EvalError::argument(format!(
                "comparison of {} with {} failed",
                a.type_name(),
                b.type_name()
            ))
        })
}

/// Sort with a fallible comparator; the first error wins.
fn sort_values(
    items: &mut [Value],
    mut cmp: impl FnMut(&Value, &Value) -> Result<Ordering, EvalError>,
) -> Result<(), EvalError> {
    let mut failure = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        cmp(a, b).unwrap_or_else(|err| {
            failure = Some(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_values_reports_first_error() {
        let mut items = vec![Value::Long(2), Value::string("a"), Value::Long(1)];
        let result = sort_values(&mut items, |a, b| {
            compare(a, b).ok_or_else(|| EvalError::argument("incomparable"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_spans() {
        assert_eq!(slice_span(1, 2, 5), Some((1, 2)));
        assert_eq!(slice_span(5, 1, 5), Some((5, 0)));
        assert_eq!(slice_span(6, 1, 5), None);
        let range = RangeValue::new(Value::Long(1), Value::Long(-2), false);
        assert_eq!(range_span(&range, 5).unwrap(), Some((1, 3)));
        let range = RangeValue::new(Value::Long(0), Value::Long(2), true);
        assert_eq!(range_span(&range, 5).unwrap(), Some((0, 2)));
    }

    #[test]
    fn test_int_arg_conversion_message() {
        let err = int_arg(&Value::Nil).unwrap_err();
        assert_eq!(err.to_string(), "no implicit conversion of nil into Integer");
    }
}
