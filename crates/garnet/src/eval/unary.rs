//! Unary operation evaluation

use std::rc::Rc;

use super::Evaluate;
use crate::ast::Expr;
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::Args;
use crate::{EvalError, Value};

/// `-x`
pub fn eval_negate(inner: &Expr, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    let value = inner.eval(scope, rt)?;
    negate(rt, &value)
}

/// Numeric negation; other receivers are sent `-@`.
pub fn negate(rt: &Machine, value: &Value) -> Result<Value, EvalError> {
    let overflow = || EvalError::range("integer overflow");
    match value {
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Long(n) => n.checked_neg().map(Value::Long).ok_or_else(overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => rt.call_method(other, "-@", Args::default()),
    }
}

/// `+x`
pub fn eval_plus(inner: &Expr, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    let value = inner.eval(scope, rt)?;
    if value.is_numeric() {
        return Ok(value);
    }
    rt.call_method(&value, "+@", Args::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_numbers() {
        let rt = Machine::new();
        assert_eq!(negate(&rt, &Value::Long(3)).unwrap(), Value::Long(-3));
        assert_eq!(negate(&rt, &Value::Float(1.5)).unwrap(), Value::Float(-1.5));
    }

    #[test]
    fn test_negate_overflow() {
        let rt = Machine::new();
        let err = negate(&rt, &Value::Long(i64::MIN)).unwrap_err();
        assert_eq!(err.class_name(), "RangeError");
    }

    #[test]
    fn test_negate_string_is_no_method() {
        let rt = Machine::new();
        let err = negate(&rt, &Value::string("a")).unwrap_err();
        assert_eq!(err.class_name(), "NoMethodError");
    }
}
