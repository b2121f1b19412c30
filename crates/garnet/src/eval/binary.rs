//! Binary operation evaluation

use std::cmp::Ordering;
use std::rc::Rc;

use super::compare::{compare, spaceship};
use super::Evaluate;
use crate::ast::{BinaryOp, Expr};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::{Args, Method};
use crate::{EvalError, Value};

/// Evaluate `left op right`. `&&` and `||` short-circuit.
pub fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            if !left.eval(scope, rt)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(right.eval(scope, rt)?.truthy()))
        }
        BinaryOp::Or => {
            if left.eval(scope, rt)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(right.eval(scope, rt)?.truthy()))
        }
        _ => {
            let left = left.eval(scope, rt)?;
            let right = right.eval(scope, rt)?;
            binary_op(rt, op, &left, &right)
        }
    }
}

/// Apply a non-short-circuit operator to evaluated operands.
///
/// Script objects and host objects receive the operator as a method call;
/// built-in values use the arithmetic and comparison rules below.
pub fn binary_op(rt: &Machine, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if matches!(left, Value::Object(_) | Value::Native(_)) {
        return dispatch_operator(rt, op, left, right);
    }
    match op {
        BinaryOp::Eq => Ok(Value::Bool(rt.values_equal(left, right)?)),
        BinaryOp::NotEq => Ok(Value::Bool(!rt.values_equal(left, right)?)),
        BinaryOp::Cmp => Ok(spaceship(left, right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(|| comparison_failed(left, right))?;
            Ok(Value::Bool(ordering_satisfies(op, ordering)))
        }
        BinaryOp::Add => add(rt, left, right),
        BinaryOp::Sub => sub(left, right),
        BinaryOp::Mul => mul(left, right),
        BinaryOp::Div | BinaryOp::Rem | BinaryOp::Pow => arithmetic(op, left, right),
        BinaryOp::And => Ok(Value::Bool(left.truthy() && right.truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.truthy() || right.truthy())),
    }
}

fn ordering_satisfies(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn comparison_failed(left: &Value, right: &Value) -> EvalError {
    EvalError::argument(format!(
        "comparison of {} with {} failed",
        left.type_name(),
        right.type_name()
    ))
}

/// Send the operator to an object receiver. Ordering operators fall back
/// to a user `<=>` and `!=` to the negation of `==`.
fn dispatch_operator(
    rt: &Machine,
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<Value, EvalError> {
    let name = op.method_name();
    let args = || Args::new(vec![right.clone()]);
    let user_defined = |name: &str| {
        matches!(
            rt.find_method(left, name),
            Some(Method::Interpreted(_)) | Some(Method::Block(_))
        )
    };

    match op {
        BinaryOp::NotEq if !user_defined("!=") => {
            let equal = rt.call_method(left, "==", args())?;
            Ok(Value::Bool(!equal.truthy()))
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
            if !rt.respond_to(left, name) && rt.respond_to(left, "<=>") =>
        {
            let result = rt.call_method(left, "<=>", args())?;
            let ordering = match result.as_i64() {
                Some(n) => n.cmp(&0),
                None => return Err(comparison_failed(left, right)),
            };
            Ok(Value::Bool(ordering_satisfies(op, ordering)))
        }
        _ => rt.call_method(left, name, args()),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

/// `+`: string concatenation when either side is a string, array
/// concatenation, otherwise numeric addition.
pub fn add(rt: &Machine, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(a), b) => Ok(Value::string(format!("{}{}", a, rt.display(b)?))),
        (a, Value::Str(b)) => Ok(Value::string(format!("{}{}", rt.display(a)?, b))),
        (Value::Array(a), Value::Array(b)) => {
            let mut items = a.to_vec();
            items.extend(b.to_vec());
            Ok(Value::array(items))
        }
        _ => arithmetic(BinaryOp::Add, left, right),
    }
}

/// `-`: array difference, otherwise numeric subtraction.
pub fn sub(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            let remove = b.to_vec();
            let items = a.to_vec().into_iter().filter(|x| !remove.contains(x)).collect();
            Ok(Value::array(items))
        }
        _ => arithmetic(BinaryOp::Sub, left, right),
    }
}

/// `*`: string and array repetition, otherwise numeric multiplication.
pub fn mul(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(s), n) if n.as_i64().is_some() => Ok(Value::string(s.repeat(repeat_count(n)?))),
        (Value::Array(a), n) if n.as_i64().is_some() => {
            let items = a.to_vec();
            let count = repeat_count(n)?;
            Ok(Value::array(
                std::iter::repeat(items).take(count).flatten().collect(),
            ))
        }
        _ => arithmetic(BinaryOp::Mul, left, right),
    }
}

fn repeat_count(n: &Value) -> Result<usize, EvalError> {
    let n = n.as_i64().unwrap_or(0);
    usize::try_from(n).map_err(|_| EvalError::argument("negative argument"))
}

/// Numeric promotion: two 32-bit integers stay 32-bit for `+ - *`,
/// otherwise integers widen to 64 bits and anything with a float becomes a
/// float.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) if matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => {
            let a = left.as_i64().unwrap_or_default();
            let b = right.as_i64().unwrap_or_default();
            integer_op(op, a, b)
        }
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let a = l.as_f64().unwrap_or_default();
            let b = r.as_f64().unwrap_or_default();
            Ok(Value::Float(float_op(op, a, b)))
        }
        (l, r) if l.is_numeric() => Err(EvalError::type_error(format!(
            "{} can't be coerced into {}",
            describe_operand(r),
            l.type_name()
        ))),
        (l, _) if matches!(op, BinaryOp::Rem | BinaryOp::Pow) => Err(EvalError::type_error(format!(
            "'{}' requires numeric operands, got {}",
            op.method_name(),
            describe_operand(l)
        ))),
        (l, _) => Err(EvalError::no_method(format!(
            "undefined method '{}' for {}",
            op.method_name(),
            describe_operand(l)
        ))),
    }
}

fn describe_operand(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        other => other.type_name(),
    }
}

fn overflow() -> EvalError {
    EvalError::range("integer overflow")
}

fn integer_op(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            a.checked_div(b)
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            a.checked_rem(b).map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exp) => a.checked_pow(exp),
            Err(_) if b < 0 => return negative_power(a, b),
            Err(_) => None,
        },
        _ => None,
    };
    result.map(Value::Long).ok_or_else(overflow)
}

/// Integer power with a negative exponent, truncated toward zero.
fn negative_power(base: i64, exp: i64) -> Result<Value, EvalError> {
    match base {
        0 => Err(EvalError::ZeroDivision),
        1 => Ok(Value::Long(1)),
        -1 if exp % 2 == 0 => Ok(Value::Long(1)),
        -1 => Ok(Value::Long(-1)),
        _ => Ok(Value::Long(0)),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a - b * (a / b).floor(),
        BinaryOp::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_int32_stays_narrow() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Value::Int(2), &Value::Int(3)).unwrap(),
            Value::Int(5)
        );
        assert!(matches!(
            arithmetic(BinaryOp::Mul, &Value::Int(2), &Value::Int(3)).unwrap(),
            Value::Int(6)
        ));
    }

    #[test]
    fn test_int32_overflow_is_range_error() {
        let err = arithmetic(BinaryOp::Add, &Value::Int(i32::MAX), &Value::Int(1)).unwrap_err();
        assert_eq!(err.class_name(), "RangeError");
    }

    #[test]
    fn test_mixed_width_widens() {
        assert!(matches!(
            arithmetic(BinaryOp::Add, &Value::Int(1), &Value::Long(1)).unwrap(),
            Value::Long(2)
        ));
    }

    #[test]
    fn test_division_truncates_and_modulo_floors() {
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Long(1), &Value::Long(2)).unwrap(),
            Value::Long(0)
        );
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Long(-7), &Value::Long(2)).unwrap(),
            Value::Long(-3)
        );
        assert_eq!(
            arithmetic(BinaryOp::Rem, &Value::Long(-7), &Value::Long(2)).unwrap(),
            Value::Long(1)
        );
    }

    #[test]
    fn test_zero_division() {
        let err = arithmetic(BinaryOp::Div, &Value::Long(1), &Value::Long(0)).unwrap_err();
        assert_eq!(err.to_string(), "divided by 0");
    }

    #[test]
    fn test_integer_power() {
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Long(2), &Value::Long(10)).unwrap(),
            Value::Long(1024)
        );
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Long(2), &Value::Long(-1)).unwrap(),
            Value::Long(0)
        );
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Long(1), &Value::Long(-5)).unwrap(),
            Value::Long(1)
        );
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Long(-1), &Value::Long(-3)).unwrap(),
            Value::Long(-1)
        );
    }

    #[test]
    fn test_integer_power_edge_cases() {
        let err = arithmetic(BinaryOp::Pow, &Value::Long(0), &Value::Long(-2)).unwrap_err();
        assert_eq!(err.class_name(), "ZeroDivisionError");
        let err = arithmetic(BinaryOp::Pow, &Value::Long(10), &Value::Long(40)).unwrap_err();
        assert_eq!(err.class_name(), "RangeError");
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Int(3), &Value::Int(2)).unwrap(),
            Value::Long(9)
        );
    }

    #[test]
    fn test_non_numeric_power_receiver_is_type_error() {
        let err = arithmetic(BinaryOp::Pow, &Value::Nil, &Value::Long(2)).unwrap_err();
        assert_eq!(err.class_name(), "TypeError");
        let err = arithmetic(BinaryOp::Sub, &Value::Nil, &Value::Long(2)).unwrap_err();
        assert_eq!(err.class_name(), "NoMethodError");
    }

    #[test]
    fn test_non_numeric_modulo_is_type_error() {
        let err = arithmetic(BinaryOp::Rem, &Value::Long(1), &Value::Nil).unwrap_err();
        assert_eq!(err.class_name(), "TypeError");
    }

    #[test]
    fn test_repetition() {
        assert_eq!(mul(&Value::string("ab"), &Value::Long(3)).unwrap(), Value::string("ababab"));
        assert_eq!(
            mul(&Value::array(vec![Value::Long(1)]), &Value::Long(2)).unwrap(),
            Value::array(vec![Value::Long(1), Value::Long(1)])
        );
    }
}
