//! `Numeric`, `Integer` and `Float`

use super::{define, int_arg, yield_block};
use crate::ast::BinaryOp;
use crate::eval::binary::binary_op;
use crate::eval::unary::negate;
use crate::runtime::CoreClasses;
use crate::value::Value;
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_operators(core);
    install_integer(core);
    install_float(core);
}

fn this_int(this: &Value) -> Result<i64, EvalError> {
    int_arg(this)
}

fn this_float(this: &Value) -> Result<f64, EvalError> {
    this.as_f64()
        .ok_or_else(|| super::wrong_receiver("Float", this))
}

// ═══════════════════════════════════════════════════════════════════════
// Operators as methods (`1.send(:+, 2)`, `method_missing` forwarding)
// ═══════════════════════════════════════════════════════════════════════

fn install_operators(core: &CoreClasses) {
    let n = &core.numeric;
    let ops = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Pow,
        BinaryOp::Eq,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Cmp,
    ];
    for op in ops {
        define(n, op.method_name(), 1, move |rt, this, args| {
            binary_op(rt, op, this, &args.get(0))
        });
    }
    define(n, "modulo", 1, |rt, this, args| {
        binary_op(rt, BinaryOp::Rem, this, &args.get(0))
    });
    define(n, "-@", 0, |rt, this, _| negate(rt, this));
    define(n, "+@", 0, |_, this, _| Ok(this.clone()));
    define(n, "coerce", 1, |_, this, args| {
        let other = args.get(0);
        match (this.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) if matches!(this, Value::Float(_)) || matches!(other, Value::Float(_)) => {
                Ok(Value::array(vec![Value::Float(b), Value::Float(a)]))
            }
            (Some(_), Some(_)) => Ok(Value::array(vec![other, this.clone()])),
            _ => Err(EvalError::type_error(format!(
                "{} can't be coerced into {}",
                other.type_name(),
                this.type_name()
            ))),
        }
    });

    define(n, "integer?", 0, |_, this, _| {
        Ok(Value::Bool(matches!(this, Value::Int(_) | Value::Long(_))))
    });
    define(n, "zero?", 0, |_, this, _| Ok(Value::Bool(this.as_f64() == Some(0.0))));
    define(n, "positive?", 0, |_, this, _| {
        Ok(Value::Bool(this.as_f64().is_some_and(|x| x > 0.0)))
    });
    define(n, "negative?", 0, |_, this, _| {
        Ok(Value::Bool(this.as_f64().is_some_and(|x| x < 0.0)))
    });
    define(n, "abs", 0, |_, this, _| match this {
        Value::Int(n) => Ok(n.checked_abs().map(Value::Int).unwrap_or(Value::Long(i64::from(*n).abs()))),
        Value::Long(n) => n
            .checked_abs()
            .map(Value::Long)
            .ok_or_else(|| EvalError::range("integer overflow")),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(super::wrong_receiver("Numeric", other)),
    });
    define(n, "to_f", 0, |_, this, _| Ok(Value::Float(this_float(this)?)));
}

// ═══════════════════════════════════════════════════════════════════════
// Integer
// ═══════════════════════════════════════════════════════════════════════

fn install_integer(core: &CoreClasses) {
    let i = &core.integer;

    define(i, "times", 0, |rt, this, args| {
        let count = this_int(this)?;
        let Some(block) = args.block else {
            return Ok(Value::array((0..count.max(0)).map(Value::Long).collect()));
        };
        for n in 0..count {
            yield_block(rt, &block, vec![Value::Long(n)])?;
        }
        Ok(this.clone())
    });
    define(i, "upto", 1, |rt, this, args| {
        let block = args.require_block()?;
        for n in this_int(this)?..=int_arg(&args.get(0))? {
            yield_block(rt, &block, vec![Value::Long(n)])?;
        }
        Ok(this.clone())
    });
    define(i, "downto", 1, |rt, this, args| {
        let block = args.require_block()?;
        let low = int_arg(&args.get(0))?;
        for n in (low..=this_int(this)?).rev() {
            yield_block(rt, &block, vec![Value::Long(n)])?;
        }
        Ok(this.clone())
    });

    define(i, "to_s", -1, |_, this, args| {
        args.check(0, 1)?;
        let base = match args.get(0) {
            Value::Nil => 10,
            other => int_arg(&other)?,
        };
        if !(2..=36).contains(&base) {
            return Err(EvalError::argument(format!("invalid radix {}", base)));
        }
        Ok(Value::string(to_radix(this_int(this)?, base as u32)))
    });
    define(i, "inspect", 0, |_, this, _| Ok(Value::string(this_int(this)?.to_string())));
    define(i, "to_i", 0, |_, this, _| Ok(this.clone()));
    define(i, "to_int", 0, |_, this, _| Ok(this.clone()));
    define(i, "chr", 0, |_, this, _| {
        let code = this_int(this)?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .map(|c| Value::string(c.to_string()))
            .ok_or_else(|| EvalError::range(format!("{} out of char range", code)))
    });

    define(i, "even?", 0, |_, this, _| Ok(Value::Bool(this_int(this)? % 2 == 0)));
    define(i, "odd?", 0, |_, this, _| Ok(Value::Bool(this_int(this)? % 2 != 0)));
    for name in ["succ", "next"] {
        define(i, name, 0, |_, this, _| step(this, 1));
    }
    define(i, "pred", 0, |_, this, _| step(this, -1));
    for name in ["floor", "ceil", "round", "truncate"] {
        define(i, name, -1, |_, this, _| Ok(this.clone()));
    }
    define(i, "gcd", 1, |_, this, args| {
        let (mut a, mut b) = (this_int(this)?.abs(), int_arg(&args.get(0))?.abs());
        while b != 0 {
            (a, b) = (b, a % b);
        }
        Ok(Value::Long(a))
    });
    define(i, "digits", 0, |_, this, _| {
        let mut n = this_int(this)?;
        if n < 0 {
            return Err(EvalError::range("out of domain"));
        }
        let mut digits = vec![Value::Long(n % 10)];
        n /= 10;
        while n > 0 {
            digits.push(Value::Long(n % 10));
            n /= 10;
        }
        Ok(Value::array(digits))
    });
}

fn step(this: &Value, by: i64) -> Result<Value, EvalError> {
    this_int(this)?
        .checked_add(by)
        .map(Value::Long)
        .ok_or_else(|| EvalError::range("integer overflow"))
}

fn to_radix(n: i64, base: u32) -> String {
    if base == 10 {
        return n.to_string();
    }
    let mut magnitude = n.unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % u64::from(base)) as u32;
        digits.push(char::from_digit(digit, base).unwrap_or('?'));
        magnitude /= u64::from(base);
    }
    if n < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Float
// ═══════════════════════════════════════════════════════════════════════

fn install_float(core: &CoreClasses) {
    let f = &core.float;

    define(f, "to_i", 0, |_, this, _| float_to_int(this_float(this)?.trunc()));
    define(f, "to_int", 0, |_, this, _| float_to_int(this_float(this)?.trunc()));
    define(f, "truncate", 0, |_, this, _| float_to_int(this_float(this)?.trunc()));
    define(f, "floor", 0, |_, this, _| float_to_int(this_float(this)?.floor()));
    define(f, "ceil", 0, |_, this, _| float_to_int(this_float(this)?.ceil()));
    define(f, "round", -1, |_, this, args| {
        args.check(0, 1)?;
        let x = this_float(this)?;
        match args.get(0) {
            Value::Nil => float_to_int(x.round()),
            digits => {
                let digits = int_arg(&digits)?;
                if digits <= 0 {
                    return float_to_int(x.round());
                }
                let scale = 10f64.powi(digits.min(15) as i32);
                Ok(Value::Float((x * scale).round() / scale))
            }
        }
    });
    define(f, "nan?", 0, |_, this, _| Ok(Value::Bool(this_float(this)?.is_nan())));
    define(f, "infinite?", 0, |_, this, _| {
        let x = this_float(this)?;
        Ok(if x.is_infinite() {
            Value::Long(if x > 0.0 { 1 } else { -1 })
        } else {
            Value::Nil
        })
    });
    define(f, "finite?", 0, |_, this, _| Ok(Value::Bool(this_float(this)?.is_finite())));
}

fn float_to_int(x: f64) -> Result<Value, EvalError> {
    if !x.is_finite() {
        return Err(EvalError::range(format!(
            "{} out of range of integer",
            crate::value::format_float(x)
        )));
    }
    Ok(Value::Long(x as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Machine;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    #[test]
    fn test_radix() {
        assert_eq!(to_radix(255, 16), "ff");
        assert_eq!(to_radix(-5, 2), "-101");
        assert_eq!(to_radix(0, 8), "0");
    }

    #[test]
    fn test_times_yields_indices() {
        assert_eq!(run("sum = 0\n4.times { |i| sum += i }\nsum"), Value::Long(6));
    }

    #[test]
    fn test_operator_send() {
        assert_eq!(run("1.send(:+, 2)"), Value::Long(3));
    }

    #[test]
    fn test_float_round() {
        assert_eq!(run("3.14159.round(2)"), Value::Float(3.14));
        assert_eq!(run("2.5.round"), Value::Long(3));
    }

    #[test]
    fn test_float_to_i_of_infinity_fails() {
        assert!(float_to_int(f64::INFINITY).is_err());
    }
}
