//! `Range`

use std::rc::Rc;

use super::{define, int_arg, yield_block};
use crate::eval::case::case_equal;
use crate::eval::compare::compare;
use crate::runtime::{CoreClasses, Machine};
use crate::value::{RangeValue, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    let r = &core.range;

    define(r, "each", 0, |rt, this, args| {
        let block = args.require_block()?;
        let range = this_range(this)?;
        let (start, end) = int_bounds(range)?;
        let mut n = start;
        while n <= end {
            yield_block(rt, &block, vec![Value::Long(n)])?;
            n += 1;
        }
        Ok(this.clone())
    });
    define(r, "reverse_each", 0, |rt, this, args| {
        let block = args.require_block()?;
        let (start, end) = int_bounds(this_range(this)?)?;
        for n in (start..=end).rev() {
            yield_block(rt, &block, vec![Value::Long(n)])?;
        }
        Ok(this.clone())
    });
    for name in ["to_a", "entries"] {
        define(r, name, 0, |_, this, _| Ok(Value::array(this_range(this)?.to_vec()?)));
    }
    for name in ["map", "collect"] {
        define(r, name, 0, |rt, this, args| {
            let block = args.require_block()?;
            let mut out = Vec::new();
            for item in this_range(this)?.to_vec()? {
                out.push(yield_block(rt, &block, vec![item])?);
            }
            Ok(Value::array(out))
        });
    }
    // everything else an array can do on the expanded range
    for name in [
        "select",
        "filter",
        "reject",
        "reduce",
        "inject",
        "each_with_index",
        "each_slice",
        "find",
        "any?",
        "all?",
        "sum",
    ] {
        let forwarded = name.to_string();
        define(r, name, -1, move |rt, this, args| {
            let items = Value::array(this_range(this)?.to_vec()?);
            rt.call_method(&items, &forwarded, args)
        });
    }
    define(r, "step", 1, |rt, this, args| {
        let (start, end) = int_bounds(this_range(this)?)?;
        let by = int_arg(&args.get(0))?;
        if by <= 0 {
            return Err(EvalError::argument("step can't be negative or zero"));
        }
        let values: Vec<Value> = (start..=end).step_by(by as usize).map(Value::Long).collect();
        match &args.block {
            Some(block) => {
                for value in values {
                    yield_block(rt, block, vec![value])?;
                }
                Ok(this.clone())
            }
            None => Ok(Value::array(values)),
        }
    });

    for name in ["include?", "member?", "cover?", "==="] {
        define(r, name, 1, |rt, this, args| {
            Ok(Value::Bool(covers(rt, this_range(this)?, &args.get(0))?))
        });
    }
    for name in ["first", "begin", "min"] {
        define(r, name, -1, |_, this, args| {
            args.check(0, 1)?;
            let range = this_range(this)?;
            match args.get(0) {
                Value::Nil => Ok(range.start.clone()),
                n => {
                    let n = int_arg(&n)?.max(0) as usize;
                    Ok(Value::array(range.to_vec()?.into_iter().take(n).collect()))
                }
            }
        });
    }
    define(r, "end", 0, |_, this, _| Ok(this_range(this)?.end.clone()));
    define(r, "last", -1, |_, this, args| {
        args.check(0, 1)?;
        let range = this_range(this)?;
        match args.get(0) {
            Value::Nil if !range.exclusive => Ok(range.end.clone()),
            Value::Nil => Ok(range.to_vec()?.pop().unwrap_or(Value::Nil)),
            n => {
                let items = range.to_vec()?;
                let n = (int_arg(&n)?.max(0) as usize).min(items.len());
                Ok(Value::array(items[items.len() - n..].to_vec()))
            }
        }
    });
    define(r, "max", 0, |_, this, _| {
        let range = this_range(this)?;
        Ok(match range.int_bounds() {
            Some((start, end)) if start <= end => Value::Long(end),
            Some(_) => Value::Nil,
            None => range.end.clone(),
        })
    });
    for name in ["size", "count"] {
        define(r, name, 0, |_, this, _| {
            let (start, end) = int_bounds(this_range(this)?)?;
            Ok(Value::Long((end - start + 1).max(0)))
        });
    }
    define(r, "exclude_end?", 0, |_, this, _| Ok(Value::Bool(this_range(this)?.exclusive)));
    for name in ["to_s", "inspect"] {
        define(r, name, 0, |rt, this, _| Ok(Value::string(rt.inspect_value(this)?)));
    }
}

fn this_range(this: &Value) -> Result<&Rc<RangeValue>, EvalError> {
    match this {
        Value::Range(range) => Ok(range),
        other => Err(super::wrong_receiver("Range", other)),
    }
}

fn int_bounds(range: &RangeValue) -> Result<(i64, i64), EvalError> {
    range.int_bounds().ok_or_else(|| {
        EvalError::type_error(format!("can't iterate from {}", range.start.type_name()))
    })
}

/// Numeric containment, falling back to the generic ordering for other
/// comparable bounds such as strings.
fn covers(rt: &Machine, range: &RangeValue, value: &Value) -> Result<bool, EvalError> {
    if range.start.is_numeric() && range.end.is_numeric() {
        return Ok(range.contains_numeric(value));
    }
    let above = match compare(&range.start, value) {
        Some(ordering) => ordering.is_le(),
        None => return Ok(case_equal(rt, &range.start, value)? && !range.exclusive),
    };
    let below = match compare(value, &range.end) {
        Some(ordering) if range.exclusive => ordering.is_lt(),
        Some(ordering) => ordering.is_le(),
        None => false,
    };
    Ok(above && below)
}
