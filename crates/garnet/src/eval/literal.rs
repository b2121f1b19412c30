//! Literal evaluation: strings, regexes, arrays, hashes and ranges

use std::rc::Rc;

use regex::RegexBuilder;

use super::Evaluate;
use crate::ast::{Expr, StrPart};
use crate::environment::Scope;
use crate::error::ParseError;
use crate::runtime::Machine;
use crate::value::HashValue;
use crate::{EvalError, Value};

/// `"a #{b} c"`: code segments are converted with `to_s`.
pub fn eval_interpolated(
    parts: &[StrPart],
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let mut out = String::new();
    for part in parts {
        match part {
            StrPart::Text(text) => out.push_str(text),
            StrPart::Code(expr) => {
                let value = expr.eval(scope, rt)?;
                out.push_str(&rt.display(&value)?);
            }
        }
    }
    Ok(Value::string(out))
}

/// `/pattern/flags` with the `i`, `m` and `x` flags.
pub fn eval_regex(pattern: &str, flags: &str) -> Result<Value, EvalError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .dot_matches_new_line(flags.contains('m'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| ParseError::new(format!("invalid regular expression: {}", e), 0))?;
    Ok(Value::Regex(Rc::new(regex)))
}

/// `[a, *b, c]`
pub fn eval_array(items: &[Expr], scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    Ok(Value::array(eval_list(items, scope, rt)?))
}

/// Evaluate an argument or element list, expanding `*splat` entries.
pub fn eval_list(items: &[Expr], scope: &Rc<Scope>, rt: &Machine) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Expr::Splat(inner) => out.extend(splat_values(inner.eval(scope, rt)?)?),
            other => out.push(other.eval(scope, rt)?),
        }
    }
    Ok(out)
}

/// Values a `*splat` expands to: array elements, range members, nothing
/// for `nil`, `[key, value]` pairs for a hash, the value itself otherwise.
pub fn splat_values(value: Value) -> Result<Vec<Value>, EvalError> {
    Ok(match value {
        Value::Array(items) => items.to_vec(),
        Value::Range(range) => range.to_vec()?,
        Value::Nil => Vec::new(),
        Value::Hash(hash) => hash
            .entries()
            .into_iter()
            .map(|(k, v)| Value::array(vec![k, v]))
            .collect(),
        other => vec![other],
    })
}

/// `{k => v, key: v, **other}`
pub fn eval_hash(
    pairs: &[(Expr, Expr)],
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let hash = HashValue::default();
    for (key, value) in pairs {
        if let Expr::DoubleSplat(inner) = key {
            match inner.eval(scope, rt)? {
                Value::Hash(other) => {
                    for (k, v) in other.entries() {
                        hash.insert(k, v)?;
                    }
                }
                Value::Nil => {}
                other => {
                    return Err(EvalError::type_error(format!(
                        "no implicit conversion of {} into Hash",
                        other.type_name()
                    )))
                }
            }
            continue;
        }
        let key = key.eval(scope, rt)?;
        let value = value.eval(scope, rt)?;
        hash.insert(key, value)?;
    }
    Ok(Value::Hash(Rc::new(hash)))
}

/// `a..b` / `a...b`
pub fn eval_range(
    start: &Expr,
    end: &Expr,
    exclusive: bool,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let start = start.eval(scope, rt)?;
    let end = end.eval(scope, rt)?;
    Ok(Value::range(start, end, exclusive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat_nil_is_empty() {
        assert!(splat_values(Value::Nil).unwrap().is_empty());
    }

    #[test]
    fn test_splat_range() {
        let range = Value::range(Value::Long(1), Value::Long(3), false);
        assert_eq!(
            splat_values(range).unwrap(),
            vec![Value::Long(1), Value::Long(2), Value::Long(3)]
        );
    }

    #[test]
    fn test_splat_scalar() {
        assert_eq!(splat_values(Value::Long(7)).unwrap(), vec![Value::Long(7)]);
    }

    #[test]
    fn test_regex_flags() {
        let Value::Regex(re) = eval_regex("abc", "i").unwrap() else {
            panic!("expected regex");
        };
        assert!(re.is_match("ABC"));
    }

    #[test]
    fn test_invalid_regex_is_syntax_error() {
        let err = eval_regex("(", "").unwrap_err();
        assert_eq!(err.class_name(), "SyntaxError");
    }
}
