//! `case ... when` and the `===` matcher

use std::rc::Rc;

use super::literal::splat_values;
use super::Evaluate;
use crate::ast::{CaseExpr, Expr};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::{Args, Method};
use crate::{EvalError, Value};

impl Evaluate for CaseExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let subject = match &self.subject {
            Some(expr) => Some(expr.eval(scope, rt)?),
            None => None,
        };

        for clause in &self.whens {
            for pattern in &clause.patterns {
                if when_matches(pattern, subject.as_ref(), scope, rt)? {
                    return clause.body.eval(scope, rt);
                }
            }
        }

        match &self.else_body {
            Some(body) => body.eval(scope, rt),
            None => Ok(Value::Nil),
        }
    }
}

fn when_matches(
    pattern: &Expr,
    subject: Option<&Value>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<bool, EvalError> {
    let candidates = match pattern {
        Expr::Splat(inner) => splat_values(inner.eval(scope, rt)?)?,
        other => vec![other.eval(scope, rt)?],
    };
    for candidate in candidates {
        let hit = match subject {
            Some(subject) => case_equal(rt, &candidate, subject)?,
            None => candidate.truthy(),
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `pattern === subject`
///
/// A user-defined `===` on a script object wins. Otherwise regexes match
/// the subject's string form, procs are called with the subject, numeric
/// ranges test containment, classes test membership, host types test the
/// subject's host type, and everything else falls back to equality.
pub fn case_equal(rt: &Machine, pattern: &Value, subject: &Value) -> Result<bool, EvalError> {
    match pattern {
        Value::Object(_) => {
            if let Some(Method::Interpreted(_) | Method::Block(_)) = rt.find_method(pattern, "===") {
                let result = rt.call_method(pattern, "===", Args::new(vec![subject.clone()]))?;
                return Ok(result.truthy());
            }
            rt.values_equal(pattern, subject)
        }
        Value::Regex(regex) => Ok(regex.is_match(&rt.display(subject)?)),
        Value::Proc(proc) => Ok(rt.call_proc(proc, Args::new(vec![subject.clone()]))?.truthy()),
        Value::Range(range) if range.start.is_numeric() && range.end.is_numeric() => {
            Ok(subject.is_numeric() && range.contains_numeric(subject))
        }
        Value::Class(class) => Ok(rt.is_a(subject, class)),
        Value::NativeType(ty) => Ok(matches!(
            subject,
            Value::Native(obj) if Rc::ptr_eq(obj.native_type(), ty)
        )),
        _ => rt.values_equal(pattern, subject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_range_containment() {
        let rt = Machine::new();
        let range = Value::range(Value::Long(1), Value::Long(10), false);
        assert!(case_equal(&rt, &range, &Value::Long(5)).unwrap());
        assert!(!case_equal(&rt, &range, &Value::Long(11)).unwrap());
        assert!(!case_equal(&rt, &range, &Value::string("5")).unwrap());
    }

    #[test]
    fn test_regex_matches_string_form() {
        let rt = Machine::new();
        let regex = super::super::literal::eval_regex("^4", "").unwrap();
        assert!(case_equal(&rt, &regex, &Value::Long(42)).unwrap());
    }

    #[test]
    fn test_equality_fallback() {
        let rt = Machine::new();
        assert!(case_equal(&rt, &Value::string("a"), &Value::string("a")).unwrap());
        assert!(!case_equal(&rt, &Value::Long(1), &Value::Long(2)).unwrap());
    }
}
