//! Structural pattern matching for `case ... in`

use std::rc::Rc;

use super::case::case_equal;
use super::Evaluate;
use crate::ast::{CaseInExpr, Pattern};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::{EvalError, Value};

/// Result of pattern matching: bindings to add to the scope.
pub type MatchBindings = Vec<(String, Value)>;

impl Evaluate for CaseInExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let subject = self.subject.eval(scope, rt)?;

        for clause in &self.clauses {
            let Some(bindings) = match_pattern(&clause.pattern, &subject, scope, rt)? else {
                continue;
            };
            let saved = apply_bindings(scope, bindings);
            if let Some(guard) = &clause.guard {
                if !guard.eval(scope, rt)?.truthy() {
                    restore_bindings(scope, saved);
                    continue;
                }
            }
            return clause.body.eval(scope, rt);
        }

        match &self.else_body {
            Some(body) => body.eval(scope, rt),
            None => Ok(Value::Nil),
        }
    }
}

/// Match a value against a pattern.
///
/// Returns `Ok(Some(bindings))` if the whole pattern matches and
/// `Ok(None)` otherwise. Nothing is bound until the caller applies the
/// bindings, so a partial match never leaks into the scope.
pub fn match_pattern(
    pattern: &Pattern,
    value: &Value,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Option<MatchBindings>, EvalError> {
    match pattern {
        Pattern::Wildcard => Ok(Some(vec![])),

        Pattern::Bind(name) => Ok(Some(vec![(name.clone(), value.clone())])),

        Pattern::Value(expr) => {
            let expected = expr.eval(scope, rt)?;
            Ok(case_equal(rt, &expected, value)?.then(Vec::new))
        }

        Pattern::Alternatives(cases) => {
            for case in cases {
                if let Some(bindings) = match_pattern(case, value, scope, rt)? {
                    return Ok(Some(bindings));
                }
            }
            Ok(None)
        }

        Pattern::Array {
            before,
            rest,
            after,
        } => {
            let Value::Array(items) = value else {
                return Ok(None);
            };
            match_array(before, rest.as_ref(), after, &items.to_vec(), scope, rt)
        }

        Pattern::Hash(entries) => {
            let Value::Hash(hash) = value else {
                return Ok(None);
            };
            let mut bindings = Vec::new();
            for (key, sub) in entries {
                let Some(found) = hash.get(&Value::symbol(key)) else {
                    return Ok(None);
                };
                match sub {
                    None => bindings.push((key.clone(), found)),
                    Some(sub) => match match_pattern(sub, &found, scope, rt)? {
                        Some(inner) => bindings.extend(inner),
                        None => return Ok(None),
                    },
                }
            }
            Ok(Some(bindings))
        }

        Pattern::Deconstruct { .. } => Err(EvalError::not_supported(
            "deconstruct patterns are not supported",
        )),
    }
}

fn match_array(
    before: &[Pattern],
    rest: Option<&Option<String>>,
    after: &[Pattern],
    items: &[Value],
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Option<MatchBindings>, EvalError> {
    let fixed = before.len() + after.len();
    let fits = match rest {
        Some(_) => items.len() >= fixed,
        None => items.len() == fixed,
    };
    if !fits {
        return Ok(None);
    }

    let mut bindings = Vec::new();
    let tail_start = items.len() - after.len();
    let pairs = before
        .iter()
        .zip(&items[..before.len()])
        .chain(after.iter().zip(&items[tail_start..]));
    for (pattern, item) in pairs {
        match match_pattern(pattern, item, scope, rt)? {
            Some(inner) => bindings.extend(inner),
            None => return Ok(None),
        }
    }
    if let Some(Some(name)) = rest {
        let middle = items[before.len()..tail_start].to_vec();
        bindings.push((name.clone(), Value::array(middle)));
    }
    Ok(Some(bindings))
}

/// Bind matched names, returning what they shadowed so a failed guard can
/// undo the assignment.
pub fn apply_bindings(scope: &Rc<Scope>, bindings: MatchBindings) -> Vec<(String, Option<Value>)> {
    let mut saved = Vec::with_capacity(bindings.len());
    for (name, value) in bindings {
        saved.push((name.clone(), scope.get(&name)));
        scope.set(&name, value);
    }
    saved
}

fn restore_bindings(scope: &Rc<Scope>, saved: Vec<(String, Option<Value>)>) {
    for (name, previous) in saved.into_iter().rev() {
        match previous {
            Some(value) => scope.set(&name, value),
            None => {
                scope.remove(&name);
            }
        }
    }
}
