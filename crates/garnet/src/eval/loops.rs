//! Loop expression evaluation

use std::rc::Rc;

use super::control::{BreakTarget, ControlFlow};
use super::Evaluate;
use crate::ast::Expr;
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::{EvalError, Value};

/// Run one loop iteration, re-running it on `redo`. Returns the value of a
/// `break` aimed at this loop.
fn run_iteration(body: &Expr, scope: &Rc<Scope>, rt: &Machine) -> Result<Option<Value>, EvalError> {
    loop {
        match body.eval(scope, rt) {
            Ok(_) => return Ok(None),
            Err(EvalError::ControlFlow(cf)) => match cf {
                ControlFlow::Break {
                    value,
                    target: BreakTarget::Loop,
                } => return Ok(Some(value)),
                ControlFlow::Next { .. } => return Ok(None),
                ControlFlow::Redo => {
                    // same iteration again, condition not re-tested
                }
                other => return Err(EvalError::ControlFlow(other)),
            },
            Err(e) => return Err(e),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// while / until
// ═══════════════════════════════════════════════════════════════════════

/// `while cond` or, with `until` set, `until cond`. Evaluates to `nil`
/// unless a `break` supplies a value.
pub fn eval_while(
    cond: &Expr,
    body: &Expr,
    until: bool,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let _guard = scope.enter_loop();
    loop {
        if cond.eval(scope, rt)?.truthy() == until {
            return Ok(Value::Nil);
        }
        if let Some(value) = run_iteration(body, scope, rt)? {
            return Ok(value);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// for ... in
// ═══════════════════════════════════════════════════════════════════════

/// `for a, b in iterable`. The loop variables live in the enclosing scope.
pub fn eval_for(
    vars: &[String],
    iterable: &Expr,
    body: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let collection = iterable.eval(scope, rt)?;
    let items = for_items(rt, &collection)?;

    let _guard = scope.enter_loop();
    for item in items {
        assign_loop_vars(scope, vars, item);
        if let Some(value) = run_iteration(body, scope, rt)? {
            return Ok(value);
        }
    }
    Ok(collection)
}

fn for_items(rt: &Machine, collection: &Value) -> Result<Vec<Value>, EvalError> {
    match collection {
        Value::Array(items) => Ok(items.to_vec()),
        Value::Range(range) => range.to_vec(),
        Value::Hash(hash) => Ok(hash
            .entries()
            .into_iter()
            .map(|(k, v)| Value::array(vec![k, v]))
            .collect()),
        other => Err(EvalError::no_method(format!(
            "undefined method 'each' for {}",
            rt.describe_receiver(other)
        ))),
    }
}

fn assign_loop_vars(scope: &Rc<Scope>, vars: &[String], item: Value) {
    if let [var] = vars {
        scope.set(var, item);
        return;
    }
    let parts = match &item {
        Value::Array(items) => items.to_vec(),
        _ => vec![item],
    };
    for (i, var) in vars.iter().enumerate() {
        scope.set(var, parts.get(i).cloned().unwrap_or(Value::Nil));
    }
}
