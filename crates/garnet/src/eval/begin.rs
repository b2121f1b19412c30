//! `begin`/`rescue`/`else`/`ensure` and `raise`

use std::rc::Rc;

use super::literal::eval_list;
use super::Evaluate;
use crate::ast::{BeginExpr, Expr, RescueClause};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::Args;
use crate::{EvalError, Value};

/// Global holding the exception being handled.
const CURRENT_EXCEPTION: &str = "$!";

impl Evaluate for BeginExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let result = match self.body.eval(scope, rt) {
            Ok(value) => match &self.else_body {
                Some(else_body) => else_body.eval(scope, rt),
                None => Ok(value),
            },
            Err(err) if err.is_rescuable() && !self.rescues.is_empty() => {
                self.rescue(err, scope, rt)
            }
            Err(err) => Err(err),
        };

        match &self.ensure {
            Some(ensure) => {
                ensure.eval(scope, rt)?;
                result
            }
            None => result,
        }
    }
}

impl BeginExpr {
    fn rescue(&self, err: EvalError, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let exception = rt.exception_value(&err)?;
        for clause in &self.rescues {
            if clause_matches(clause, &exception, scope, rt)? {
                tracing::trace!(class = %err.class_name(), "rescued");
                return run_handler(clause, exception, scope, rt);
            }
        }
        Err(err)
    }
}

fn clause_matches(
    clause: &RescueClause,
    exception: &Value,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<bool, EvalError> {
    if clause.classes.is_empty() {
        return Ok(rt.is_a(exception, &rt.core().standard_error));
    }
    for class in eval_list(&clause.classes, scope, rt)? {
        match class {
            Value::Class(class) => {
                if rt.is_a(exception, &class) {
                    return Ok(true);
                }
            }
            other => {
                return Err(EvalError::type_error(format!(
                    "class or module required for rescue clause, got {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(false)
}

fn run_handler(
    clause: &RescueClause,
    exception: Value,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let handler_scope = Scope::rescue(scope);
    if let Some(name) = &clause.binding {
        handler_scope.define(name.clone(), exception.clone());
    }
    let previous = rt.get_global(CURRENT_EXCEPTION);
    rt.set_global(CURRENT_EXCEPTION, exception);
    let result = clause.body.eval(&handler_scope, rt);
    rt.set_global(CURRENT_EXCEPTION, previous);
    result
}

// ═══════════════════════════════════════════════════════════════════════
// raise
// ═══════════════════════════════════════════════════════════════════════

/// `raise`, `raise "msg"`, `raise Class`, `raise Class, "msg"` or
/// `raise exception`.
pub fn eval_raise(args: &[Expr], scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    let args = eval_list(args, scope, rt)?;
    Err(raise_error(rt, args))
}

/// Build the error `raise` produces for the given arguments.
pub fn raise_error(rt: &Machine, args: Vec<Value>) -> EvalError {
    let mut args = args.into_iter();
    let (first, message) = (args.next(), args.next());

    match (first, message) {
        (None, _) => match rt.get_global(CURRENT_EXCEPTION) {
            Value::Nil => EvalError::runtime("unhandled exception"),
            current => EvalError::Raised(current),
        },
        (Some(Value::Str(text)), None) => EvalError::runtime(text.to_string()),
        (Some(Value::Class(class)), message) => {
            let args = Args::new(message.into_iter().collect());
            match rt.call_method(&Value::Class(class), "new", args) {
                Ok(exception) => exception_or_type_error(rt, exception),
                Err(err) => err,
            }
        }
        (Some(exception @ Value::Object(_)), None) => exception_or_type_error(rt, exception),
        _ => EvalError::type_error("exception class/object expected"),
    }
}

fn exception_or_type_error(rt: &Machine, value: Value) -> EvalError {
    if rt.is_a(&value, &rt.core().exception) {
        EvalError::Raised(value)
    } else {
        EvalError::type_error("exception class/object expected")
    }
}
