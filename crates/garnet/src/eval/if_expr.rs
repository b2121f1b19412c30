//! Conditional evaluation

use std::rc::Rc;

use super::Evaluate;
use crate::ast::Expr;
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::{EvalError, Value};

/// `if` when `when` is true, `unless` when false. A missing branch
/// evaluates to `nil`.
pub fn eval_if(
    cond: &Expr,
    then_branch: &Expr,
    else_branch: Option<&Expr>,
    when: bool,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    if cond.eval(scope, rt)?.truthy() == when {
        then_branch.eval(scope, rt)
    } else if let Some(else_branch) = else_branch {
        else_branch.eval(scope, rt)
    } else {
        Ok(Value::Nil)
    }
}
