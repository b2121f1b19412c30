//! Assignment evaluation

use std::rc::Rc;

use super::literal::eval_list;
use super::variable::set_ivar;
use super::Evaluate;
use crate::ast::{ConstPath, Expr};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::{Args, Class};
use crate::{EvalError, Value};

/// `name = value`
pub fn eval_assign_local(
    name: &str,
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let value = value.eval(scope, rt)?;
    scope.set(name, value.clone());
    Ok(value)
}

/// The class or module a constant path is defined in.
pub fn const_container(
    path: &ConstPath,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Rc<Class>, EvalError> {
    match &path.scope {
        None => Ok(scope.cref().module.clone()),
        Some(expr) => match expr.eval(scope, rt)? {
            Value::Class(class) => Ok(class),
            other => Err(EvalError::type_error(format!(
                "{} is not a class/module",
                rt.inspect_value(&other)?
            ))),
        },
    }
}

/// `Name = value` / `A::Name = value`
pub fn eval_assign_constant(
    path: &ConstPath,
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let container = const_container(path, scope, rt)?;
    let value = value.eval(scope, rt)?;
    container.set_constant(path.name.clone(), value.clone())?;
    Ok(value)
}

/// `@name = value`
pub fn eval_assign_ivar(
    name: &str,
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let value = value.eval(scope, rt)?;
    set_ivar(scope.self_value(), name, value.clone())?;
    Ok(value)
}

/// `@@name = value` on the lexically enclosing class.
pub fn eval_assign_class_var(
    name: &str,
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let value = value.eval(scope, rt)?;
    scope.cref().module.set_class_var(name, value.clone())?;
    Ok(value)
}

/// `receiver.name = value` sends `name=`; the result is the assigned value.
pub fn eval_assign_member(
    receiver: &Expr,
    name: &str,
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let receiver = receiver.eval(scope, rt)?;
    let value = value.eval(scope, rt)?;
    rt.call_method(&receiver, &format!("{}=", name), Args::new(vec![value.clone()]))?;
    Ok(value)
}

/// `receiver[args] = value` sends `[]=`; the result is the assigned value.
pub fn eval_assign_index(
    receiver: &Expr,
    args: &[Expr],
    value: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let receiver = receiver.eval(scope, rt)?;
    let mut positional = eval_list(args, scope, rt)?;
    let value = value.eval(scope, rt)?;
    positional.push(value.clone());
    rt.call_method(&receiver, "[]=", Args::new(positional))?;
    Ok(value)
}
