//! Variable and constant reads

use std::rc::Rc;

use super::Evaluate;
use crate::ast::Expr;
use crate::environment::Scope;
use crate::native;
use crate::runtime::Machine;
use crate::value::Args;
use crate::{EvalError, Value};

/// A bare identifier: a visible local, else a zero-argument call on self.
pub fn eval_name(name: &str, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    if let Some(value) = scope.get(name) {
        return Ok(value);
    }
    if name == "block_given?" {
        return Ok(Value::Bool(scope.block_arg().is_some()));
    }
    let receiver = scope.self_value();
    let known = rt.respond_to(receiver, name) || rt.find_method(receiver, "method_missing").is_some();
    if !known {
        return Err(EvalError::name(format!(
            "undefined local variable or method '{}' for {}",
            name,
            rt.describe_receiver(receiver)
        )));
    }
    rt.call_function(receiver, name, Args::default())
}

/// `Foo`: lexical nesting first, then registered host types.
pub fn eval_constant(name: &str, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    if let Some(value) = scope.cref().lookup(name) {
        return Ok(value);
    }
    native::resolve_path(rt, name)?
        .ok_or_else(|| EvalError::name(format!("unitialized constant {}", name)))
}

/// `A::B`
pub fn eval_scoped_constant(
    namespace: &Expr,
    name: &str,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let namespace = namespace.eval(scope, rt)?;
    lookup_in(&namespace, name, rt)
}

/// Constant `name` inside a class, module or host namespace.
pub fn lookup_in(namespace: &Value, name: &str, rt: &Machine) -> Result<Value, EvalError> {
    match namespace {
        Value::Class(class) => class.find_constant(name).ok_or_else(|| {
            EvalError::name(format!("unitialized constant {}::{}", class.name(), name))
        }),
        Value::NativeType(_) | Value::NativeNamespace(_) => {
            native::scoped_constant(rt, namespace, name)?.ok_or_else(|| {
                EvalError::name(format!("unitialized constant {}::{}", namespace, name))
            })
        }
        other => Err(EvalError::type_error(format!(
            "{} is not a class/module",
            rt.inspect_value(other)?
        ))),
    }
}

/// `@name` on the current self; unset variables read as `nil`.
pub fn get_ivar(target: &Value, name: &str) -> Value {
    match target {
        Value::Object(obj) => obj.get_ivar(name),
        Value::Class(class) => class.get_ivar(name),
        _ => None,
    }
    .unwrap_or(Value::Nil)
}

/// Assign `@name` on `target`.
pub fn set_ivar(target: &Value, name: &str, value: Value) -> Result<(), EvalError> {
    match target {
        Value::Object(obj) => obj.set_ivar(name, value),
        Value::Class(class) => class.set_ivar(name, value),
        other => Err(EvalError::frozen(format!(
            "can't modify frozen {}",
            other.type_name()
        ))),
    }
}

/// `@@name`, resolved against the lexically enclosing class.
pub fn eval_class_var(name: &str, scope: &Rc<Scope>) -> Result<Value, EvalError> {
    let module = &scope.cref().module;
    module.get_class_var(name).ok_or_else(|| {
        EvalError::name(format!(
            "uninitialized class variable {} in {}",
            name,
            module.name()
        ))
    })
}
