//! Member dispatch on host values
//!
//! The adapter answers "found" (with the call's result) or "not found"
//! separately, so the caller can fall back to core methods and finally to
//! `method_missing`.

use std::rc::Rc;

use super::{NativeCall, NativeObject, NativeType};
use crate::error::EvalError;
use crate::runtime::Machine;
use crate::value::{Args, Value};

fn check_type(rt: &Machine, name: &str) -> Result<(), EvalError> {
    if rt.policy().is_type_allowed(name) {
        return Ok(());
    }
    tracing::warn!(type_name = name, "native type access denied");
    Err(EvalError::type_access(format!(
        "access to native type '{}' is denied",
        name
    )))
}

fn check_member(rt: &Machine, ty: &NativeType, member: &str) -> Result<(), EvalError> {
    if rt.policy().is_member_allowed(ty.name(), member) {
        return Ok(());
    }
    tracing::warn!(type_name = ty.name(), member, "native member access denied");
    Err(EvalError::type_access(format!(
        "access to '{}#{}' is denied",
        ty.name(),
        member
    )))
}

/// Resolve a qualified constant path against the registry: a registered
/// type, a namespace that prefixes one, or nothing.
pub(crate) fn resolve_path(rt: &Machine, path: &str) -> Result<Option<Value>, EvalError> {
    let registry = rt.native_registry();
    if let Some(ty) = registry.get(path) {
        check_type(rt, path)?;
        return Ok(Some(Value::NativeType(ty)));
    }
    if registry.has_namespace(path) {
        return Ok(Some(Value::NativeNamespace(Rc::from(path))));
    }
    Ok(None)
}

/// `Scope::Name` where the scope is a host type or namespace.
pub(crate) fn scoped_constant(
    rt: &Machine,
    scope: &Value,
    name: &str,
) -> Result<Option<Value>, EvalError> {
    match scope {
        Value::NativeNamespace(prefix) => resolve_path(rt, &format!("{}::{}", prefix, name)),
        Value::NativeType(ty) => {
            if let Some(ordinal) = ty.enum_value(name) {
                check_member(rt, ty, name)?;
                return Ok(Some(Value::Native(Rc::new(NativeObject::enum_member(
                    ty.clone(),
                    name,
                    ordinal,
                )))));
            }
            resolve_path(rt, &format!("{}::{}", ty.name(), name))
        }
        _ => Ok(None),
    }
}

/// Invoke `name` on a host receiver. `Ok(None)` means the adapter has no
/// such member.
pub(crate) fn invoke(
    rt: &Machine,
    receiver: &Value,
    name: &str,
    args: Args,
) -> Result<Option<Value>, EvalError> {
    match receiver {
        Value::Native(obj) => invoke_instance(rt, obj, receiver, name, args),
        Value::NativeType(ty) => invoke_static(rt, ty, receiver, name, args),
        _ => Ok(None),
    }
}

fn invoke_instance(
    rt: &Machine,
    obj: &Rc<NativeObject>,
    receiver: &Value,
    name: &str,
    args: Args,
) -> Result<Option<Value>, EvalError> {
    let ty = obj.native_type().clone();
    if !ty.has_instance_member(name) {
        return Ok(None);
    }
    check_member(rt, &ty, name)?;
    tracing::trace!(type_name = ty.name(), member = name, "native instance dispatch");

    let call = NativeCall::new(rt, receiver.clone(), args);
    if let Some(method) = ty.method(name) {
        return Ok(Some(method(&call)?));
    }
    if let Some(property) = ty.property(name) {
        call.check_args(0, 0)?;
        return Ok(Some((property.getter)(&call)?));
    }
    let setter = name
        .strip_suffix('=')
        .and_then(|p| ty.property(p))
        .and_then(|p| p.setter.clone());
    match setter {
        Some(setter) => {
            call.check_args(1, 1)?;
            setter(&call)?;
            Ok(Some(call.arg(0)))
        }
        None => Ok(None),
    }
}

fn invoke_static(
    rt: &Machine,
    ty: &Rc<NativeType>,
    receiver: &Value,
    name: &str,
    args: Args,
) -> Result<Option<Value>, EvalError> {
    if !ty.has_static_member(name) {
        return Ok(None);
    }
    check_member(rt, ty, name)?;
    tracing::trace!(type_name = ty.name(), member = name, "native static dispatch");

    let call = NativeCall::new(rt, receiver.clone(), args);
    let func = if name == "new" {
        ty.constructor()
    } else {
        ty.static_method(name)
    };
    match func {
        Some(func) => Ok(Some(func(&call)?)),
        None => Ok(None),
    }
}
