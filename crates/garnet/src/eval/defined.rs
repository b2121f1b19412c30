//! `defined?`

use std::rc::Rc;

use super::variable::lookup_in;
use super::Evaluate;
use crate::ast::Expr;
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::Value;
use crate::EvalError;

/// `defined?(expr)`: a description of what `expr` names, or `nil`.
///
/// Nothing with side effects is evaluated except the receiver of a method
/// call; an error while evaluating it makes the whole expression undefined.
pub fn eval_defined(expr: &Expr, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    Ok(match describe(expr, scope, rt)? {
        Some(label) => Value::string(label),
        None => Value::Nil,
    })
}

fn describe(expr: &Expr, scope: &Rc<Scope>, rt: &Machine) -> Result<Option<&'static str>, EvalError> {
    let label = match expr {
        Expr::Nil => Some("nil"),
        Expr::True => Some("true"),
        Expr::False => Some("false"),
        Expr::SelfRef => Some("self"),
        Expr::Yield(_) => scope.block_arg().map(|_| "yield"),

        Expr::Name(name) => {
            if scope.contains(name) {
                Some("local-variable")
            } else if rt.respond_to(scope.self_value(), name) {
                Some("method")
            } else {
                None
            }
        }
        Expr::InstanceVar(name) => {
            let set = match scope.self_value() {
                Value::Object(obj) => obj.get_ivar(name).is_some(),
                Value::Class(class) => class.get_ivar(name).is_some(),
                _ => false,
            };
            set.then_some("instance-variable")
        }
        Expr::ClassVar(name) => scope
            .cref()
            .module
            .get_class_var(name)
            .map(|_| "class variable"),
        Expr::GlobalVar(name) => (!rt.get_global(name).is_nil()).then_some("global-variable"),
        Expr::Constant(name) => {
            let found = scope.cref().lookup(name).is_some()
                || crate::native::resolve_path(rt, name).ok().flatten().is_some();
            found.then_some("constant")
        }
        Expr::ScopedConstant { scope: ns, name } => {
            let found = match ns.eval(scope, rt) {
                Ok(namespace) => lookup_in(&namespace, name, rt).is_ok(),
                Err(err) if err.is_rescuable() => false,
                Err(err) => return Err(err),
            };
            found.then_some("constant")
        }

        Expr::Call(call) => {
            let receiver = match &call.receiver {
                None => scope.self_value().clone(),
                Some(receiver) => match receiver.eval(scope, rt) {
                    Ok(value) => value,
                    Err(err) if err.is_rescuable() => return Ok(None),
                    Err(err) => return Err(err),
                },
            };
            rt.respond_to(&receiver, &call.name).then_some("method")
        }

        Expr::AssignLocal { .. }
        | Expr::AssignConstant { .. }
        | Expr::AssignInstanceVar { .. }
        | Expr::AssignClassVar { .. }
        | Expr::AssignGlobal { .. }
        | Expr::AssignMember { .. }
        | Expr::AssignIndex { .. } => Some("assignment"),

        _ => Some("expression"),
    };
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_and_missing() {
        let rt = Machine::new();
        let scope = rt.root_scope();
        scope.set("x", Value::Long(1));
        assert_eq!(
            eval_defined(&Expr::Name("x".into()), &scope, &rt).unwrap(),
            Value::string("local-variable")
        );
        assert_eq!(
            eval_defined(&Expr::Name("nope".into()), &scope, &rt).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_literals_and_assignment() {
        let rt = Machine::new();
        let scope = rt.root_scope();
        assert_eq!(eval_defined(&Expr::Nil, &scope, &rt).unwrap(), Value::string("nil"));
        let assign = Expr::AssignLocal {
            name: "y".into(),
            value: Box::new(Expr::Integer(1)),
        };
        assert_eq!(
            eval_defined(&assign, &scope, &rt).unwrap(),
            Value::string("assignment")
        );
        assert!(!scope.contains("y"));
    }
}
