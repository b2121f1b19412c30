//! Definitions: `def`, `class`, `module` and `class << target`

use std::rc::Rc;

use super::assign::const_container;
use super::Evaluate;
use crate::ast::{ClassExpr, DefExpr, Expr, ModuleExpr};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::{Class, Method, MethodDef};
use crate::{EvalError, Value};

// ═══════════════════════════════════════════════════════════════════════
// def
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for DefExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let method = Method::Interpreted(Rc::new(MethodDef {
            name: self.name.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
            cref: scope.cref().clone(),
        }));

        let owner = match &self.target {
            None => scope.cref().module.clone(),
            Some(target) => {
                let target = target.eval(scope, rt)?;
                singleton_class_of(&target)?
            }
        };
        owner.define_method(self.name.clone(), method)?;
        Ok(Value::symbol(&self.name))
    }
}

/// The singleton class of an object or class.
pub fn singleton_class_of(value: &Value) -> Result<Rc<Class>, EvalError> {
    match value {
        Value::Object(obj) => Ok(obj.singleton_class()),
        Value::Class(class) => Ok(class.singleton_class()),
        other => Err(EvalError::type_error(format!(
            "can't define singleton for {}",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// class / module
// ═══════════════════════════════════════════════════════════════════════

fn qualified_name(rt: &Machine, container: &Rc<Class>, name: &str) -> String {
    if Rc::ptr_eq(container, &rt.core().object) {
        name.to_string()
    } else {
        format!("{}::{}", container.name(), name)
    }
}

impl Evaluate for ClassExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let container = const_container(&self.path, scope, rt)?;
        let name = &self.path.name;

        let superclass = match &self.superclass {
            None => None,
            Some(expr) => match expr.eval(scope, rt)? {
                Value::Class(class) if !class.is_module() => Some(class),
                _ => return Err(EvalError::type_error("superclass must be a Class")),
            },
        };

        let class = match container.own_constant(name) {
            Some(Value::Class(existing)) if !existing.is_module() => {
                if let Some(requested) = &superclass {
                    let same = existing
                        .superclass()
                        .is_some_and(|current| Rc::ptr_eq(&current, requested));
                    if !same {
                        return Err(EvalError::type_error(format!(
                            "superclass mismatch for class {}",
                            name
                        )));
                    }
                }
                existing
            }
            Some(_) => return Err(EvalError::type_error(format!("{} is not a class", name))),
            None => {
                let parent = superclass.unwrap_or_else(|| rt.core().object.clone());
                let class = Class::new_class(qualified_name(rt, &container, name), Some(parent));
                container.set_constant(name.clone(), Value::Class(class.clone()))?;
                tracing::debug!(class = class.name(), "defined class");
                class
            }
        };

        eval_class_body(rt, scope, class, &self.body)
    }
}

impl Evaluate for ModuleExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        let container = const_container(&self.path, scope, rt)?;
        let name = &self.path.name;

        let module = match container.own_constant(name) {
            Some(Value::Class(existing)) if existing.is_module() => existing,
            Some(_) => return Err(EvalError::type_error(format!("{} is not a module", name))),
            None => {
                let module = Class::new_module(qualified_name(rt, &container, name));
                container.set_constant(name.clone(), Value::Class(module.clone()))?;
                tracing::debug!(module = module.name(), "defined module");
                module
            }
        };

        eval_class_body(rt, scope, module, &self.body)
    }
}

/// `class << target`
pub fn eval_singleton_class(
    target: &Expr,
    body: &Expr,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let target = target.eval(scope, rt)?;
    let singleton = singleton_class_of(&target)?;
    eval_class_body(rt, scope, singleton, body)
}

/// Run a class or module body with `self` bound to the class.
///
/// Top-level `def`s in the body run before every other statement, so code
/// in the body can call methods defined textually after it. The result is
/// the value of the last statement.
pub fn eval_class_body(
    rt: &Machine,
    scope: &Rc<Scope>,
    class: Rc<Class>,
    body: &Expr,
) -> Result<Value, EvalError> {
    let cref = scope.cref().push(class.clone());
    let body_scope = Scope::class_body(Value::Class(class), cref);

    let statements = match body {
        Expr::Sequence(statements) => statements.as_slice(),
        other => std::slice::from_ref(other),
    };
    let is_def = |expr: &Expr| matches!(expr, Expr::Def(_));

    let mut results = vec![Value::Nil; statements.len()];
    for pass_defs in [true, false] {
        for (i, statement) in statements.iter().enumerate() {
            if is_def(statement) == pass_defs {
                results[i] = statement.eval(&body_scope, rt)?;
            }
        }
    }
    Ok(results.pop().unwrap_or(Value::Nil))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_of_integer_is_type_error() {
        let err = singleton_class_of(&Value::Long(1)).unwrap_err();
        assert_eq!(err.class_name(), "TypeError");
    }

    #[test]
    fn test_qualified_name() {
        let rt = Machine::new();
        let outer = Class::new_module("Outer");
        assert_eq!(qualified_name(&rt, &outer, "Inner"), "Outer::Inner");
        assert_eq!(qualified_name(&rt, &rt.core().object, "Top"), "Top");
    }
}
