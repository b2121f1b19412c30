//! `Module` and `Class`: instantiation, mixins, accessors and reflection

use std::rc::Rc;

use super::{define, str_arg, wrong_receiver};
use crate::eval::variable::{get_ivar, set_ivar};
use crate::runtime::{CoreClasses, Machine};
use crate::value::{Args, BuiltinFn, Class, Method, Object, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_instantiation(core);
    install_mixins_and_accessors(core);
    install_reflection(core);
}

fn this_class(this: &Value) -> Result<&Rc<Class>, EvalError> {
    this.as_class().ok_or_else(|| wrong_receiver("Module", this))
}

fn module_arg(value: &Value) -> Result<Rc<Class>, EvalError> {
    match value {
        Value::Class(module) if module.is_module() => Ok(module.clone()),
        other => Err(EvalError::type_error(format!(
            "wrong argument type {} (expected Module)",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// new / allocate
// ═══════════════════════════════════════════════════════════════════════

fn install_instantiation(core: &CoreClasses) {
    // `Foo.new(args)` allocates and runs `initialize`; it is the only
    // place `initialize` is called from
    define(&core.class, "new", -1, |rt, this, args| {
        let class = this_class(this)?;
        if class.is_module() {
            return Err(EvalError::no_method(format!(
                "undefined method 'new' for module {}",
                class.name()
            )));
        }
        if Rc::ptr_eq(class, &rt.core().class) {
            return new_anonymous_class(rt, args);
        }
        let object = Value::Object(Rc::new(Object::new(class.clone())));
        rt.call_method(&object, "initialize", args)?;
        Ok(object)
    });

    define(&core.class, "allocate", 0, |_, this, _| {
        let class = this_class(this)?;
        Ok(Value::Object(Rc::new(Object::new(class.clone()))))
    });

    define(&core.class, "superclass", 0, |_, this, _| {
        Ok(this_class(this)?
            .superclass()
            .map(Value::Class)
            .unwrap_or(Value::Nil))
    });
}

/// `Class.new(superclass) { ... }`: the block runs with the new class as
/// `self`, so `define_method` and `attr_*` calls land on it.
fn new_anonymous_class(rt: &Machine, args: Args) -> Result<Value, EvalError> {
    args.check(0, 1)?;
    let superclass = match args.get(0) {
        Value::Nil => rt.object_class(),
        Value::Class(class) if !class.is_module() => class,
        _ => return Err(EvalError::type_error("superclass must be a Class")),
    };
    let class = Value::Class(Class::new_class("#<Class>", Some(superclass)));
    if let Some(block) = &args.block {
        rt.call_proc_as(block, Args::new(vec![class.clone()]), Some(class.clone()))?;
    }
    Ok(class)
}

// ═══════════════════════════════════════════════════════════════════════
// include, attr_*, define_method
// ═══════════════════════════════════════════════════════════════════════

fn install_mixins_and_accessors(core: &CoreClasses) {
    let m = &core.module;

    define(m, "include", -1, |_, this, args| {
        let class = this_class(this)?;
        for module in &args.positional {
            class.include(module_arg(module)?)?;
        }
        Ok(this.clone())
    });
    define(m, "include?", 1, |_, this, args| {
        let class = this_class(this)?;
        let module = module_arg(&args.get(0))?;
        Ok(Value::Bool(!Rc::ptr_eq(class, &module) && class.inherits_from(&module)))
    });

    define(m, "attr_reader", -1, |_, this, args| {
        define_accessors(this_class(this)?, &args, true, false)
    });
    define(m, "attr_writer", -1, |_, this, args| {
        define_accessors(this_class(this)?, &args, false, true)
    });
    define(m, "attr_accessor", -1, |_, this, args| {
        define_accessors(this_class(this)?, &args, true, true)
    });

    define(m, "define_method", -1, |_, this, args| {
        args.check(1, 2)?;
        let class = this_class(this)?;
        let name = str_arg(&args.get(0))?.to_string();
        let body = match (args.positional.get(1), &args.block) {
            (Some(Value::Proc(proc)), _) => proc.clone(),
            (None, Some(block)) => block.clone(),
            _ => return Err(EvalError::argument("tried to create Proc object without a block")),
        };
        class.define_method(name.clone(), Method::Block(Rc::new(body.with_lambda(true))))?;
        Ok(Value::symbol(name))
    });

    define(m, "alias_method", 2, |rt, this, args| {
        let class = this_class(this)?;
        let new_name = str_arg(&args.get(0))?.to_string();
        let old = args.get(1);
        let old_name = str_arg(&old)?;
        let method = class.find_method(old_name).ok_or_else(|| {
            EvalError::name(format!(
                "undefined method '{}' for {}",
                old_name,
                rt.describe_receiver(this)
            ))
        })?;
        class.define_method(new_name.clone(), method)?;
        Ok(Value::symbol(new_name))
    });

    define(m, "remove_method", -1, |_, this, args| {
        let class = this_class(this)?;
        for name in &args.positional {
            let name = str_arg(name)?;
            if !class.remove_method(name)? {
                return Err(EvalError::name(format!(
                    "method '{}' not defined in {}",
                    name,
                    class.name()
                )));
            }
        }
        Ok(this.clone())
    });

    // visibility is not modelled
    for name in ["private", "public", "protected", "module_function", "private_constant"] {
        define(m, name, -1, |_, _, args| {
            Ok(match args.positional.len() {
                0 => Value::Nil,
                1 => args.get(0),
                _ => Value::array(args.positional),
            })
        });
    }
}

fn define_accessors(
    class: &Rc<Class>,
    args: &Args,
    reader: bool,
    writer: bool,
) -> Result<Value, EvalError> {
    let mut defined = Vec::new();
    for name in &args.positional {
        let name = str_arg(name)?.to_string();
        let ivar = format!("@{}", name);
        if reader {
            let ivar = ivar.clone();
            class.define_method(
                name.clone(),
                Method::Builtin(BuiltinFn::new(name.clone(), 0, move |_, this, _| {
                    Ok(get_ivar(this, &ivar))
                })),
            )?;
            defined.push(Value::symbol(&name));
        }
        if writer {
            let setter = format!("{}=", name);
            class.define_method(
                setter.clone(),
                Method::Builtin(BuiltinFn::new(setter.clone(), 1, move |_, this, args| {
                    let value = args.get(0);
                    set_ivar(this, &ivar, value.clone())?;
                    Ok(value)
                })),
            )?;
            defined.push(Value::symbol(setter));
        }
    }
    Ok(Value::array(defined))
}

// ═══════════════════════════════════════════════════════════════════════
// Reflection
// ═══════════════════════════════════════════════════════════════════════

fn install_reflection(core: &CoreClasses) {
    let m = &core.module;

    define(m, "name", 0, |_, this, _| Ok(Value::string(this_class(this)?.name())));
    define(m, "to_s", 0, |_, this, _| Ok(Value::string(this_class(this)?.name())));
    define(m, "inspect", 0, |_, this, _| Ok(Value::string(this_class(this)?.name())));

    define(m, "===", 1, |rt, this, args| {
        Ok(Value::Bool(rt.is_a(&args.get(0), this_class(this)?)))
    });
    define(m, "==", 1, |_, this, args| Ok(Value::Bool(this.same(&args.get(0)))));
    define(m, "<", 1, |_, this, args| {
        let class = this_class(this)?;
        let other = args.get(0);
        let other = this_class(&other)
            .map_err(|_| EvalError::type_error("compared with non class/module"))?;
        Ok(if Rc::ptr_eq(class, other) {
            Value::Bool(false)
        } else if class.inherits_from(other) {
            Value::Bool(true)
        } else if other.inherits_from(class) {
            Value::Bool(false)
        } else {
            Value::Nil
        })
    });
    define(m, "<=", 1, |_, this, args| {
        let class = this_class(this)?;
        let other = args.get(0);
        let other = this_class(&other)
            .map_err(|_| EvalError::type_error("compared with non class/module"))?;
        Ok(if class.inherits_from(other) {
            Value::Bool(true)
        } else if other.inherits_from(class) {
            Value::Bool(false)
        } else {
            Value::Nil
        })
    });

    define(m, "ancestors", 0, |_, this, _| {
        let ancestors = this_class(this)?.ancestors();
        Ok(Value::array(ancestors.into_iter().map(Value::Class).collect()))
    });

    define(m, "instance_methods", -1, |rt, this, args| {
        args.check(0, 1)?;
        let class = this_class(this)?;
        let inherited = args.positional.is_empty() || args.get(0).truthy();
        let mut names = Vec::new();
        let sources: Vec<Rc<Class>> = if inherited {
            let core = rt.core();
            class
                .ancestors()
                .into_iter()
                .filter(|c| !Rc::ptr_eq(c, &core.object) && !Rc::ptr_eq(c, &core.kernel))
                .collect()
        } else {
            vec![class.clone()]
        };
        for source in sources {
            for name in source.own_method_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(Value::array(names.into_iter().map(Value::symbol).collect()))
    });

    define(m, "method_defined?", 1, |_, this, args| {
        let arg = args.get(0);
        let name = str_arg(&arg)?;
        Ok(Value::Bool(this_class(this)?.find_method(name).is_some()))
    });

    define(m, "const_get", 1, |_, this, args| {
        let mut current = this_class(this)?.clone();
        let path = str_arg(&args.get(0))?.to_string();
        let mut value = Value::Class(current.clone());
        for segment in path.split("::") {
            value = current
                .find_constant(segment)
                .ok_or_else(|| EvalError::name(format!("unitialized constant {}", segment)))?;
            if let Value::Class(next) = &value {
                current = next.clone();
            }
        }
        Ok(value)
    });
    define(m, "const_set", 2, |_, this, args| {
        let arg = args.get(0);
        let name = str_arg(&arg)?;
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(EvalError::name(format!("wrong constant name {}", name)));
        }
        let value = args.get(1);
        this_class(this)?.set_constant(name, value.clone())?;
        Ok(value)
    });
    define(m, "const_defined?", 1, |_, this, args| {
        let arg = args.get(0);
        let name = str_arg(&arg)?;
        Ok(Value::Bool(this_class(this)?.find_constant(name).is_some()))
    });
    define(m, "constants", 0, |_, this, _| {
        let names = this_class(this)?.constant_names();
        Ok(Value::array(names.into_iter().map(Value::symbol).collect()))
    });

    define(m, "class_variable_get", 1, |_, this, args| {
        let class = this_class(this)?;
        let arg = args.get(0);
        let name = str_arg(&arg)?;
        class.get_class_var(name).ok_or_else(|| {
            EvalError::name(format!(
                "uninitialized class variable {} in {}",
                name,
                class.name()
            ))
        })
    });
    define(m, "class_variable_set", 2, |_, this, args| {
        let value = args.get(1);
        this_class(this)?.set_class_var(str_arg(&args.get(0))?, value.clone())?;
        Ok(value)
    });
}
