//! `Kernel`, `Object`, `Comparable` and the nil/boolean classes

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::{define, int_arg, str_arg, yield_block};
use crate::eval::case::case_equal;
use crate::eval::literal::splat_values;
use crate::eval::variable::{get_ivar, set_ivar};
use crate::runtime::{CoreClasses, Machine};
use crate::value::{inspect, Args, HashKey, HashValue, Object, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_output(core);
    install_identity(core);
    install_reflection(core);
    install_conversions(core);
    install_comparable(core);
    install_nil_and_booleans(core);

    define(&core.object, "initialize", 0, |_, _, _| Ok(Value::Nil));
}

// ═══════════════════════════════════════════════════════════════════════
// Output and loops
// ═══════════════════════════════════════════════════════════════════════

fn install_output(core: &CoreClasses) {
    let k = &core.kernel;

    define(k, "puts", -1, |rt, _, args| {
        if args.is_empty() {
            rt.write_output("\n");
        }
        for arg in &args.positional {
            let mut lines = Vec::new();
            puts_lines(rt, arg, &mut lines)?;
            for line in lines {
                rt.write_output(&line);
                if !line.ends_with('\n') {
                    rt.write_output("\n");
                }
            }
        }
        Ok(Value::Nil)
    });

    define(k, "print", -1, |rt, _, args| {
        for arg in &args.positional {
            rt.write_output(&rt.display(arg)?);
        }
        Ok(Value::Nil)
    });

    define(k, "p", -1, |rt, _, args| {
        for arg in &args.positional {
            let text = rt.inspect_value(arg)?;
            rt.write_output(&text);
            rt.write_output("\n");
        }
        Ok(match args.positional.len() {
            0 => Value::Nil,
            1 => args.get(0),
            _ => Value::array(args.positional),
        })
    });

    // `break` leaves the loop through the call site of the block
    define(k, "loop", 0, |rt, _, args| {
        let block = args.require_block()?;
        loop {
            yield_block(rt, &block, vec![])?;
        }
    });
}

fn puts_lines(rt: &Machine, value: &Value, out: &mut Vec<String>) -> Result<(), EvalError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() && out.is_empty() {
                out.push(String::new());
            }
            for item in items.to_vec() {
                puts_lines(rt, &item, out)?;
            }
        }
        other => out.push(rt.display(other)?),
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Identity, equality, freezing
// ═══════════════════════════════════════════════════════════════════════

fn install_identity(core: &CoreClasses) {
    let k = &core.kernel;

    define(k, "==", 1, |rt, this, args| {
        Ok(Value::Bool(match this {
            Value::Object(_) => this.same(&args.get(0)),
            _ => rt.values_equal(this, &args.get(0))?,
        }))
    });
    define(k, "!=", 1, |rt, this, args| {
        Ok(Value::Bool(!rt.values_equal(this, &args.get(0))?))
    });
    define(k, "!", 0, |_, this, _| Ok(Value::Bool(!this.truthy())));
    define(k, "equal?", 1, |_, this, args| Ok(Value::Bool(this.same(&args.get(0)))));
    define(k, "eql?", 1, |_, this, args| {
        let other = args.get(0);
        Ok(Value::Bool(
            this.type_name() == other.type_name() && HashKey(this.clone()) == HashKey(other),
        ))
    });
    define(k, "===", 1, |rt, this, args| {
        Ok(Value::Bool(case_equal(rt, this, &args.get(0))?))
    });
    define(k, "<=>", 1, |rt, this, args| {
        Ok(if rt.values_equal(this, &args.get(0))? {
            Value::Long(0)
        } else {
            Value::Nil
        })
    });
    define(k, "hash", 0, |_, this, _| {
        let mut hasher = DefaultHasher::new();
        HashKey(this.clone()).hash(&mut hasher);
        Ok(Value::Long(hasher.finish() as i64))
    });
    define(k, "object_id", 0, |_, this, _| Ok(Value::Long(object_id(this))));

    define(k, "freeze", 0, |_, this, _| {
        this.freeze();
        Ok(this.clone())
    });
    define(k, "frozen?", 0, |_, this, _| Ok(Value::Bool(this.is_frozen())));
    define(k, "deep_freeze", 0, |_, this, _| {
        this.deep_freeze();
        Ok(this.clone())
    });
    define(k, "dup", 0, |_, this, _| Ok(shallow_copy(this)));
    define(k, "clone", 0, |_, this, _| {
        let copy = shallow_copy(this);
        if this.is_frozen() {
            copy.freeze();
        }
        Ok(copy)
    });
    define(k, "itself", 0, |_, this, _| Ok(this.clone()));
    define(k, "tap", 0, |rt, this, args| {
        yield_block(rt, &args.require_block()?, vec![this.clone()])?;
        Ok(this.clone())
    });
    define(k, "then", 0, |rt, this, args| {
        yield_block(rt, &args.require_block()?, vec![this.clone()])
    });
}

fn object_id(value: &Value) -> i64 {
    match value {
        Value::Nil => 8,
        Value::Bool(true) => 20,
        Value::Bool(false) => 0,
        Value::Int(_) | Value::Long(_) => value.as_i64().unwrap_or_default().wrapping_mul(2) + 1,
        other => match other.heap_id() {
            Some(id) => id as i64,
            None => {
                let mut hasher = DefaultHasher::new();
                HashKey(other.clone()).hash(&mut hasher);
                (hasher.finish() >> 1) as i64
            }
        },
    }
}

/// `dup`: a fresh, unfrozen container with the same elements.
fn shallow_copy(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::array(items.to_vec()),
        Value::Hash(hash) => {
            let copy = HashValue::from_pairs(hash.entries());
            copy.set_default(hash.default_value());
            Value::Hash(Rc::new(copy))
        }
        Value::Object(obj) => {
            let copy = Object::new(obj.class());
            for (name, ivar) in obj.ivars() {
                // a fresh object is never frozen
                let _ = copy.set_ivar(name, ivar);
            }
            Value::Object(Rc::new(copy))
        }
        other => other.clone(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Reflection
// ═══════════════════════════════════════════════════════════════════════

fn install_reflection(core: &CoreClasses) {
    let k = &core.kernel;

    define(k, "class", 0, |rt, this, _| {
        Ok(match this {
            Value::Native(obj) => Value::NativeType(obj.native_type().clone()),
            other => Value::Class(rt.class_of(other)),
        })
    });
    define(k, "singleton_class", 0, |_, this, _| {
        crate::eval::item::singleton_class_of(this).map(Value::Class)
    });
    define(k, "nil?", 0, |_, this, _| Ok(Value::Bool(this.is_nil())));
    define(k, "respond_to?", -1, |rt, this, args| {
        args.check(1, 2)?;
        Ok(Value::Bool(rt.respond_to(this, str_arg(&args.get(0))?)))
    });

    let is_a = |rt: &Machine, this: &Value, args: Args| match args.get(0) {
        Value::Class(class) => Ok(Value::Bool(rt.is_a(this, &class))),
        Value::NativeType(ty) => Ok(Value::Bool(matches!(
            this,
            Value::Native(obj) if Rc::ptr_eq(obj.native_type(), &ty)
        ))),
        _ => Err(EvalError::type_error("class or module required")),
    };
    define(k, "is_a?", 1, is_a);
    define(k, "kind_of?", 1, is_a);
    define(k, "instance_of?", 1, |rt, this, args| match args.get(0) {
        Value::Class(class) => Ok(Value::Bool(Rc::ptr_eq(&rt.class_of(this), &class))),
        _ => Err(EvalError::type_error("class or module required")),
    });

    let send = |rt: &Machine, this: &Value, args: Args| {
        let Args {
            mut positional,
            block,
        } = args;
        if positional.is_empty() {
            return Err(EvalError::argument("no method name given"));
        }
        let name = str_arg(&positional.remove(0))?.to_string();
        rt.call_method(this, &name, Args::new(positional).with_block(block))
    };
    define(k, "send", -1, send);
    define(k, "public_send", -1, send);
    define(k, "__send__", -1, send);

    define(k, "instance_variable_get", 1, |_, this, args| {
        Ok(get_ivar(this, str_arg(&args.get(0))?))
    });
    define(k, "instance_variable_set", 2, |_, this, args| {
        let value = args.get(1);
        set_ivar(this, str_arg(&args.get(0))?, value.clone())?;
        Ok(value)
    });
    define(k, "instance_variable_defined?", 1, |_, this, args| {
        let arg = args.get(0);
        let name = str_arg(&arg)?;
        let defined = match this {
            Value::Object(obj) => obj.get_ivar(name).is_some(),
            Value::Class(class) => class.get_ivar(name).is_some(),
            _ => false,
        };
        Ok(Value::Bool(defined))
    });
    define(k, "instance_variables", 0, |_, this, _| {
        let names = match this {
            Value::Object(obj) => obj.ivars().into_iter().map(|(n, _)| Value::symbol(n)).collect(),
            _ => Vec::new(),
        };
        Ok(Value::array(names))
    });

    define(k, "extend", -1, |_, this, args| {
        let singleton = crate::eval::item::singleton_class_of(this)?;
        for module in &args.positional {
            match module {
                Value::Class(module) if module.is_module() => singleton.include(module.clone())?,
                other => {
                    return Err(EvalError::type_error(format!(
                        "wrong argument type {} (expected Module)",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(this.clone())
    });
}

// ═══════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════

fn install_conversions(core: &CoreClasses) {
    let k = &core.kernel;

    define(k, "to_s", 0, |rt, this, _| {
        Ok(Value::string(match this {
            Value::Object(obj) => format!("#<{}>", obj.class().name()),
            Value::Native(_) => this.to_string(),
            other => rt.display(other)?,
        }))
    });
    define(k, "inspect", 0, |rt, this, _| {
        Ok(Value::string(match this {
            Value::Object(obj) => rt.default_inspect(obj)?,
            Value::Native(_) => inspect(this),
            other => rt.inspect_value(other)?,
        }))
    });

    define(k, "Integer", 1, |_, _, args| to_integer(&args.get(0)));
    define(k, "Float", 1, |_, _, args| to_float(&args.get(0)));
    define(k, "String", 1, |rt, _, args| Ok(Value::string(rt.display(&args.get(0))?)));
    define(k, "Array", 1, |_, _, args| match args.get(0) {
        Value::Array(items) => Ok(Value::Array(items)),
        other => Ok(Value::array(splat_values(other)?)),
    });
}

fn to_integer(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(_) | Value::Long(_) => Ok(value.clone()),
        Value::Float(x) if x.is_finite() => Ok(Value::Long(x.trunc() as i64)),
        Value::Float(x) => Err(EvalError::range(format!("{} out of range of integer", x))),
        Value::Str(text) => {
            let cleaned = text.trim().replace('_', "");
            cleaned.parse::<i64>().map(Value::Long).map_err(|_| {
                EvalError::argument(format!("invalid value for Integer(): {}", inspect(value)))
            })
        }
        Value::Nil => Err(EvalError::type_error("can't convert nil into Integer")),
        other => int_arg(other).map(Value::Long),
    }
}

fn to_float(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Str(text) => text
            .trim()
            .replace('_', "")
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EvalError::argument(format!("invalid value for Float(): {}", inspect(value)))),
        Value::Nil => Err(EvalError::type_error("can't convert nil into Float")),
        other => other.as_f64().map(Value::Float).ok_or_else(|| {
            EvalError::type_error(format!("can't convert {} into Float", other.type_name()))
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Comparable
// ═══════════════════════════════════════════════════════════════════════

fn install_comparable(core: &CoreClasses) {
    let c = &core.comparable;

    define(c, "<", 1, |rt, this, args| Ok(Value::Bool(spaceship(rt, this, &args.get(0))? < 0)));
    define(c, ">", 1, |rt, this, args| Ok(Value::Bool(spaceship(rt, this, &args.get(0))? > 0)));
    define(c, "<=", 1, |rt, this, args| Ok(Value::Bool(spaceship(rt, this, &args.get(0))? <= 0)));
    define(c, ">=", 1, |rt, this, args| Ok(Value::Bool(spaceship(rt, this, &args.get(0))? >= 0)));
    define(c, "between?", 2, |rt, this, args| {
        let low = spaceship(rt, this, &args.get(0))?;
        let high = spaceship(rt, this, &args.get(1))?;
        Ok(Value::Bool(low >= 0 && high <= 0))
    });
    define(c, "clamp", 2, |rt, this, args| {
        if spaceship(rt, this, &args.get(0))? < 0 {
            Ok(args.get(0))
        } else if spaceship(rt, this, &args.get(1))? > 0 {
            Ok(args.get(1))
        } else {
            Ok(this.clone())
        }
    });
}

fn spaceship(rt: &Machine, this: &Value, other: &Value) -> Result<i64, EvalError> {
    rt.call_method(this, "<=>", Args::new(vec![other.clone()]))?
        .as_i64()
        .ok_or_else(|| {
            EvalError::argument(format!(
                "comparison of {} with {} failed",
                this.type_name(),
                other.type_name()
            ))
        })
}

// ═══════════════════════════════════════════════════════════════════════
// nil, true, false
// ═══════════════════════════════════════════════════════════════════════

fn install_nil_and_booleans(core: &CoreClasses) {
    define(&core.nil_class, "to_s", 0, |_, _, _| Ok(Value::string("")));
    define(&core.nil_class, "to_a", 0, |_, _, _| Ok(Value::array(vec![])));
    define(&core.nil_class, "to_i", 0, |_, _, _| Ok(Value::Long(0)));
    define(&core.nil_class, "to_f", 0, |_, _, _| Ok(Value::Float(0.0)));
    define(&core.nil_class, "inspect", 0, |_, _, _| Ok(Value::string("nil")));

    for class in [&core.true_class, &core.false_class] {
        define(class, "&", 1, |_, this, args| {
            Ok(Value::Bool(this.truthy() && args.get(0).truthy()))
        });
        define(class, "|", 1, |_, this, args| {
            Ok(Value::Bool(this.truthy() || args.get(0).truthy()))
        });
        define(class, "^", 1, |_, this, args| {
            Ok(Value::Bool(this.truthy() != args.get(0).truthy()))
        });
    }
}
