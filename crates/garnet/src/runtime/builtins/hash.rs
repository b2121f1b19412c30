//! `Hash`
//!
//! Blocks given to iteration methods receive `[key, value]` pairs, which a
//! two-parameter block spreads over its parameters.

use std::rc::Rc;

use super::{define, define_static, this_hash, yield_block};
use crate::runtime::{CoreClasses, Machine};
use crate::value::{inspect, Args, HashValue, Proc, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_access(core);
    install_mutation(core);
    install_iteration(core);
}

fn pair(key: Value, value: Value) -> Value {
    Value::array(vec![key, value])
}

fn yield_pair(rt: &Machine, block: &Rc<Proc>, key: Value, value: Value) -> Result<Value, EvalError> {
    yield_block(rt, block, vec![pair(key, value)])
}

fn new_hash(pairs: Vec<(Value, Value)>) -> Value {
    Value::Hash(Rc::new(HashValue::from_pairs(pairs)))
}

// ═══════════════════════════════════════════════════════════════════════
// Lookup and queries
// ═══════════════════════════════════════════════════════════════════════

fn install_access(core: &CoreClasses) {
    let h = &core.hash;

    define_static(h, "new", -1, |_, _, args| {
        args.check(0, 1)?;
        let hash = HashValue::default();
        hash.set_default(args.get(0));
        Ok(Value::Hash(Rc::new(hash)))
    });

    define(h, "[]", 1, |_, this, args| {
        let hash = this_hash(this)?;
        Ok(hash.get(&args.get(0)).unwrap_or_else(|| hash.default_value()))
    });
    define(h, "fetch", -1, |rt, this, args| {
        args.check(1, 2)?;
        let hash = this_hash(this)?;
        let key = args.get(0);
        if let Some(value) = hash.get(&key) {
            return Ok(value);
        }
        match (&args.block, args.len()) {
            (Some(block), _) => yield_block(rt, block, vec![key]),
            (None, 2) => Ok(args.get(1)),
            (None, _) => Err(EvalError::argument(format!("key not found: {}", inspect(&key)))),
        }
    });
    define(h, "dig", -1, |rt, this, args| {
        let mut current = this.clone();
        for key in args.positional {
            if current.is_nil() {
                break;
            }
            current = rt.call_method(&current, "[]", Args::new(vec![key]))?;
        }
        Ok(current)
    });
    define(h, "default", 0, |_, this, _| Ok(this_hash(this)?.default_value()));
    define(h, "default=", 1, |_, this, args| {
        let hash = this_hash(this)?;
        hash.check_frozen()?;
        hash.set_default(args.get(0));
        Ok(args.get(0))
    });

    define(h, "keys", 0, |_, this, _| Ok(Value::array(this_hash(this)?.keys())));
    define(h, "values", 0, |_, this, _| Ok(Value::array(this_hash(this)?.values())));
    define(h, "values_at", -1, |_, this, args| {
        let hash = this_hash(this)?;
        Ok(Value::array(
            args.positional
                .iter()
                .map(|k| hash.get(k).unwrap_or_else(|| hash.default_value()))
                .collect(),
        ))
    });
    for name in ["key?", "has_key?", "include?", "member?"] {
        define(h, name, 1, |_, this, args| {
            Ok(Value::Bool(this_hash(this)?.contains_key(&args.get(0))))
        });
    }
    for name in ["value?", "has_value?"] {
        define(h, name, 1, |rt, this, args| {
            let target = args.get(0);
            for value in this_hash(this)?.values() {
                if rt.values_equal(&value, &target)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        });
    }
    define(h, "key", 1, |rt, this, args| {
        let target = args.get(0);
        for (key, value) in this_hash(this)?.entries() {
            if rt.values_equal(&value, &target)? {
                return Ok(key);
            }
        }
        Ok(Value::Nil)
    });
    for name in ["size", "length"] {
        define(h, name, 0, |_, this, _| Ok(Value::Long(this_hash(this)?.len() as i64)));
    }
    define(h, "count", 0, |rt, this, args| {
        let hash = this_hash(this)?;
        let Some(block) = &args.block else {
            return Ok(Value::Long(hash.len() as i64));
        };
        let mut n = 0;
        for (key, value) in hash.entries() {
            if yield_pair(rt, block, key, value)?.truthy() {
                n += 1;
            }
        }
        Ok(Value::Long(n))
    });
    define(h, "empty?", 0, |_, this, _| Ok(Value::Bool(this_hash(this)?.is_empty())));
    define(h, "any?", 0, |rt, this, args| {
        let hash = this_hash(this)?;
        let Some(block) = &args.block else {
            return Ok(Value::Bool(!hash.is_empty()));
        };
        for (key, value) in hash.entries() {
            if yield_pair(rt, block, key, value)?.truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    define(h, "==", 1, |rt, this, args| {
        Ok(Value::Bool(rt.values_equal(this, &args.get(0))?))
    });
    define(h, "to_h", 0, |_, this, _| Ok(this.clone()));
    define(h, "to_a", 0, |_, this, _| {
        Ok(Value::array(
            this_hash(this)?
                .entries()
                .into_iter()
                .map(|(k, v)| pair(k, v))
                .collect(),
        ))
    });
    for name in ["to_s", "inspect"] {
        define(h, name, 0, |rt, this, _| Ok(Value::string(rt.inspect_value(this)?)));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Mutation
// ═══════════════════════════════════════════════════════════════════════

fn install_mutation(core: &CoreClasses) {
    let h = &core.hash;

    for name in ["[]=", "store"] {
        define(h, name, 2, |_, this, args| {
            let value = args.get(1);
            this_hash(this)?.insert(args.get(0), value.clone())?;
            Ok(value)
        });
    }
    define(h, "delete", 1, |rt, this, args| {
        let key = args.get(0);
        match this_hash(this)?.remove(&key)? {
            Some(value) => Ok(value),
            None => match &args.block {
                Some(block) => yield_block(rt, block, vec![key]),
                None => Ok(Value::Nil),
            },
        }
    });
    define(h, "delete_if", 0, |rt, this, args| {
        let block = args.require_block()?;
        let hash = this_hash(this)?;
        hash.check_frozen()?;
        for (key, value) in hash.entries() {
            if yield_pair(rt, &block, key.clone(), value)?.truthy() {
                hash.remove(&key)?;
            }
        }
        Ok(this.clone())
    });
    define(h, "clear", 0, |_, this, _| {
        this_hash(this)?.clear()?;
        Ok(this.clone())
    });

    define(h, "merge", -1, |rt, this, args| {
        let hash = this_hash(this)?;
        let merged = HashValue::from_pairs(hash.entries());
        merged.set_default(hash.default_value());
        merge_into(rt, &merged, &args)?;
        Ok(Value::Hash(Rc::new(merged)))
    });
    for name in ["merge!", "update"] {
        define(h, name, -1, |rt, this, args| {
            let hash = this_hash(this)?;
            hash.check_frozen()?;
            merge_into(rt, hash, &args)?;
            Ok(this.clone())
        });
    }
}

/// Merge every argument hash into `target`. A block resolves conflicts as
/// `block(key, old, new)`.
fn merge_into(rt: &Machine, target: &HashValue, args: &Args) -> Result<(), EvalError> {
    for other in &args.positional {
        for (key, value) in this_hash(other)?.entries() {
            let value = match (&args.block, target.get(&key)) {
                (Some(block), Some(old)) => yield_block(rt, block, vec![key.clone(), old, value])?,
                _ => value,
            };
            target.insert(key, value)?;
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════

fn install_iteration(core: &CoreClasses) {
    let h = &core.hash;

    for name in ["each", "each_pair"] {
        define(h, name, 0, |rt, this, args| {
            let block = args.require_block()?;
            for (key, value) in this_hash(this)?.entries() {
                yield_pair(rt, &block, key, value)?;
            }
            Ok(this.clone())
        });
    }
    define(h, "each_key", 0, |rt, this, args| {
        let block = args.require_block()?;
        for key in this_hash(this)?.keys() {
            yield_block(rt, &block, vec![key])?;
        }
        Ok(this.clone())
    });
    define(h, "each_value", 0, |rt, this, args| {
        let block = args.require_block()?;
        for value in this_hash(this)?.values() {
            yield_block(rt, &block, vec![value])?;
        }
        Ok(this.clone())
    });
    define(h, "each_with_index", 0, |rt, this, args| {
        let block = args.require_block()?;
        for (i, (key, value)) in this_hash(this)?.entries().into_iter().enumerate() {
            yield_block(rt, &block, vec![pair(key, value), Value::Long(i as i64)])?;
        }
        Ok(this.clone())
    });

    for name in ["map", "collect"] {
        define(h, name, 0, |rt, this, args| {
            let block = args.require_block()?;
            let mut out = Vec::new();
            for (key, value) in this_hash(this)?.entries() {
                out.push(yield_pair(rt, &block, key, value)?);
            }
            Ok(Value::array(out))
        });
    }
    for name in ["select", "filter"] {
        define(h, name, 0, |rt, this, args| filter(rt, this, &args, true));
    }
    define(h, "reject", 0, |rt, this, args| filter(rt, this, &args, false));
    define(h, "find", 0, |rt, this, args| {
        let block = args.require_block()?;
        for (key, value) in this_hash(this)?.entries() {
            if yield_pair(rt, &block, key.clone(), value.clone())?.truthy() {
                return Ok(pair(key, value));
            }
        }
        Ok(Value::Nil)
    });
    define(h, "transform_values", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut out = Vec::new();
        for (key, value) in this_hash(this)?.entries() {
            out.push((key, yield_block(rt, &block, vec![value])?));
        }
        Ok(new_hash(out))
    });
    define(h, "transform_keys", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut out = Vec::new();
        for (key, value) in this_hash(this)?.entries() {
            out.push((yield_block(rt, &block, vec![key])?, value));
        }
        Ok(new_hash(out))
    });
    define(h, "sort_by", 0, |rt, this, args| {
        let pairs = Value::array(
            this_hash(this)?
                .entries()
                .into_iter()
                .map(|(k, v)| pair(k, v))
                .collect(),
        );
        rt.call_method(&pairs, "sort_by", Args::default().with_block(args.block))
    });
    define(h, "sum", 0, |rt, this, args| {
        let pairs = Value::array(
            this_hash(this)?
                .entries()
                .into_iter()
                .map(|(k, v)| pair(k, v))
                .collect(),
        );
        rt.call_method(&pairs, "sum", Args::default().with_block(args.block))
    });
}

fn filter(rt: &Machine, this: &Value, args: &Args, keep: bool) -> Result<Value, EvalError> {
    let block = args.require_block()?;
    let mut out = Vec::new();
    for (key, value) in this_hash(this)?.entries() {
        if yield_pair(rt, &block, key.clone(), value.clone())?.truthy() == keep {
            out.push((key, value));
        }
    }
    Ok(new_hash(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    #[test]
    fn test_default_value() {
        assert_eq!(run("h = Hash.new(0)\nh[:a] += 1\nh[:a]"), Value::Long(1));
        assert_eq!(run("h = {}\nh[:missing]"), Value::Nil);
    }

    #[test]
    fn test_fetch_missing_key() {
        let err = Machine::new().execute_text("{a: 1}.fetch(:b)").unwrap_err();
        assert_eq!(err.to_string(), "key not found: :b");
        assert_eq!(run("{a: 1}.fetch(:b, 2)"), Value::Long(2));
    }

    #[test]
    fn test_each_spreads_pairs() {
        assert_eq!(
            run("out = []\n{a: 1, b: 2}.each { |k, v| out.push(v) }\nout"),
            Value::array(vec![Value::Long(1), Value::Long(2)])
        );
    }

    #[test]
    fn test_merge_keeps_receiver() {
        assert_eq!(run("a = {x: 1}\nb = a.merge({y: 2})\na.size"), Value::Long(1));
        assert_eq!(run("a = {x: 1}\na.merge!({x: 2})\na[:x]"), Value::Long(2));
    }

    #[test]
    fn test_frozen_hash_rejects_delete() {
        let err = Machine::new()
            .execute_text("h = {a: 1}\nh.freeze\nh.delete(:a)")
            .unwrap_err();
        assert_eq!(err.class_name(), "FrozenError");
    }

    #[test]
    fn test_select_returns_hash() {
        assert_eq!(
            run("{a: 1, b: 2}.select { |k, v| v > 1 }.keys"),
            Value::array(vec![Value::symbol("b")])
        );
    }
}
