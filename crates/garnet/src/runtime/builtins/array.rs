//! `Array`

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use super::{
    define, define_static, int_arg, ordering, range_span, slice_span, sort_values, str_arg,
    this_array, yield_block,
};
use crate::ast::BinaryOp;
use crate::eval::binary::{add, binary_op};
use crate::eval::case::case_equal;
use crate::runtime::{CoreClasses, Machine};
use crate::value::{Args, ArrayValue, HashKey, HashValue, Proc, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    install_access(core);
    install_mutation(core);
    install_iteration(core);
    install_queries(core);
    install_transforms(core);
}

fn block_truthy(rt: &Machine, block: &Rc<Proc>, item: &Value) -> Result<bool, EvalError> {
    Ok(yield_block(rt, block, vec![item.clone()])?.truthy())
}

// ═══════════════════════════════════════════════════════════════════════
// Construction and indexing
// ═══════════════════════════════════════════════════════════════════════

fn install_access(core: &CoreClasses) {
    let a = &core.array;

    define_static(a, "new", -1, |rt, _, args| {
        args.check(0, 2)?;
        let size = match args.get(0) {
            Value::Nil => 0,
            Value::Array(items) => return Ok(Value::array(items.to_vec())),
            other => int_arg(&other)?,
        };
        if size < 0 {
            return Err(EvalError::argument("negative array size"));
        }
        let mut items = Vec::with_capacity(size as usize);
        for i in 0..size {
            items.push(match &args.block {
                Some(block) => yield_block(rt, block, vec![Value::Long(i)])?,
                None => args.get(1),
            });
        }
        Ok(Value::array(items))
    });

    for name in ["[]", "slice"] {
        define(a, name, -1, |_, this, args| {
            args.check(1, 2)?;
            let items = this_array(this)?;
            let span = match (args.get(0), args.positional.get(1)) {
                (Value::Range(range), None) => range_span(&range, items.len())?,
                (index, None) => return Ok(items.get(int_arg(&index)?).unwrap_or(Value::Nil)),
                (start, Some(count)) => slice_span(int_arg(&start)?, int_arg(count)?, items.len()),
            };
            Ok(span.map_or(Value::Nil, |(start, len)| {
                Value::array(items.items()[start..start + len].to_vec())
            }))
        });
    }

    define(a, "[]=", -1, |_, this, args| {
        args.check(2, 3)?;
        let items = this_array(this)?;
        let value = args.positional[args.len() - 1].clone();
        let span = match (args.get(0), args.len()) {
            (Value::Range(range), 2) => range_span(&range, items.len())?,
            (index, 2) => {
                items.set(int_arg(&index)?, value.clone())?;
                return Ok(value);
            }
            (start, _) => slice_span(int_arg(&start)?, int_arg(&args.get(1))?, items.len()),
        };
        let (start, len) = span.ok_or_else(|| EvalError::range("index out of range"))?;
        let replacement = match &value {
            Value::Array(other) => other.to_vec(),
            other => vec![other.clone()],
        };
        items.modify(|v| {
            v.splice(start..start + len, replacement);
        })?;
        Ok(value)
    });

    define(a, "first", -1, |_, this, args| {
        args.check(0, 1)?;
        let items = this_array(this)?;
        match args.get(0) {
            Value::Nil => Ok(items.get(0).unwrap_or(Value::Nil)),
            n => {
                let n = take_count(&n)?.min(items.len());
                Ok(Value::array(items.items()[..n].to_vec()))
            }
        }
    });
    define(a, "last", -1, |_, this, args| {
        args.check(0, 1)?;
        let items = this_array(this)?;
        match args.get(0) {
            Value::Nil => Ok(items.get(-1).unwrap_or(Value::Nil)),
            n => {
                let len = items.len();
                let n = take_count(&n)?.min(len);
                Ok(Value::array(items.items()[len - n..].to_vec()))
            }
        }
    });
    define(a, "dig", -1, |rt, this, args| {
        let mut current = this.clone();
        for key in args.positional {
            if current.is_nil() {
                break;
            }
            current = rt.call_method(&current, "[]", Args::new(vec![key]))?;
        }
        Ok(current)
    });
}

fn take_count(n: &Value) -> Result<usize, EvalError> {
    let n = int_arg(n)?;
    usize::try_from(n).map_err(|_| EvalError::argument("negative array size"))
}

// ═══════════════════════════════════════════════════════════════════════
// Mutation
// ═══════════════════════════════════════════════════════════════════════

fn install_mutation(core: &CoreClasses) {
    let a = &core.array;

    for name in ["push", "append", "<<"] {
        define(a, name, -1, |_, this, args| {
            this_array(this)?.modify(|v| v.extend(args.positional))?;
            Ok(this.clone())
        });
    }
    for name in ["unshift", "prepend"] {
        define(a, name, -1, |_, this, args| {
            this_array(this)?.modify(|v| {
                v.splice(0..0, args.positional);
            })?;
            Ok(this.clone())
        });
    }
    define(a, "insert", -1, |_, this, args| {
        let items = this_array(this)?;
        let Args { mut positional, .. } = args;
        if positional.is_empty() {
            return Err(EvalError::arity(0, "1+"));
        }
        let index = int_arg(&positional.remove(0))?;
        let len = items.len() as i64;
        let at = if index < 0 { index + len + 1 } else { index };
        if at < 0 {
            return Err(EvalError::range(format!("index {} too small for array", index)));
        }
        let at = at as usize;
        items.modify(|v| {
            if at > v.len() {
                v.resize(at, Value::Nil);
            }
            v.splice(at..at, positional);
        })?;
        Ok(this.clone())
    });
    define(a, "pop", 0, |_, this, _| {
        Ok(this_array(this)?.modify(|v| v.pop())?.unwrap_or(Value::Nil))
    });
    define(a, "shift", 0, |_, this, _| {
        let items = this_array(this)?;
        Ok(items
            .modify(|v| if v.is_empty() { None } else { Some(v.remove(0)) })?
            .unwrap_or(Value::Nil))
    });
    define(a, "delete", 1, |rt, this, args| {
        let items = this_array(this)?;
        items.check_frozen()?;
        let target = args.get(0);
        let mut kept = Vec::new();
        let mut found = false;
        for item in items.to_vec() {
            if rt.values_equal(&item, &target)? {
                found = true;
            } else {
                kept.push(item);
            }
        }
        items.modify(|v| *v = kept)?;
        Ok(if found { target } else { Value::Nil })
    });
    define(a, "delete_at", 1, |_, this, args| {
        let items = this_array(this)?;
        let index = int_arg(&args.get(0))?;
        let Some(at) = crate::value::resolve_index(index, items.len()) else {
            items.check_frozen()?;
            return Ok(Value::Nil);
        };
        items.modify(|v| v.remove(at))
    });
    define(a, "delete_if", 0, |rt, this, args| {
        let block = args.require_block()?;
        let items = this_array(this)?;
        items.check_frozen()?;
        let mut kept = Vec::new();
        for item in items.to_vec() {
            if !block_truthy(rt, &block, &item)? {
                kept.push(item);
            }
        }
        items.modify(|v| *v = kept)?;
        Ok(this.clone())
    });
    define(a, "concat", -1, |_, this, args| {
        let items = this_array(this)?;
        let mut added = Vec::new();
        for other in &args.positional {
            added.extend(this_array(other)?.to_vec());
        }
        items.modify(|v| v.extend(added))?;
        Ok(this.clone())
    });
    define(a, "clear", 0, |_, this, _| {
        this_array(this)?.modify(Vec::clear)?;
        Ok(this.clone())
    });
    define(a, "replace", 1, |_, this, args| {
        let other = this_array(&args.get(0))?.to_vec();
        this_array(this)?.modify(|v| *v = other)?;
        Ok(this.clone())
    });
}

// ═══════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════

fn install_iteration(core: &CoreClasses) {
    let a = &core.array;

    // indexes are re-read each step so pushes during iteration are seen
    define(a, "each", 0, |rt, this, args| {
        let block = args.require_block()?;
        let items = this_array(this)?;
        let mut i = 0;
        while let Some(item) = items.get(i) {
            yield_block(rt, &block, vec![item])?;
            i += 1;
        }
        Ok(this.clone())
    });
    define(a, "each_with_index", 0, |rt, this, args| {
        let block = args.require_block()?;
        for (i, item) in this_array(this)?.to_vec().into_iter().enumerate() {
            yield_block(rt, &block, vec![item, Value::Long(i as i64)])?;
        }
        Ok(this.clone())
    });
    define(a, "each_with_object", 1, |rt, this, args| {
        let block = args.require_block()?;
        let memo = args.get(0);
        for item in this_array(this)?.to_vec() {
            yield_block(rt, &block, vec![item, memo.clone()])?;
        }
        Ok(memo)
    });
    define(a, "each_slice", 1, |rt, this, args| {
        let size = take_count(&args.get(0))?;
        if size == 0 {
            return Err(EvalError::argument("invalid slice size"));
        }
        let slices: Vec<Value> = this_array(this)?
            .to_vec()
            .chunks(size)
            .map(|chunk| Value::array(chunk.to_vec()))
            .collect();
        match &args.block {
            Some(block) => {
                for slice in slices {
                    yield_block(rt, block, vec![slice])?;
                }
                Ok(Value::Nil)
            }
            None => Ok(Value::array(slices)),
        }
    });
    define(a, "reverse_each", 0, |rt, this, args| {
        let block = args.require_block()?;
        for item in this_array(this)?.to_vec().into_iter().rev() {
            yield_block(rt, &block, vec![item])?;
        }
        Ok(this.clone())
    });

    for name in ["map", "collect"] {
        define(a, name, 0, |rt, this, args| {
            let block = args.require_block()?;
            let mut out = Vec::new();
            for item in this_array(this)?.to_vec() {
                out.push(yield_block(rt, &block, vec![item])?);
            }
            Ok(Value::array(out))
        });
    }
    define(a, "flat_map", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut out = Vec::new();
        for item in this_array(this)?.to_vec() {
            match yield_block(rt, &block, vec![item])? {
                Value::Array(inner) => out.extend(inner.to_vec()),
                other => out.push(other),
            }
        }
        Ok(Value::array(out))
    });
    define(a, "map_with_index", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut out = Vec::new();
        for (i, item) in this_array(this)?.to_vec().into_iter().enumerate() {
            out.push(yield_block(rt, &block, vec![item, Value::Long(i as i64)])?);
        }
        Ok(Value::array(out))
    });
    for name in ["select", "filter"] {
        define(a, name, 0, |rt, this, args| filter(rt, this, &args, true));
    }
    define(a, "reject", 0, |rt, this, args| filter(rt, this, &args, false));
    define(a, "partition", 0, |rt, this, args| {
        let block = args.require_block()?;
        let (mut yes, mut no) = (Vec::new(), Vec::new());
        for item in this_array(this)?.to_vec() {
            if block_truthy(rt, &block, &item)? {
                yes.push(item);
            } else {
                no.push(item);
            }
        }
        Ok(Value::array(vec![Value::array(yes), Value::array(no)]))
    });
    define(a, "group_by", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut groups: IndexMap<HashKey, Vec<Value>> = IndexMap::new();
        for item in this_array(this)?.to_vec() {
            let key = yield_block(rt, &block, vec![item.clone()])?;
            groups.entry(HashKey(key)).or_default().push(item);
        }
        Ok(Value::hash(
            groups
                .into_iter()
                .map(|(k, items)| (k.0, Value::array(items)))
                .collect(),
        ))
    });
    for name in ["find", "detect"] {
        define(a, name, 0, |rt, this, args| {
            let block = args.require_block()?;
            for item in this_array(this)?.to_vec() {
                if block_truthy(rt, &block, &item)? {
                    return Ok(item);
                }
            }
            Ok(Value::Nil)
        });
    }
    for name in ["index", "find_index"] {
        define(a, name, -1, |rt, this, args| {
            args.check(0, 1)?;
            for (i, item) in this_array(this)?.to_vec().into_iter().enumerate() {
                let hit = match &args.block {
                    Some(block) if args.is_empty() => block_truthy(rt, block, &item)?,
                    _ => rt.values_equal(&item, &args.get(0))?,
                };
                if hit {
                    return Ok(Value::Long(i as i64));
                }
            }
            Ok(Value::Nil)
        });
    }
    for name in ["reduce", "inject"] {
        define(a, name, -1, |rt, this, args| reduce(rt, this, args));
    }
}

fn filter(rt: &Machine, this: &Value, args: &Args, keep: bool) -> Result<Value, EvalError> {
    let block = args.require_block()?;
    let mut out = Vec::new();
    for item in this_array(this)?.to_vec() {
        if block_truthy(rt, &block, &item)? == keep {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

/// `reduce(init) { |acc, x| }`, `reduce { }`, `reduce(:+)` and
/// `reduce(init, :+)`.
fn reduce(rt: &Machine, this: &Value, args: Args) -> Result<Value, EvalError> {
    args.check(0, 2)?;
    let mut items = this_array(this)?.to_vec().into_iter();
    let (initial, operator) = match (args.len(), &args.block) {
        (2, _) => (Some(args.get(0)), Some(str_arg(&args.get(1))?.to_string())),
        (1, None) => (None, Some(str_arg(&args.get(0))?.to_string())),
        (1, Some(_)) => (Some(args.get(0)), None),
        _ => (None, None),
    };
    let Some(mut acc) = initial.or_else(|| items.next()) else {
        return Ok(Value::Nil);
    };
    for item in items {
        acc = match (&operator, &args.block) {
            (Some(op), _) => rt.call_method(&acc, op, Args::new(vec![item]))?,
            (None, Some(block)) => yield_block(rt, block, vec![acc, item])?,
            (None, None) => return Err(EvalError::name("no block given (yield)")),
        };
    }
    Ok(acc)
}

// ═══════════════════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════════════════

fn install_queries(core: &CoreClasses) {
    let a = &core.array;

    for name in ["length", "size"] {
        define(a, name, 0, |_, this, _| Ok(Value::Long(this_array(this)?.len() as i64)));
    }
    define(a, "empty?", 0, |_, this, _| Ok(Value::Bool(this_array(this)?.is_empty())));
    define(a, "include?", 1, |rt, this, args| {
        let target = args.get(0);
        for item in this_array(this)?.to_vec() {
            if rt.values_equal(&item, &target)? {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    define(a, "count", -1, |rt, this, args| {
        args.check(0, 1)?;
        let items = this_array(this)?.to_vec();
        let mut n = 0;
        for item in &items {
            let counted = match (&args.block, args.is_empty()) {
                (_, false) => rt.values_equal(item, &args.get(0))?,
                (Some(block), true) => block_truthy(rt, block, item)?,
                (None, true) => true,
            };
            if counted {
                n += 1;
            }
        }
        Ok(Value::Long(n))
    });
    define(a, "any?", -1, |rt, this, args| predicate(rt, this, &args, Quantifier::Any));
    define(a, "all?", -1, |rt, this, args| predicate(rt, this, &args, Quantifier::All));
    define(a, "none?", -1, |rt, this, args| predicate(rt, this, &args, Quantifier::None));

    define(a, "sum", -1, |rt, this, args| {
        args.check(0, 1)?;
        let mut total = match args.get(0) {
            Value::Nil => Value::Long(0),
            init => init,
        };
        for item in this_array(this)?.to_vec() {
            let item = match &args.block {
                Some(block) => yield_block(rt, block, vec![item])?,
                None => item,
            };
            total = match &total {
                Value::Object(_) | Value::Native(_) => binary_op(rt, BinaryOp::Add, &total, &item)?,
                _ => add(rt, &total, &item)?,
            };
        }
        Ok(total)
    });
    define(a, "min", 0, |rt, this, args| extreme(rt, this, &args, std::cmp::Ordering::Less));
    define(a, "max", 0, |rt, this, args| extreme(rt, this, &args, std::cmp::Ordering::Greater));
    define(a, "min_by", 0, |rt, this, args| extreme_by(rt, this, &args, std::cmp::Ordering::Less));
    define(a, "max_by", 0, |rt, this, args| {
        extreme_by(rt, this, &args, std::cmp::Ordering::Greater)
    });

    for name in ["to_s", "inspect"] {
        define(a, name, 0, |rt, this, _| Ok(Value::string(rt.inspect_value(this)?)));
    }
    define(a, "to_a", 0, |_, this, _| Ok(this.clone()));
    define(a, "to_h", 0, |_, this, _| {
        let mut pairs = Vec::new();
        for pair in this_array(this)?.to_vec() {
            match pair.as_array().map(|p| p.to_vec()) {
                Some(kv) if kv.len() == 2 => pairs.push((kv[0].clone(), kv[1].clone())),
                _ => {
                    return Err(EvalError::type_error(format!(
                        "wrong element type {} (expected array)",
                        pair.type_name()
                    )))
                }
            }
        }
        Ok(Value::Hash(Rc::new(HashValue::from_pairs(pairs))))
    });
    define(a, "join", -1, |rt, this, args| {
        args.check(0, 1)?;
        let separator = match args.get(0) {
            Value::Nil => String::new(),
            other => str_arg(&other)?.to_string(),
        };
        Ok(Value::string(join(rt, this_array(this)?, &separator, &mut Vec::new())?))
    });
}

#[derive(Clone, Copy, PartialEq)]
enum Quantifier {
    Any,
    All,
    None,
}

/// `any?`/`all?`/`none?` with a block, a `===` pattern, or plain
/// truthiness.
fn predicate(rt: &Machine, this: &Value, args: &Args, quantifier: Quantifier) -> Result<Value, EvalError> {
    args.check(0, 1)?;
    for item in this_array(this)?.to_vec() {
        let hit = match (&args.block, args.is_empty()) {
            (_, false) => case_equal(rt, &args.get(0), &item)?,
            (Some(block), true) => block_truthy(rt, block, &item)?,
            (None, true) => item.truthy(),
        };
        match quantifier {
            Quantifier::Any if hit => return Ok(Value::Bool(true)),
            Quantifier::All if !hit => return Ok(Value::Bool(false)),
            Quantifier::None if hit => return Ok(Value::Bool(false)),
            _ => {}
        }
    }
    Ok(Value::Bool(quantifier != Quantifier::Any))
}

fn extreme(rt: &Machine, this: &Value, args: &Args, wanted: std::cmp::Ordering) -> Result<Value, EvalError> {
    let mut best: Option<Value> = None;
    for item in this_array(this)?.to_vec() {
        best = Some(match best {
            Some(current) if ordering(rt, args.block.as_ref(), &item, &current)? != wanted => current,
            _ => item,
        });
    }
    Ok(best.unwrap_or(Value::Nil))
}

fn extreme_by(rt: &Machine, this: &Value, args: &Args, wanted: std::cmp::Ordering) -> Result<Value, EvalError> {
    let block = args.require_block()?;
    let mut best: Option<(Value, Value)> = None;
    for item in this_array(this)?.to_vec() {
        let key = yield_block(rt, &block, vec![item.clone()])?;
        best = Some(match best {
            Some((current, current_key)) if ordering(rt, None, &key, &current_key)? != wanted => {
                (current, current_key)
            }
            _ => (item, key),
        });
    }
    Ok(best.map(|(item, _)| item).unwrap_or(Value::Nil))
}

fn join(rt: &Machine, items: &Rc<ArrayValue>, separator: &str, visiting: &mut Vec<usize>) -> Result<String, EvalError> {
    let id = Rc::as_ptr(items) as usize;
    if visiting.contains(&id) {
        return Err(EvalError::argument("recursive array join"));
    }
    visiting.push(id);
    let mut parts = Vec::with_capacity(items.len());
    for item in items.to_vec() {
        parts.push(match &item {
            Value::Array(inner) => join(rt, inner, separator, visiting)?,
            other => rt.display(other)?,
        });
    }
    visiting.pop();
    Ok(parts.join(separator))
}

// ═══════════════════════════════════════════════════════════════════════
// Transformations returning new arrays
// ═══════════════════════════════════════════════════════════════════════

fn install_transforms(core: &CoreClasses) {
    let a = &core.array;

    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Eq] {
        define(a, op.method_name(), 1, move |rt, this, args| {
            binary_op(rt, op, this, &args.get(0))
        });
    }
    define(a, "&", 1, |_, this, args| {
        let other: IndexSet<HashKey> = this_array(&args.get(0))?
            .to_vec()
            .into_iter()
            .map(HashKey)
            .collect();
        let mut seen = IndexSet::new();
        for item in this_array(this)?.to_vec() {
            if other.contains(&HashKey(item.clone())) {
                seen.insert(HashKey(item));
            }
        }
        Ok(Value::array(seen.into_iter().map(|k| k.0).collect()))
    });
    define(a, "|", 1, |_, this, args| {
        let mut seen = IndexSet::new();
        for item in this_array(this)?.to_vec().into_iter().chain(this_array(&args.get(0))?.to_vec()) {
            seen.insert(HashKey(item));
        }
        Ok(Value::array(seen.into_iter().map(|k| k.0).collect()))
    });

    define(a, "reverse", 0, |_, this, _| {
        let mut items = this_array(this)?.to_vec();
        items.reverse();
        Ok(Value::array(items))
    });
    define(a, "sort", 0, |rt, this, args| {
        let mut items = this_array(this)?.to_vec();
        sort_values(&mut items, |a, b| ordering(rt, args.block.as_ref(), a, b))?;
        Ok(Value::array(items))
    });
    define(a, "sort_by", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut keyed = Vec::new();
        for item in this_array(this)?.to_vec() {
            keyed.push((yield_block(rt, &block, vec![item.clone()])?, item));
        }
        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            ordering(rt, None, a, b).unwrap_or_else(|err| {
                failure.get_or_insert(err);
                std::cmp::Ordering::Equal
            })
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(Value::array(keyed.into_iter().map(|(_, item)| item).collect()))
    });
    define(a, "uniq", 0, |rt, this, args| {
        let mut seen = IndexSet::new();
        let mut out = Vec::new();
        for item in this_array(this)?.to_vec() {
            let key = match &args.block {
                Some(block) => yield_block(rt, block, vec![item.clone()])?,
                None => item.clone(),
            };
            if seen.insert(HashKey(key)) {
                out.push(item);
            }
        }
        Ok(Value::array(out))
    });
    define(a, "flatten", -1, |_, this, args| {
        args.check(0, 1)?;
        let depth = match args.get(0) {
            Value::Nil => None,
            n => Some(int_arg(&n)?),
        };
        let mut out = Vec::new();
        flatten_into(this_array(this)?, depth, &mut out, &mut Vec::new())?;
        Ok(Value::array(out))
    });
    define(a, "compact", 0, |_, this, _| {
        Ok(Value::array(
            this_array(this)?.to_vec().into_iter().filter(|v| !v.is_nil()).collect(),
        ))
    });
    define(a, "take", 1, |_, this, args| {
        let n = take_count(&args.get(0))?;
        Ok(Value::array(this_array(this)?.to_vec().into_iter().take(n).collect()))
    });
    define(a, "drop", 1, |_, this, args| {
        let n = take_count(&args.get(0))?;
        Ok(Value::array(this_array(this)?.to_vec().into_iter().skip(n).collect()))
    });
    define(a, "take_while", 0, |rt, this, args| {
        let block = args.require_block()?;
        let mut out = Vec::new();
        for item in this_array(this)?.to_vec() {
            if !block_truthy(rt, &block, &item)? {
                break;
            }
            out.push(item);
        }
        Ok(Value::array(out))
    });
    define(a, "drop_while", 0, |rt, this, args| {
        let block = args.require_block()?;
        let items = this_array(this)?.to_vec();
        let mut start = items.len();
        for (i, item) in items.iter().enumerate() {
            if !block_truthy(rt, &block, item)? {
                start = i;
                break;
            }
        }
        Ok(Value::array(items[start..].to_vec()))
    });
    define(a, "zip", -1, |_, this, args| {
        let others = args
            .positional
            .iter()
            .map(|o| this_array(o).map(|a| a.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        let zipped = this_array(this)?
            .to_vec()
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let mut row = vec![item];
                row.extend(others.iter().map(|o| o.get(i).cloned().unwrap_or(Value::Nil)));
                Value::array(row)
            })
            .collect();
        Ok(Value::array(zipped))
    });
    define(a, "rotate", -1, |_, this, args| {
        args.check(0, 1)?;
        let mut items = this_array(this)?.to_vec();
        if !items.is_empty() {
            let by = match args.get(0) {
                Value::Nil => 1,
                n => int_arg(&n)?,
            };
            let shift = by.rem_euclid(items.len() as i64) as usize;
            items.rotate_left(shift);
        }
        Ok(Value::array(items))
    });
}

fn flatten_into(
    items: &Rc<ArrayValue>,
    depth: Option<i64>,
    out: &mut Vec<Value>,
    visiting: &mut Vec<usize>,
) -> Result<(), EvalError> {
    let id = Rc::as_ptr(items) as usize;
    if visiting.contains(&id) {
        return Err(EvalError::argument("tried to flatten recursive array"));
    }
    visiting.push(id);
    for item in items.to_vec() {
        match (&item, depth) {
            (Value::Array(inner), None) => flatten_into(inner, None, out, visiting)?,
            (Value::Array(inner), Some(d)) if d > 0 => flatten_into(inner, Some(d - 1), out, visiting)?,
            _ => out.push(item),
        }
    }
    visiting.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Long).collect())
    }

    #[test]
    fn test_map_select_reduce() {
        assert_eq!(run("[1, 2, 3].map { |x| x * 2 }"), ints(&[2, 4, 6]));
        assert_eq!(run("[1, 2, 3, 4].select { |x| x.even? }"), ints(&[2, 4]));
        assert_eq!(run("[1, 2, 3].reduce(10) { |acc, x| acc + x }"), Value::Long(16));
        assert_eq!(run("[1, 2, 3].reduce(:+)"), Value::Long(6));
    }

    #[test]
    fn test_slicing_and_assignment() {
        assert_eq!(run("[1, 2, 3, 4][1..2]"), ints(&[2, 3]));
        assert_eq!(run("a = [1, 2, 3]\na[1, 1] = [7, 8]\na"), ints(&[1, 7, 8, 3]));
        assert_eq!(run("a = []\na[2] = 1\na"), Value::array(vec![Value::Nil, Value::Nil, Value::Long(1)]));
    }

    #[test]
    fn test_sort_variants() {
        assert_eq!(run("[3, 1, 2].sort"), ints(&[1, 2, 3]));
        assert_eq!(run("[3, 1, 2].sort { |a, b| b <=> a }"), ints(&[3, 2, 1]));
        assert_eq!(
            run("['ccc', 'a', 'bb'].sort_by { |s| s.length }"),
            Value::array(vec![Value::string("a"), Value::string("bb"), Value::string("ccc")])
        );
    }

    #[test]
    fn test_sort_of_mixed_types_fails() {
        let err = Machine::new().execute_text("[1, 'a'].sort").unwrap_err();
        assert_eq!(err.class_name(), "ArgumentError");
        assert!(err.to_string().starts_with("comparison of"));
    }

    #[test]
    fn test_frozen_array_rejects_push() {
        let err = Machine::new().execute_text("a = [1].freeze\na.push(2)").unwrap_err();
        assert_eq!(err.class_name(), "FrozenError");
    }

    #[test]
    fn test_join_nested() {
        assert_eq!(run("[1, [2, 3], nil].join('-')"), Value::string("1-2-3-"));
    }

    #[test]
    fn test_each_block_pairs_splat() {
        assert_eq!(run("t = 0\n[[1, 2], [3, 4]].each { |a, b| t += a * b }\nt"), Value::Long(14));
    }
}
