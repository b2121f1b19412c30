//! `Proc`

use std::rc::Rc;

use super::{define, define_static};
use crate::runtime::{CoreClasses, Machine};
use crate::value::{Args, BuiltinFn, Proc, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    let p = &core.proc;

    define_static(p, "new", 0, |_, _, args| {
        let block = args.require_block()?;
        Ok(Value::proc(block.with_lambda(false)))
    });

    for name in ["call", "()", "[]", "yield", "==="] {
        define(p, name, -1, |rt, this, args| rt.call_proc(this_proc(this)?, args));
    }
    define(p, "arity", 0, |_, this, _| Ok(Value::Long(this_proc(this)?.arity())));
    define(p, "lambda?", 0, |_, this, _| Ok(Value::Bool(this_proc(this)?.is_lambda)));
    define(p, "to_proc", 0, |_, this, _| Ok(this.clone()));
    define(p, "parameters", 0, |_, this, _| {
        let proc = this_proc(this)?;
        let arity = proc.arity();
        let required = if arity < 0 { -arity - 1 } else { arity };
        let kind = if proc.is_lambda { "req" } else { "opt" };
        Ok(Value::array(
            (0..required)
                .map(|_| Value::array(vec![Value::symbol(kind)]))
                .collect(),
        ))
    });
    define(p, "curry", -1, |_, this, args| {
        args.check(0, 1)?;
        let proc = this_proc(this)?.clone();
        let arity = match args.get(0) {
            Value::Nil => proc.arity(),
            n => super::int_arg(&n)?,
        };
        let arity = if arity < 0 { -arity - 1 } else { arity };
        Ok(curried(proc, arity as usize, Vec::new()))
    });
    for name in ["to_s", "inspect"] {
        define(p, name, 0, |_, this, _| {
            let proc = this_proc(this)?;
            let suffix = if proc.is_lambda { " (lambda)" } else { "" };
            Ok(Value::string(format!("#<Proc:{:#x}{}>", proc.id, suffix)))
        });
    }
}

fn this_proc(this: &Value) -> Result<&Rc<Proc>, EvalError> {
    this.as_proc()
        .ok_or_else(|| super::wrong_receiver("Proc", this))
}

/// A lambda that gathers arguments until `arity` have been supplied, then
/// calls `target` with all of them.
fn curried(target: Rc<Proc>, arity: usize, gathered: Vec<Value>) -> Value {
    if gathered.len() >= arity {
        // nothing left to gather; a call runs the target directly
        return Value::Proc(target);
    }
    let func = BuiltinFn::new("curry", -1, move |rt: &Machine, _: &Value, args: Args| {
        let mut all = gathered.clone();
        all.extend(args.positional);
        if all.len() >= arity {
            rt.call_proc(&target, Args::new(all))
        } else {
            Ok(curried(target.clone(), arity, all))
        }
    });
    Value::proc(Proc::builtin(func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    #[test]
    fn test_call_forms() {
        assert_eq!(run("sq = lambda { |x| x * x }\nsq.call(3)"), Value::Long(9));
        assert_eq!(run("sq = lambda { |x| x * x }\nsq[4]"), Value::Long(16));
    }

    #[test]
    fn test_lambda_predicate() {
        assert_eq!(run("lambda { |x| x }.lambda?"), Value::Bool(true));
        assert_eq!(run("proc { |x| x }.lambda?"), Value::Bool(false));
        assert_eq!(run("Proc.new { |x| x }.lambda?"), Value::Bool(false));
    }

    #[test]
    fn test_arity() {
        assert_eq!(run("lambda { |a, b| a }.arity"), Value::Long(2));
        assert_eq!(run("lambda { |a, *rest| a }.arity"), Value::Long(-2));
    }

    #[test]
    fn test_curry() {
        assert_eq!(
            run("add = lambda { |a, b, c| a + b + c }\nadd.curry[1][2][3]"),
            Value::Long(6)
        );
    }

    #[test]
    fn test_lambda_rejects_wrong_arity() {
        let err = Machine::new()
            .execute_text("lambda { |a, b| a }.call(1)")
            .unwrap_err();
        assert_eq!(err.class_name(), "ArgumentError");
    }
}
