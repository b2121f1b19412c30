//! `Exception` and its subclasses
//!
//! The message lives in `@message`, which is also where errors raised by
//! the runtime put theirs, so script-raised and runtime-raised exceptions
//! answer `message` the same way.

use super::{define, define_static};
use crate::runtime::{CoreClasses, Machine};
use crate::value::{Object, Value};
use crate::EvalError;

pub(super) fn install(core: &CoreClasses) {
    let e = &core.exception;

    define(e, "initialize", -1, |_, this, args| {
        args.check(0, 1)?;
        let obj = this_exception(this)?;
        obj.set_ivar("@message", args.get(0))?;
        Ok(Value::Nil)
    });
    for name in ["message", "to_s"] {
        define(e, name, 0, |rt, this, _| Ok(Value::string(message(rt, this)?)));
    }
    define(e, "full_message", 0, |rt, this, _| {
        let class = this_exception(this)?.class();
        Ok(Value::string(format!("{} ({})", message(rt, this)?, class.name())))
    });
    define(e, "inspect", 0, |rt, this, _| {
        let class = this_exception(this)?.class();
        let text = message(rt, this)?;
        if text == class.name() {
            return Ok(Value::string(class.name()));
        }
        Ok(Value::string(format!("#<{}: {}>", class.name(), text)))
    });
    define(e, "backtrace", 0, |_, _, _| Ok(Value::Nil));
    define(e, "cause", 0, |_, _, _| Ok(Value::Nil));
    define(e, "exception", -1, |rt, this, args| {
        args.check(0, 1)?;
        match args.get(0) {
            Value::Nil => Ok(this.clone()),
            text => {
                let class = this_exception(this)?.class();
                rt.make_exception(&class, &rt.display(&text)?)
            }
        }
    });

    define_static(e, "exception", -1, |rt, this, args| {
        rt.call_method(this, "new", args)
    });
}

fn this_exception(this: &Value) -> Result<&Object, EvalError> {
    match this {
        Value::Object(obj) => Ok(obj),
        other => Err(super::wrong_receiver("Exception", other)),
    }
}

/// The stored message, or the class name when none was given.
fn message(rt: &Machine, this: &Value) -> Result<String, EvalError> {
    let obj = this_exception(this)?;
    match obj.get_ivar("@message") {
        Some(Value::Nil) | None => Ok(obj.class().name().to_string()),
        Some(value) => rt.display(&value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> Value {
        Machine::new().execute_text(src).unwrap()
    }

    #[test]
    fn test_message_defaults_to_class_name() {
        assert_eq!(run("RuntimeError.new.message"), Value::string("RuntimeError"));
        assert_eq!(run("ArgumentError.new('bad').message"), Value::string("bad"));
    }

    #[test]
    fn test_inspect_and_full_message() {
        assert_eq!(
            run("ArgumentError.new('bad').inspect"),
            Value::string("#<ArgumentError: bad>")
        );
        assert_eq!(
            run("ArgumentError.new('bad').full_message"),
            Value::string("bad (ArgumentError)")
        );
    }

    #[test]
    fn test_custom_error_with_default_message() {
        let src = "class AppError < StandardError\n  def initialize(msg = 'app failed')\n    @message = msg\n  end\nend\nbegin\n  raise AppError\nrescue => e\n  e.message\nend";
        assert_eq!(run(src), Value::string("app failed"));
    }

    #[test]
    fn test_rescued_runtime_error_message() {
        let src = "begin\n  1 / 0\nrescue ZeroDivisionError => e\n  e.message\nend";
        assert_eq!(run(src), Value::string("divided by 0"));
    }
}
