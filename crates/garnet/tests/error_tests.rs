//! Raising, rescuing and reporting errors

use garnet::*;
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Result<Value, EvalError> {
    Machine::new().execute_text(src)
}

fn eval_ok(src: &str) -> Value {
    match eval(src) {
        Ok(value) => value,
        Err(err) => panic!("{} failed: {} ({})", src, err, err.class_name()),
    }
}

#[test]
fn test_raise_string_is_runtime_error() {
    let err = eval("raise 'boom'").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(err.message(), "boom");
}

#[test]
fn test_raise_class_with_message() {
    let err = eval("raise ArgumentError, 'bad input'").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(err.class_name(), "ArgumentError");
    assert_eq!(err.message(), "bad input");
}

#[test]
fn test_raise_non_exception_is_type_error() {
    let err = eval("raise 42").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.to_string(), "exception class/object expected");
}

#[test]
fn test_custom_exception_hierarchy() {
    let src = r#"
class AppError < StandardError
end

class ConfigError < AppError
end

begin
  raise ConfigError, 'missing key'
rescue AppError => e
  [e.class.name, e.message, e.is_a?(StandardError)]
end
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![
            Value::string("ConfigError"),
            Value::string("missing key"),
            Value::Bool(true),
        ])
    );
}

#[test]
fn test_uncaught_custom_exception_reaches_host() {
    let err = eval("class Oops < StandardError\nend\nraise Oops, 'nope'").unwrap_err();
    assert_eq!(err.class_name(), "Oops");
    assert_eq!(err.message(), "nope");
    assert_eq!(err.to_string(), "nope (Oops)");
}

#[test]
fn test_raised_kind_follows_builtin_ancestor() {
    let err = eval("class Strict < TypeError\nend\nraise Strict").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.message(), "Strict");
}

#[test]
fn test_rescue_list_and_reraise() {
    let src = r#"
def risky(kind)
  raise TypeError, 't' if kind == :type
  raise NameError, 'n' if kind == :name
  :ok
end

def guarded(kind)
  risky(kind)
rescue TypeError, NameError => e
  e.class.name
end

[guarded(:type), guarded(:name), guarded(:none)]
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![
            Value::string("TypeError"),
            Value::string("NameError"),
            Value::symbol("ok"),
        ])
    );
}

#[test]
fn test_bare_raise_reraises_current() {
    let src = "begin\n  begin\n    raise ArgumentError, 'inner'\n  rescue => e\n    raise\n  end\nrescue ArgumentError => outer\n  outer.message\nend";
    assert_eq!(eval_ok(src), Value::string("inner"));
}

#[test]
fn test_runtime_errors_become_exception_objects() {
    let src = "begin\n  nil + 1\nrescue NoMethodError => e\n  e.message\nend";
    assert_eq!(eval_ok(src), Value::string("undefined method '+' for nil"));
}

#[test]
fn test_bare_rescue_skips_non_standard_errors() {
    let src = "class Fatal < Exception\nend\nbegin\n  raise Fatal\nrescue\n  :caught\nend";
    let err = eval(src).unwrap_err();
    assert_eq!(err.class_name(), "Fatal");
    assert_eq!(err.kind(), ErrorKind::Exception);
}

#[test]
fn test_else_runs_without_error() {
    let src = "begin\n  1\nrescue\n  :rescued\nelse\n  :else_ran\nend";
    assert_eq!(eval_ok(src), Value::symbol("else_ran"));
}

#[test]
fn test_arity_messages() {
    let err = eval("def two(a, b)\nend\ntwo(1, 2, 3)").unwrap_err();
    assert_eq!(err.to_string(), "wrong number of arguments (given 3, expected 2)");

    let err = eval("def opt(a, b = 1)\nend\nopt").unwrap_err();
    assert_eq!(err.to_string(), "wrong number of arguments (given 0, expected 1..2)");
}

#[test]
fn test_type_error_on_bad_operands() {
    let err = eval("5 - nil").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.to_string(), "nil can't be coerced into Integer");
}

#[test]
fn test_error_is_std_error() {
    fn takes_error(err: &dyn std::error::Error) -> String {
        err.to_string()
    }
    let err = eval("raise 'wrapped'").unwrap_err();
    assert_eq!(takes_error(&err), "wrapped");
}

#[test]
fn test_modulo_and_power_reject_non_numeric_operands() {
    for src in ["nil ** 2", "'a' % 1", "[1] % 2", "2 ** 'x'"] {
        let err = eval(src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type, "{}", src);
    }
    let src = "begin\n  nil ** 2\nrescue TypeError\n  :ok\nend";
    assert_eq!(eval_ok(src), Value::symbol("ok"));
}

#[test]
fn test_integer_power_stays_integral() {
    assert_eq!(eval_ok("2 ** -1"), Value::Long(0));
    assert_eq!(eval_ok("1 ** -3"), Value::Long(1));
    assert_eq!(eval_ok("(2 ** -1).class.name"), Value::string("Integer"));
    let err = eval("0 ** -1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZeroDivision);
}
