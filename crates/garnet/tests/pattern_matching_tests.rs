//! `case/when` and `case/in`

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

// ═══════════════════════════════════════════════════════════════════════
// case / when
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_when_range() {
    let src = "case 5\nwhen 1..10 then 'hit'\nelse 'miss'\nend";
    assert_eq!(eval_ok(src), Value::string("hit"));
}

#[test]
fn test_when_class() {
    let src = "case 'text'\nwhen Integer then :int\nwhen String then :str\nend";
    assert_eq!(eval_ok(src), Value::symbol("str"));
}

#[test]
fn test_when_regex_uses_string_form() {
    let src = "case 12345\nwhen /234/ then 'digits'\nelse 'none'\nend";
    assert_eq!(eval_ok(src), Value::string("digits"));
}

#[test]
fn test_when_lambda() {
    let src = "even = lambda { |n| n % 2 == 0 }\ncase 4\nwhen even then 'even'\nelse 'odd'\nend";
    assert_eq!(eval_ok(src), Value::string("even"));
}

#[test]
fn test_when_multiple_values() {
    let src = "case :b\nwhen :a, :b then 'first'\nelse 'other'\nend";
    assert_eq!(eval_ok(src), Value::string("first"));
}

#[test]
fn test_when_user_defined_case_equality() {
    let src = r#"
class Short
  def ===(other)
    other.length < 4
  end
end

case 'abc'
when Short.new then 'short'
else 'long'
end
"#;
    assert_eq!(eval_ok(src), Value::string("short"));
}

#[test]
fn test_case_without_subject() {
    let src = "x = 7\ncase\nwhen x < 5 then 'low'\nwhen x < 10 then 'mid'\nend";
    assert_eq!(eval_ok(src), Value::string("mid"));
}

#[test]
fn test_case_no_match_is_nil() {
    assert_eq!(eval_ok("case 1\nwhen 2 then 'two'\nend"), Value::Nil);
}

// ═══════════════════════════════════════════════════════════════════════
// case / in
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_nested_hash_pattern_binds() {
    let src = "cfg = {db: {user: 'admin'}}\ncase cfg\nin db: {user:} then user\nelse 'none'\nend";
    assert_eq!(eval_ok(src), Value::string("admin"));
}

#[test]
fn test_failed_match_keeps_existing_binding() {
    let src = "user = 'guest'\ncfg = {db: {host: 'x'}}\nresult = case cfg\nin db: {user:} then user\nelse 'none'\nend\n[result, user]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::string("none"), Value::string("guest")])
    );
}

#[test]
fn test_partial_match_does_not_leak() {
    let src = "a = 0\ncase [1, 2]\nin [a, 3] then :no\nin [_, b] then b\nend\n[a, b]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Long(0), Value::Long(2)])
    );
}

#[test]
fn test_array_pattern_with_splat() {
    let src = "case [1, 2, 3, 4]\nin [first, *rest] then rest.sum + first\nend";
    assert_eq!(eval_ok(src), Value::Long(10));
}

#[test]
fn test_alternatives_and_guard() {
    let src = "case 2\nin 1 | 2 if false then 'guarded'\nin 1 | 2 then 'small'\nelse 'big'\nend";
    assert_eq!(eval_ok(src), Value::string("small"));
}

#[test]
fn test_literal_and_class_values() {
    let src = "case 3.5\nin Integer then 'int'\nin Float then 'float'\nend";
    assert_eq!(eval_ok(src), Value::string("float"));
}

#[test]
fn test_deconstruct_pattern_not_supported() {
    let err = eval("case 1\nin Point(x, y) then x\nend").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}
