//! Value semantics: freezing, identity, equality and display

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
// Freezing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_frozen_array_push() {
    let err = eval("arr = [1]\narr.freeze\narr.push(2)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frozen);
    assert_eq!(err.class_name(), "FrozenError");
}

#[test]
fn test_frozen_hash_delete() {
    let err = eval("h = {a: 1}\nh.freeze\nh.delete(:a)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frozen);
}

#[test]
fn test_frozen_index_assignment() {
    let err = eval("arr = [1, 2]\narr.freeze\narr[0] = 5").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frozen);
}

#[test]
fn test_frozen_object_ivar() {
    let src = "class Cell\n  def set(v)\n    @v = v\n  end\nend\nc = Cell.new\nc.freeze\nc.set(1)";
    let err = eval(src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frozen);
}

#[test]
fn test_frozen_error_is_rescuable_as_runtime_error() {
    let src = "begin\n  [].freeze.push(1)\nrescue RuntimeError => e\n  e.class.name\nend";
    assert_eq!(eval_ok(src), Value::string("FrozenError"));
}

#[test]
fn test_freeze_is_shallow() {
    let src = "inner = [1]\nouter = [inner].freeze\ninner.push(2)\n[outer.frozen?, inner.frozen?, outer.first.length]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Bool(true), Value::Bool(false), Value::Long(2)])
    );
}

#[test]
fn test_deep_freeze_reaches_nested_values() {
    let src = "cfg = {list: [1, 2], nested: {k: 'v'}}\ncfg.deep_freeze\n[cfg[:list].frozen?, cfg[:nested].frozen?]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Bool(true), Value::Bool(true)])
    );
}

#[test]
fn test_deep_freeze_self_referential_array() {
    let rt = Machine::new();
    let value = rt
        .execute_text("a = [1]\na.push(a)\na.deep_freeze\na")
        .unwrap();
    assert!(value.is_frozen());
    assert_eq!(
        rt.execute_text("a.frozen?").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_dup_of_frozen_is_mutable() {
    let src = "a = [1].freeze\nb = a.dup\nb.push(2)\n[a.length, b.length, b.frozen?]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Long(1), Value::Long(2), Value::Bool(false)])
    );
}

#[test]
fn test_freeze_from_host() {
    let rt = Machine::new();
    let list = Value::array(vec![Value::Long(1)]);
    list.freeze();
    rt.define_variable("list", list);
    let err = rt.execute_text("list.push(2)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Frozen);
}

// ═══════════════════════════════════════════════════════════════════════
// Equality and identity
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_structural_equality() {
    assert_eq!(eval_ok("[1, [2, 3]] == [1, [2, 3]]"), Value::Bool(true));
    assert_eq!(eval_ok("{a: 1} == {a: 1}"), Value::Bool(true));
    assert_eq!(eval_ok("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval_ok("'a' == :a"), Value::Bool(false));
}

#[test]
fn test_object_identity() {
    let src = "a = Object.new\nb = Object.new\n[a == a, a == b, a.equal?(a)]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)])
    );
}

#[test]
fn test_hash_keys_use_value_equality() {
    let src = "h = {}\nh[[1, 2]] = 'pair'\nh[[1, 2]]";
    assert_eq!(eval_ok(src), Value::string("pair"));
}

#[test]
fn test_equal_values_have_equal_hashes() {
    assert_eq!(eval_ok("'abc'.hash == 'abc'.hash"), Value::Bool(true));
    assert_eq!(eval_ok("[1, :a].hash == [1, :a].hash"), Value::Bool(true));
}

#[test]
fn test_nil_and_class_queries() {
    assert_eq!(eval_ok("nil.nil?"), Value::Bool(true));
    assert_eq!(eval_ok("0.nil?"), Value::Bool(false));
    assert_eq!(eval_ok("1.class.name"), Value::string("Integer"));
    assert_eq!(eval_ok("nil.to_a"), Value::array(vec![]));
}

// ═══════════════════════════════════════════════════════════════════════
// Display
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_inspect_forms() {
    assert_eq!(
        eval_ok("[1, 'two', :three, nil, 2.5].inspect"),
        Value::string("[1, \"two\", :three, nil, 2.5]")
    );
    assert_eq!(
        eval_ok("{a: 1, 'b' => 2}.inspect"),
        Value::string("{a: 1, \"b\" => 2}")
    );
}

#[test]
fn test_puts_and_p_output() {
    let rt = Machine::with_config(MachineConfig::new().with_captured_output());
    rt.execute_text("puts [1, [2]]\np 'q'\nprint :s, 3.0").unwrap();
    assert_eq!(rt.take_output(), "1\n2\n\"q\"\ns3.0");
}

#[test]
fn test_user_to_s_in_interpolation() {
    let src = "class Name\n  def to_s\n    'custom'\n  end\nend\n\"<#{Name.new}>\"";
    assert_eq!(eval_ok(src), Value::string("<custom>"));
}

#[test]
fn test_self_referential_inspect() {
    assert_eq!(
        eval_ok("a = [1]\na.push(a)\na.inspect"),
        Value::string("[1, [...]]")
    );
}
