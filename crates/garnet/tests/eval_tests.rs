//! Expression evaluation through the host entry point

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

fn longs(items: &[i64]) -> Value {
    Value::array(items.iter().map(|n| Value::Long(*n)).collect())
}

// ═══════════════════════════════════════════════════════════════════════
// Numbers
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_numeric_coercion() {
    assert_eq!(eval_ok("1 + 1"), Value::Long(2));
    assert_eq!(eval_ok("1 + 1 == 2"), Value::Bool(true));
    assert_eq!(eval_ok("1 / 2"), Value::Long(0));
    assert_eq!(eval_ok("1 + 0.5"), Value::Float(1.5));
}

#[test]
fn test_string_concatenation_either_side() {
    assert_eq!(eval_ok("\"foo\" + 1"), Value::string("foo1"));
    assert_eq!(eval_ok("1 + \"foo\""), Value::string("1foo"));
}

#[test]
fn test_precedence_and_grouping() {
    assert_eq!(eval_ok("2 + 3 * 4"), Value::Long(14));
    assert_eq!(eval_ok("(2 + 3) * 4"), Value::Long(20));
    assert_eq!(eval_ok("2 ** 3 ** 2"), Value::Long(512));
    assert_eq!(eval_ok("-7 / 2"), Value::Long(-3));
}

#[test]
fn test_spaceship() {
    assert_eq!(eval_ok("1 <=> 2"), Value::Long(-1));
    assert_eq!(eval_ok("'b' <=> 'a'"), Value::Long(1));
    assert_eq!(eval_ok("1 <=> 'a'"), Value::Nil);
}

#[test]
fn test_division_by_zero() {
    let err = eval("10 / 0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZeroDivision);
    assert_eq!(err.to_string(), "divided by 0");
}

#[test]
fn test_integer_helpers() {
    assert_eq!(eval_ok("5.times.to_a"), longs(&[0, 1, 2, 3, 4]));
    assert_eq!(eval_ok("(-4).abs"), Value::Long(4));
    assert_eq!(eval_ok("255.to_s(16)"), Value::string("ff"));
    assert_eq!(eval_ok("3.7.round"), Value::Long(4));
}

// ═══════════════════════════════════════════════════════════════════════
// Strings and symbols
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_interpolation() {
    let src = "name = 'world'\n\"hello #{name}, #{1 + 2}\"";
    assert_eq!(eval_ok(src), Value::string("hello world, 3"));
}

#[test]
fn test_single_quotes_do_not_interpolate() {
    assert_eq!(eval_ok("'#{x}'"), Value::string("#{x}"));
}

#[test]
fn test_string_methods() {
    assert_eq!(eval_ok("'Hello'.upcase"), Value::string("HELLO"));
    assert_eq!(eval_ok("'  pad  '.strip"), Value::string("pad"));
    assert_eq!(eval_ok("'abc'.reverse.length"), Value::Long(3));
    assert_eq!(
        eval_ok("'a,b,c'.split(',')"),
        Value::array(vec![Value::string("a"), Value::string("b"), Value::string("c")])
    );
    assert_eq!(eval_ok("'42abc'.to_i"), Value::Long(42));
}

#[test]
fn test_symbols() {
    assert_eq!(eval_ok(":name.to_s"), Value::string("name"));
    assert_eq!(eval_ok("'name'.to_sym"), Value::symbol("name"));
}

#[test]
fn test_regex_match() {
    assert_eq!(eval_ok("'hello world'.index('wor')"), Value::Long(6));
    assert_eq!(eval_ok("'hello'.match?(/l+/)"), Value::Bool(true));
    assert_eq!(eval_ok("'hello'.gsub(/l/, 'L')"), Value::string("heLLo"));
}

// ═══════════════════════════════════════════════════════════════════════
// Collections
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_array_pipeline() {
    let src = "[1, 2, 3, 4, 5].select { |x| x.odd? }.map { |x| x * x }.reduce(0) { |acc, x| acc + x }";
    assert_eq!(eval_ok(src), Value::Long(35));
}

#[test]
fn test_array_mutation_and_queries() {
    let src = "a = [3, 1, 2]\na.push(4)\na.sort";
    assert_eq!(eval_ok(src), longs(&[1, 2, 3, 4]));
    assert_eq!(eval_ok("[1, 2, 3].include?(2)"), Value::Bool(true));
    assert_eq!(eval_ok("[1, 2, 3].join('-')"), Value::string("1-2-3"));
    assert_eq!(eval_ok("[].empty?"), Value::Bool(true));
}

#[test]
fn test_symbol_to_proc_block() {
    assert_eq!(
        eval_ok("['a', 'b'].map(&:upcase)"),
        Value::array(vec![Value::string("A"), Value::string("B")])
    );
}

#[test]
fn test_hash_literals_and_access() {
    let src = "h = {a: 1, 'b' => 2}\nh[:a] + h['b']";
    assert_eq!(eval_ok(src), Value::Long(3));
    assert_eq!(eval_ok("h = {a: 1}\nh[:zzz]"), Value::Nil);
}

#[test]
fn test_hash_preserves_insertion_order() {
    let src = "h = {}\nh[:z] = 1\nh[:a] = 2\nh[:m] = 3\nh.keys";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::symbol("z"), Value::symbol("a"), Value::symbol("m")])
    );
}

#[test]
fn test_hash_each_pairs() {
    let src = "out = []\n{a: 1, b: 2}.each { |k, v| out.push(k.to_s + v.to_s) }\nout";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::string("a1"), Value::string("b2")])
    );
}

#[test]
fn test_ranges() {
    assert_eq!(eval_ok("(1..4).to_a"), longs(&[1, 2, 3, 4]));
    assert_eq!(eval_ok("(1...4).to_a"), longs(&[1, 2, 3]));
    assert_eq!(eval_ok("(1..10).include?(10)"), Value::Bool(true));
}

// ═══════════════════════════════════════════════════════════════════════
// Variables
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_undefined_local() {
    let err = eval("missing_thing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(
        err.to_string(),
        "undefined local variable or method 'missing_thing' for main"
    );
}

#[test]
fn test_globals_cross_method_boundaries() {
    let src = "$count = 1\ndef bump\n  $count += 1\nend\nbump\n$count";
    assert_eq!(eval_ok(src), Value::Long(2));
}

#[test]
fn test_methods_do_not_see_outer_locals() {
    let err = eval("x = 1\ndef peek\n  x\nend\npeek").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
}

#[test]
fn test_defined() {
    assert_eq!(eval_ok("x = 1\ndefined?(x)"), Value::string("local-variable"));
    assert_eq!(eval_ok("defined?(nope)"), Value::Nil);
}

#[test]
fn test_last_expression_is_result() {
    assert_eq!(eval_ok("1\n'two'\n:three"), Value::symbol("three"));
}
