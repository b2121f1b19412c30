//! Host types exposed to scripts

use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context as _;
use garnet::*;
use pretty_assertions::assert_eq;

struct Builder {
    parts: Vec<String>,
}

fn builder_type() -> NativeType {
    NativeType::builder("Host::Text::Builder")
        .constructor(|call| {
            call.check_args(0, 0)?;
            call.wrap_self(Builder { parts: Vec::new() })
        })
        .method("append", |call| {
            let text = call.arg_str(0)?;
            call.this_mut::<Builder>()?.parts.push(text);
            Ok(call.this().clone())
        })
        .method("each_part", |call| {
            let parts = call.this_ref::<Builder>()?.parts.clone();
            for part in parts {
                call.call_block(vec![Value::string(part)])?;
            }
            Ok(Value::Nil)
        })
        .property("length", |call| {
            Ok(Value::Long(call.this_ref::<Builder>()?.parts.len() as i64))
        })
        .static_method("join", |call| {
            let sep = call.arg_str(0)?;
            let words: Vec<String> = call.args()[1..].iter().map(|v| v.to_string()).collect();
            Ok(Value::string(words.join(&sep)))
        })
        .build()
}

fn level_type() -> NativeType {
    NativeType::builder("Host::Level")
        .enum_value("Low", 0)
        .enum_value("High", 1)
        .build()
}

fn parse_type() -> NativeType {
    NativeType::builder("Host::Parse")
        .static_method("int", |call| {
            let text = call.arg_str(0)?;
            let n: i64 = text
                .trim()
                .parse()
                .with_context(|| format!("invalid number {:?}", text))?;
            Ok(Value::Long(n))
        })
        .build()
}

fn machine() -> Machine {
    let rt = Machine::new();
    rt.register_native_type(builder_type());
    rt.register_native_type(level_type());
    rt.register_native_type(parse_type());
    rt
}

fn eval_ok(rt: &Machine, src: &str) -> Value {
    match rt.execute_text(src) {
        Ok(value) => value,
        Err(err) => panic!("{} failed: {} ({})", src, err, err.class_name()),
    }
}

#[test]
fn test_constructor_and_instance_methods() {
    let rt = machine();
    let src = "b = Host::Text::Builder.new\nb.append('a').append('b')\nb.length";
    assert_eq!(eval_ok(&rt, src), Value::Long(2));
}

#[test]
fn test_block_passed_to_host_method() {
    let rt = machine();
    let src = "b = Host::Text::Builder.new\nb.append('x')\nb.append('y')\nout = []\nb.each_part { |p| out.push(p.upcase) }\nout";
    assert_eq!(
        eval_ok(&rt, src),
        Value::array(vec![Value::string("X"), Value::string("Y")])
    );
}

#[test]
fn test_break_from_block_through_host_method() {
    let rt = machine();
    let src = "b = Host::Text::Builder.new\nb.append('x')\nb.append('y')\nb.each_part { |p| break p }";
    assert_eq!(eval_ok(&rt, src), Value::string("x"));
}

#[test]
fn test_static_method() {
    let rt = machine();
    assert_eq!(
        eval_ok(&rt, "Host::Text::Builder.join('-', 'a', 'b')"),
        Value::string("a-b")
    );
}

#[test]
fn test_enum_constants() {
    let rt = machine();
    assert_eq!(eval_ok(&rt, "Host::Level::High == Host::Level::High"), Value::Bool(true));
    assert_eq!(eval_ok(&rt, "Host::Level::High == Host::Level::Low"), Value::Bool(false));
}

#[test]
fn test_missing_member_falls_back_to_core_methods() {
    let rt = machine();
    assert_eq!(eval_ok(&rt, "Host::Text::Builder.new.nil?"), Value::Bool(false));
    let err = rt
        .execute_text("Host::Text::Builder.new.frobnicate")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMethod);
    assert_eq!(
        err.to_string(),
        "undefined method 'frobnicate' for an instance of Host::Text::Builder"
    );
}

#[test]
fn test_host_failure_surfaces_as_runtime_error() {
    let rt = machine();
    let err = rt.execute_text("Host::Parse.int('abc')").unwrap_err();
    assert_eq!(err.class_name(), "RuntimeError");
    assert!(err.to_string().starts_with("invalid number \"abc\""));

    let src = "begin\n  Host::Parse.int('x')\nrescue RuntimeError => e\n  :rescued\nend";
    assert_eq!(eval_ok(&rt, src), Value::symbol("rescued"));
}

#[test]
fn test_host_argument_errors() {
    let rt = machine();
    let err = rt.execute_text("Host::Text::Builder.new(1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_deny_all_policy() {
    let rt = machine();
    rt.set_policy(Arc::new(DenyAll));
    let err = rt.execute_text("Host::Text::Builder.new").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeAccess);
}

#[test]
fn test_allow_list_policy() {
    let config = MachineConfig::new()
        .with_access_mode(AccessMode::AllowList)
        .allow_type("Host::Text");
    let rt = Machine::with_config(config);
    rt.register_native_type(builder_type());
    rt.register_native_type(parse_type());

    assert_eq!(
        eval_ok(&rt, "Host::Text::Builder.new.length"),
        Value::Long(0)
    );
    let err = rt.execute_text("Host::Parse.int('1')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeAccess);
}

#[test]
fn test_package_activated_by_require() {
    let rt = Machine::new();
    rt.register_package("text", vec![builder_type()]);
    assert!(rt.execute_text("Host::Text::Builder").is_err());
    assert_eq!(eval_ok(&rt, "require 'text'"), Value::Bool(true));
    assert_eq!(eval_ok(&rt, "require 'text'"), Value::Bool(false));
    assert_eq!(eval_ok(&rt, "Host::Text::Builder.new.length"), Value::Long(0));
}

#[test]
fn test_host_values_round_trip_through_scripts() {
    let rt = machine();
    let ty = Rc::new(builder_type());
    let obj = Value::Native(Rc::new(NativeObject::new(
        ty,
        Builder {
            parts: vec!["seed".into()],
        },
    )));
    rt.define_variable("b", obj);
    assert_eq!(eval_ok(&rt, "b.append('x').length"), Value::Long(2));
}

#[test]
fn test_global_host_function() {
    let rt = Machine::new();
    rt.define_global_function("double", 1, |_, _, args| {
        Ok(Value::Long(args.get(0).as_i64().unwrap_or(0) * 2))
    });
    assert_eq!(eval_ok(&rt, "[1, 2].map { |x| double(x) }"), Value::array(vec![
        Value::Long(2),
        Value::Long(4),
    ]));
}
