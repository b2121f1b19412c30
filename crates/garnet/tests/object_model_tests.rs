//! Classes, modules, mixins and method resolution

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
fn test_class_with_initialize_and_accessors() {
    let src = r#"
class Point
  attr_accessor :x, :y

  def initialize(x, y)
    @x = x
    @y = y
  end

  def sum
    x + y
  end
end

pt = Point.new(2, 3)
pt.x = 10
pt.sum
"#;
    assert_eq!(eval_ok(src), Value::Long(13));
}

#[test]
fn test_new_checks_initialize_arity() {
    let src = "class Pair\n  def initialize(a, b)\n  end\nend\nPair.new(1)";
    let err = eval(src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(
        err.to_string(),
        "wrong number of arguments (given 1, expected 2)"
    );
}

#[test]
fn test_inheritance_and_override() {
    let src = r#"
class Animal
  def speak
    'generic'
  end

  def describe
    "I say #{speak}"
  end
end

class Dog < Animal
  def speak
    'woof'
  end
end

[Animal.new.describe, Dog.new.describe, Dog.superclass]
"#;
    let value = eval_ok(src);
    let items = value.as_array().unwrap().to_vec();
    assert_eq!(items[0], Value::string("I say generic"));
    assert_eq!(items[1], Value::string("I say woof"));
    assert_eq!(items[2].as_class().map(|c| c.name().to_string()), Some("Animal".into()));
}

#[test]
fn test_mixin_searched_before_superclass() {
    let src = r#"
module Loud
  def speak
    'LOUD'
  end
end

class Base
  def speak
    'base'
  end
end

class Child < Base
  include Loud
end

Child.new.speak
"#;
    assert_eq!(eval_ok(src), Value::string("LOUD"));
}

#[test]
fn test_class_methods_and_singleton_body() {
    let src = r#"
class Registry
  def self.create
    'created'
  end

  class << self
    def label
      'registry'
    end
  end
end

Registry.create + ' ' + Registry.label
"#;
    assert_eq!(eval_ok(src), Value::string("created registry"));
}

#[test]
fn test_singleton_method_on_object() {
    let src = "s = Object.new\ndef s.hello\n  'hi'\nend\n[s.hello, Object.new.respond_to?(:hello)]";
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::string("hi"), Value::Bool(false)])
    );
}

#[test]
fn test_reopening_a_class() {
    let src = "class Box\n  def a\n    1\n  end\nend\nclass Box\n  def b\n    2\n  end\nend\nbx = Box.new\nbx.a + bx.b";
    assert_eq!(eval_ok(src), Value::Long(3));
}

#[test]
fn test_forward_reference_in_class_body() {
    let src = "class Early\n  VALUE = helper\n  def self.helper\n    42\n  end\nend\nEarly::VALUE";
    assert_eq!(eval_ok(src), Value::Long(42));
}

#[test]
fn test_constants_resolve_lexically() {
    let src = r#"
LIMIT = 1

module Outer
  LIMIT = 2

  class Inner
    def limit
      LIMIT
    end
  end
end

[Outer::Inner.new.limit, LIMIT]
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Long(2), Value::Long(1)])
    );
}

#[test]
fn test_uninitialized_constant() {
    let err = eval("Nowhere").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(err.to_string(), "unitialized constant Nowhere");
}

#[test]
fn test_no_method_error() {
    let err = eval("class Quiet\nend\nQuiet.new.shout").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMethod);
    assert_eq!(
        err.to_string(),
        "undefined method 'shout' for an instance of Quiet"
    );
}

#[test]
fn test_method_missing() {
    let src = r##"
class Ghost
  def method_missing(name, *args)
    "#{name}:#{args.length}"
  end
end

Ghost.new.anything(1, 2)
"##;
    assert_eq!(eval_ok(src), Value::string("anything:2"));
}

#[test]
fn test_operator_methods() {
    let src = r#"
class Vec2
  attr_reader :x, :y

  def initialize(x, y)
    @x = x
    @y = y
  end

  def +(other)
    Vec2.new(x + other.x, y + other.y)
  end

  def ==(other)
    x == other.x && y == other.y
  end
end

(Vec2.new(1, 2) + Vec2.new(3, 4)) == Vec2.new(4, 6)
"#;
    assert_eq!(eval_ok(src), Value::Bool(true));
}

#[test]
fn test_comparable_via_spaceship() {
    let src = r#"
class Version
  include Comparable
  attr_reader :n

  def initialize(n)
    @n = n
  end

  def <=>(other)
    n <=> other.n
  end
end

[Version.new(1) < Version.new(2), [Version.new(3), Version.new(1)].sort.first.n]
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![Value::Bool(true), Value::Long(1)])
    );
}

#[test]
fn test_reflection() {
    let src = r#"
module Named
end

class Thing
  include Named
end

t = Thing.new
[t.is_a?(Named), t.instance_of?(Thing), t.class.name, t.respond_to?(:to_s)]
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::string("Thing"),
            Value::Bool(true),
        ])
    );
}

#[test]
fn test_extend_adds_singleton_methods() {
    let src = "module Greets\n  def greet\n    'hello'\n  end\nend\no = Object.new\no.extend(Greets)\no.greet";
    assert_eq!(eval_ok(src), Value::string("hello"));
}

#[test]
fn test_define_method_and_send() {
    let src = r#"
class Dyn
  [:one, :two].each_with_index do |name, i|
    define_method(name) { i + 1 }
  end
end

d = Dyn.new
d.one + d.send(:two)
"#;
    assert_eq!(eval_ok(src), Value::Long(3));
}

#[test]
fn test_instance_variables_default_to_nil() {
    let src = "class Lazy\n  def value\n    @value\n  end\nend\nLazy.new.value";
    assert_eq!(eval_ok(src), Value::Nil);
}

#[test]
fn test_class_name_must_be_constant() {
    let err = eval("class lower\nend").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.to_string(), "class/module name must be a CONSTANT");
}

#[test]
fn test_module_cannot_be_instantiated() {
    let err = eval("module Helpers\nend\nHelpers.new").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMethod);
}

#[test]
fn test_deep_recursion_raises_stack_error() {
    let rt = Machine::with_config(MachineConfig::new().with_max_call_depth(50));
    let err = rt
        .execute_text("def down(n)\n  down(n + 1)\nend\ndown(0)")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StackOverflow);
}

#[test]
fn test_name_taking_reflection_builtins() {
    let src = r#"
class Greeter
  def hello
    'hi'
  end
  alias_method :greet, :hello
end

g = Greeter.new
g.instance_variable_set('@mood', :calm)
Greeter.const_set(:LIMIT, 3)
[
  g.greet,
  Greeter.method_defined?(:greet),
  Greeter.const_defined?(:LIMIT),
  g.instance_variable_defined?('@mood'),
  'banana'.count('a')
]
"#;
    assert_eq!(
        eval_ok(src),
        Value::array(vec![
            Value::string("hi"),
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true),
            Value::Long(3),
        ])
    );
}
