//! The host-facing runtime: one `Machine` per embedding
//!
//! A machine owns everything a script can reach: the root scope, the core
//! class table, globals, captured output, the native type registry and the
//! active capability policy. It is single-threaded; hosts that share one
//! across threads must serialize access themselves.

mod builtins;
mod core;
mod dispatch;

pub use self::core::CoreClasses;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context as _;

use crate::ast::Expr;
use crate::config::{MachineConfig, OutputMode};
use crate::environment::Scope;
use crate::error::EvalError;
use crate::eval::eval_sequence;
use crate::native::{policy_for, NativeError, NativeRegistry, NativeType, TypeAccessPolicy};
use crate::parser::parse;
use crate::value::{inspect, Args, BuiltinFn, Class, Cref, Method, Object, Value};

/// An interpreter instance.
///
/// # Example
///
/// ```
/// use garnet::{Machine, Value};
///
/// let machine = Machine::new();
/// let result = machine.execute_text("[1, 2, 3].map { |x| x * 2 }.sum").unwrap();
/// assert_eq!(result, Value::Long(12));
/// ```
pub struct Machine {
    config: MachineConfig,
    core: CoreClasses,
    root: Rc<Scope>,
    main: Value,
    globals: RefCell<HashMap<String, Value>>,
    output: RefCell<String>,
    call_depth: Cell<usize>,
    natives: NativeRegistry,
    policy: RefCell<Arc<dyn TypeAccessPolicy>>,
    loaded: RefCell<HashSet<String>>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("config", &self.config)
            .field("call_depth", &self.call_depth.get())
            .finish()
    }
}

impl Machine {
    /// A machine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// A machine with an explicit configuration.
    pub fn with_config(config: MachineConfig) -> Self {
        let core = CoreClasses::bootstrap();
        builtins::install(&core);

        let main = Value::Object(Rc::new(Object::new(core.object.clone())));
        let root = Scope::top_level(main.clone(), Cref::root(core.object.clone()));
        let policy = policy_for(&config);

        Self {
            config,
            core,
            root,
            main,
            globals: RefCell::new(HashMap::new()),
            output: RefCell::new(String::new()),
            call_depth: Cell::new(0),
            natives: NativeRegistry::default(),
            policy: RefCell::new(policy),
            loaded: RefCell::new(HashSet::new()),
        }
    }

    /// The configuration this machine was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub(crate) fn core(&self) -> &CoreClasses {
        &self.core
    }

    // ═══════════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════════

    /// Parse and run source text at top level; the result is the value of
    /// the last top-level expression.
    ///
    /// # Errors
    ///
    /// Parse errors surface as [`EvalError::Syntax`]; uncaught script
    /// errors surface unchanged.
    pub fn execute_text(&self, text: &str) -> Result<Value, EvalError> {
        let span = tracing::debug_span!("execute_text", bytes = text.len());
        let _enter = span.enter();

        let program = parse(text)?;
        self.execute(&program)
    }

    /// Run already-parsed top-level commands against the root scope.
    pub fn execute(&self, program: &[Expr]) -> Result<Value, EvalError> {
        self.run_top_level(program, &self.root)
    }

    fn run_top_level(&self, program: &[Expr], scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match eval_sequence(program, scope, self) {
            Err(EvalError::ControlFlow(signal)) => Err(EvalError::invalid(format!(
                "unexpected {}",
                signal.keyword()
            ))),
            other => other,
        }
    }

    /// The scope top-level code runs in.
    pub fn root_scope(&self) -> Rc<Scope> {
        self.root.clone()
    }

    /// Define a top-level local visible to later `execute_text` calls.
    pub fn define_variable(&self, name: impl Into<String>, value: Value) {
        self.root.define(name, value);
    }

    /// The top-level `self`.
    pub fn main_object(&self) -> &Value {
        &self.main
    }

    /// `Object`.
    pub fn object_class(&self) -> Rc<Class> {
        self.core.object.clone()
    }

    /// A top-level constant, such as a class defined by a script.
    pub fn lookup_constant(&self, name: &str) -> Option<Value> {
        self.core.object.own_constant(name)
    }

    /// Expose a Rust function to scripts as a global function.
    pub fn define_global_function(
        &self,
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&Machine, &Value, Args) -> Result<Value, EvalError> + 'static,
    ) {
        self.core.object.define_builtin(BuiltinFn::new(name, arity, func));
    }

    // ═══════════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════════

    /// Write script output to stdout or the capture buffer.
    pub fn write_output(&self, text: &str) {
        match self.config.output {
            OutputMode::Capture => self.output.borrow_mut().push_str(text),
            OutputMode::Stdout => {
                let mut stdout = std::io::stdout().lock();
                if let Err(err) = stdout.write_all(text.as_bytes()) {
                    tracing::warn!(error = %err, "failed to write script output");
                }
            }
        }
    }

    /// Drain captured output.
    pub fn take_output(&self) -> String {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Globals
    // ═══════════════════════════════════════════════════════════════════

    /// `$name`, or `nil` when unset.
    pub fn get_global(&self, name: &str) -> Value {
        self.globals
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Assign `$name`.
    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.borrow_mut().insert(name.to_string(), value);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Native bridge
    // ═══════════════════════════════════════════════════════════════════

    /// Make a host type reachable by its qualified name.
    pub fn register_native_type(&self, ty: NativeType) -> Rc<NativeType> {
        let ty = Rc::new(ty);
        self.natives.register(ty.clone());
        ty
    }

    /// Register host types that become reachable after `require name`.
    pub fn register_package(&self, name: impl Into<String>, types: Vec<NativeType>) {
        self.natives
            .register_package(name, types.into_iter().map(Rc::new).collect());
    }

    /// Replace the capability policy.
    pub fn set_policy(&self, policy: Arc<dyn TypeAccessPolicy>) {
        *self.policy.borrow_mut() = policy;
    }

    /// The active capability policy.
    pub fn policy(&self) -> Arc<dyn TypeAccessPolicy> {
        self.policy.borrow().clone()
    }

    /// Registered host types.
    pub fn native_registry(&self) -> &NativeRegistry {
        &self.natives
    }

    // ═══════════════════════════════════════════════════════════════════
    // require
    // ═══════════════════════════════════════════════════════════════════

    /// Activate a native package or load `<name>.rb` from the require
    /// paths. Returns `false` when `name` was already required.
    pub fn require(&self, name: &str) -> Result<bool, EvalError> {
        if self.loaded.borrow().contains(name) {
            return Ok(false);
        }
        if self.natives.activate(name) {
            self.loaded.borrow_mut().insert(name.to_string());
            return Ok(true);
        }

        let file = if name.ends_with(".rb") {
            name.to_string()
        } else {
            format!("{}.rb", name)
        };
        let Some(path) = self
            .config
            .require_paths
            .iter()
            .map(|dir| dir.join(&file))
            .find(|path| path.is_file())
        else {
            return Err(EvalError::runtime(format!(
                "cannot load such file -- {}",
                name
            )));
        };

        tracing::debug!(path = %path.display(), "loading script");
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(|err| EvalError::from(NativeError::from(err)))?;
        let program = parse(&text)?;

        self.loaded.borrow_mut().insert(name.to_string());
        let scope = Scope::top_level(self.main.clone(), Cref::root(self.core.object.clone()));
        self.run_top_level(&program, &scope)?;
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Classes and exceptions
    // ═══════════════════════════════════════════════════════════════════

    /// The class of a value. Host values report `Object`.
    pub fn class_of(&self, value: &Value) -> Rc<Class> {
        let core = &self.core;
        match value {
            Value::Nil => core.nil_class.clone(),
            Value::Bool(true) => core.true_class.clone(),
            Value::Bool(false) => core.false_class.clone(),
            Value::Int(_) | Value::Long(_) => core.integer.clone(),
            Value::Float(_) => core.float.clone(),
            Value::Str(_) => core.string.clone(),
            Value::Symbol(_) => core.symbol.clone(),
            Value::Array(_) => core.array.clone(),
            Value::Hash(_) => core.hash.clone(),
            Value::Range(_) => core.range.clone(),
            Value::Regex(_) => core.regexp.clone(),
            Value::Proc(_) => core.proc.clone(),
            Value::Object(obj) => obj.class(),
            Value::Class(class) if class.is_module() => core.module.clone(),
            Value::Class(_) => core.class.clone(),
            Value::Native(_) | Value::NativeType(_) | Value::NativeNamespace(_) => {
                core.object.clone()
            }
        }
    }

    /// `value.is_a?(class)`: the class chain, mixins and any modules the
    /// value was extended with.
    pub fn is_a(&self, value: &Value, class: &Rc<Class>) -> bool {
        let singleton = match value {
            Value::Object(obj) => obj.existing_singleton(),
            Value::Class(c) => c.existing_singleton(),
            _ => None,
        };
        if singleton.is_some_and(|s| s.inherits_from(class)) {
            return true;
        }
        self.class_of(value).inherits_from(class)
    }

    /// The exception object for an error: raised objects as they are,
    /// everything else as a fresh instance of its kind's class.
    pub fn exception_value(&self, err: &EvalError) -> Result<Value, EvalError> {
        if let EvalError::Raised(value) = err {
            return Ok(value.clone());
        }
        let class = self.core.error_class(err.kind());
        let exception = Object::new(class);
        exception.set_ivar("@message", Value::string(err.message()))?;
        Ok(Value::Object(Rc::new(exception)))
    }

    /// Instantiate an exception class with a message.
    pub fn make_exception(&self, class: &Rc<Class>, message: &str) -> Result<Value, EvalError> {
        self.call_method(
            &Value::Class(class.clone()),
            "new",
            Args::new(vec![Value::string(message)]),
        )
    }

    // ═══════════════════════════════════════════════════════════════════
    // Conversions
    // ═══════════════════════════════════════════════════════════════════

    /// `to_s`, honoring user-defined `to_s` on script objects.
    pub fn display(&self, value: &Value) -> Result<String, EvalError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Object(_) | Value::Native(_) => {
                if !self.respond_to(value, "to_s") {
                    return Ok(value.to_string());
                }
                match self.call_method(value, "to_s", Args::default())? {
                    Value::Str(s) => Ok(s.to_string()),
                    other => Ok(other.to_string()),
                }
            }
            Value::Array(_) | Value::Hash(_) => self.inspect_value(value),
            other => Ok(other.to_string()),
        }
    }

    /// `inspect`, honoring user-defined `inspect` on script objects,
    /// including objects nested in arrays and hashes.
    pub fn inspect_value(&self, value: &Value) -> Result<String, EvalError> {
        let mut out = String::new();
        let mut visiting = Vec::new();
        self.write_inspect(value, &mut out, &mut visiting)?;
        Ok(out)
    }

    fn write_inspect(
        &self,
        value: &Value,
        out: &mut String,
        visiting: &mut Vec<usize>,
    ) -> Result<(), EvalError> {
        match value {
            Value::Object(_) | Value::Native(_) if self.respond_to(value, "inspect") => {
                let shown = self.call_method(value, "inspect", Args::default())?;
                out.push_str(&self.display(&shown)?);
            }
            Value::Array(items) => {
                let id = Rc::as_ptr(items) as usize;
                if visiting.contains(&id) {
                    out.push_str("[...]");
                    return Ok(());
                }
                visiting.push(id);
                out.push('[');
                for (i, item) in items.to_vec().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_inspect(item, out, visiting)?;
                }
                out.push(']');
                visiting.pop();
            }
            Value::Hash(hash) => {
                let id = Rc::as_ptr(hash) as usize;
                if visiting.contains(&id) {
                    out.push_str("{...}");
                    return Ok(());
                }
                visiting.push(id);
                out.push('{');
                for (i, (key, item)) in hash.entries().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if let Value::Symbol(name) = key {
                        out.push_str(name);
                        out.push_str(": ");
                    } else {
                        self.write_inspect(key, out, visiting)?;
                        out.push_str(" => ");
                    }
                    self.write_inspect(item, out, visiting)?;
                }
                out.push('}');
                visiting.pop();
            }
            other => out.push_str(&inspect(other)),
        }
        Ok(())
    }

    /// The default `inspect` of a script object: class name and instance
    /// variables.
    pub(crate) fn default_inspect(&self, obj: &Object) -> Result<String, EvalError> {
        let ivars = obj.ivars();
        if ivars.is_empty() {
            return Ok(format!("#<{}>", obj.class().name()));
        }
        let mut parts = Vec::with_capacity(ivars.len());
        for (name, value) in ivars {
            parts.push(format!("{}={}", name, self.inspect_value(&value)?));
        }
        Ok(format!("#<{} {}>", obj.class().name(), parts.join(", ")))
    }

    /// How a receiver is named in "undefined method" messages.
    pub fn describe_receiver(&self, value: &Value) -> String {
        if value.same(&self.main) {
            return "main".to_string();
        }
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Class(class) if class.is_module() => format!("module {}", class.name()),
            Value::Class(class) => format!("class {}", class.name()),
            Value::NativeType(ty) => format!("class {}", ty.name()),
            Value::Native(obj) => format!("an instance of {}", obj.native_type().name()),
            other => format!("an instance of {}", self.class_of(other).name()),
        }
    }

    /// `a == b`: user-defined `==` on script objects, structural equality
    /// otherwise.
    pub fn values_equal(&self, a: &Value, b: &Value) -> Result<bool, EvalError> {
        match a {
            Value::Object(_) => match self.find_method(a, "==") {
                Some(Method::Builtin(_)) | None => Ok(a.same(b)),
                Some(_) => Ok(self
                    .call_method(a, "==", Args::new(vec![b.clone()]))?
                    .truthy()),
            },
            _ => Ok(a == b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn captured() -> Machine {
        Machine::with_config(MachineConfig::new().with_captured_output())
    }

    #[test]
    fn test_execute_returns_last_value() {
        let rt = Machine::new();
        assert_eq!(rt.execute_text("1\n2\n3").unwrap(), Value::Long(3));
    }

    #[test]
    fn test_locals_persist_between_executions() {
        let rt = Machine::new();
        rt.execute_text("x = 40").unwrap();
        assert_eq!(rt.execute_text("x + 2").unwrap(), Value::Long(42));
    }

    #[test]
    fn test_define_variable() {
        let rt = Machine::new();
        rt.define_variable("limit", Value::Long(10));
        assert_eq!(rt.execute_text("limit * 2").unwrap(), Value::Long(20));
    }

    #[test]
    fn test_captured_output() {
        let rt = captured();
        rt.execute_text("puts 'hello'\nprint 1, 2").unwrap();
        assert_eq!(rt.take_output(), "hello\n12");
        assert_eq!(rt.take_output(), "");
    }

    #[test]
    fn test_global_function() {
        let rt = Machine::new();
        rt.define_global_function("triple", 1, |_, _, args| {
            Ok(Value::Long(args.get(0).as_i64().unwrap_or(0) * 3))
        });
        assert_eq!(rt.execute_text("triple(5)").unwrap(), Value::Long(15));
    }

    #[test]
    fn test_describe_receiver() {
        let rt = Machine::new();
        assert_eq!(rt.describe_receiver(rt.main_object()), "main");
        assert_eq!(rt.describe_receiver(&Value::Nil), "nil");
        assert_eq!(rt.describe_receiver(&Value::Long(1)), "an instance of Integer");
        let object = rt.object_class();
        assert_eq!(rt.describe_receiver(&Value::Class(object)), "class Object");
    }

    #[test]
    fn test_exception_value_for_kind_error() {
        let rt = Machine::new();
        let err = EvalError::argument("bad");
        let exception = rt.exception_value(&err).unwrap();
        let class = rt.core().error_class(ErrorKind::Argument);
        assert!(rt.is_a(&exception, &class));
        assert!(rt.is_a(&exception, &rt.core().standard_error));
    }

    #[test]
    fn test_stray_signal_at_top_level() {
        let rt = Machine::new();
        let err = rt.execute_text("return 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_require_missing_file() {
        let rt = Machine::new();
        let err = rt.require("no_such_library").unwrap_err();
        assert!(err.to_string().contains("cannot load such file"));
    }
}
