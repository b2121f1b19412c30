//! Message dispatch: method lookup, invocation and block calls
//!
//! Every call, whether it targets a script method, a builtin, a method
//! defined from a block or a host member, goes through [`Machine::call_method`].
//! Argument binding and block forwarding live here once for all of them.

use std::rc::Rc;

use super::Machine;
use crate::ast::{BlockBody, Params};
use crate::environment::{CallGuard, Scope};
use crate::eval::{BreakTarget, ControlFlow, Evaluate};
use crate::native;
use crate::value::{next_id, Args, Method, MethodDef, Proc, ProcBody, Value};
use crate::EvalError;

impl Machine {
    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Resolve `name` on a receiver: singleton class, class, mixins and
    /// superclasses. Classes look at their class methods first, then at
    /// the methods every class has.
    pub fn find_method(&self, receiver: &Value, name: &str) -> Option<Method> {
        match receiver {
            Value::Object(obj) => obj.find_method(name),
            Value::Class(class) => class
                .find_class_method(name)
                .or_else(|| self.class_of(receiver).find_method(name)),
            other => self.class_of(other).find_method(name),
        }
    }

    /// Whether a call to `name` would find a method, host members
    /// included.
    pub fn respond_to(&self, receiver: &Value, name: &str) -> bool {
        let native = match receiver {
            Value::Native(obj) => obj.native_type().has_instance_member(name),
            Value::NativeType(ty) => ty.has_static_member(name),
            _ => false,
        };
        native || self.find_method(receiver, name).is_some()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════

    /// Send `name` to `receiver`.
    ///
    /// Host receivers try their adapter first. Then the method resolution
    /// order is searched, then a user `method_missing`, which receives the
    /// name as a symbol in front of the arguments.
    pub fn call_method(&self, receiver: &Value, name: &str, args: Args) -> Result<Value, EvalError> {
        if matches!(receiver, Value::Native(_) | Value::NativeType(_)) {
            if let Some(result) = native::invoke(self, receiver, name, args.clone())? {
                return Ok(result);
            }
        }

        if let Some(method) = self.find_method(receiver, name) {
            return self.invoke_method(receiver, &method, args);
        }

        if let Some(missing) = self.find_method(receiver, "method_missing") {
            let Args { positional, block } = args;
            let mut forwarded = Vec::with_capacity(positional.len() + 1);
            forwarded.push(Value::symbol(name));
            forwarded.extend(positional);
            return self.invoke_method(receiver, &missing, Args::new(forwarded).with_block(block));
        }

        Err(EvalError::no_method(format!(
            "undefined method '{}' for {}",
            name,
            self.describe_receiver(receiver)
        )))
    }

    /// A receiver-less call such as `foo(1)`, sent to the current `self`.
    pub fn call_function(&self, this: &Value, name: &str, args: Args) -> Result<Value, EvalError> {
        self.call_method(this, name, args)
    }

    /// Run a resolved method with `receiver` as `self`.
    pub fn invoke_method(&self, receiver: &Value, method: &Method, args: Args) -> Result<Value, EvalError> {
        match method {
            Method::Builtin(func) => func.call(self, receiver, args),
            Method::Interpreted(def) => self.invoke_def(receiver, def, args),
            Method::Block(proc) => self.call_proc_as(proc, args, Some(receiver.clone())),
        }
    }

    fn invoke_def(&self, receiver: &Value, def: &Rc<MethodDef>, args: Args) -> Result<Value, EvalError> {
        let _guard = CallGuard::enter(&self.call_depth, self.config.max_call_depth)?;
        let frame = next_id();
        let scope = Scope::method(receiver.clone(), def.cref.clone(), args.block.clone(), frame);
        self.bind_params(&scope, &def.params, args, true)?;

        match def.body.eval(&scope, self) {
            Err(EvalError::ControlFlow(ControlFlow::Return { value, frame: target }))
                if target == frame =>
            {
                Ok(value)
            }
            other => other,
        }
    }

    /// Call a proc with its own `self`.
    pub fn call_proc(&self, proc: &Rc<Proc>, args: Args) -> Result<Value, EvalError> {
        self.call_proc_as(proc, args, None)
    }

    /// Call a proc, optionally rebinding `self` (for methods defined from
    /// blocks).
    pub fn call_proc_as(
        &self,
        proc: &Rc<Proc>,
        args: Args,
        this: Option<Value>,
    ) -> Result<Value, EvalError> {
        match &proc.body {
            ProcBody::Builtin(func) => func.call(self, &this.unwrap_or(Value::Nil), args),
            ProcBody::Symbol(name) => {
                let Args {
                    mut positional,
                    block,
                } = args;
                if positional.is_empty() {
                    return Err(EvalError::argument("no receiver given"));
                }
                let receiver = positional.remove(0);
                self.call_method(&receiver, name, Args::new(positional).with_block(block))
            }
            ProcBody::Block { block, scope } => self.call_block(proc, block, scope, args, this),
        }
    }

    fn call_block(
        &self,
        proc: &Proc,
        block: &BlockBody,
        captured: &Rc<Scope>,
        args: Args,
        this: Option<Value>,
    ) -> Result<Value, EvalError> {
        let _guard = CallGuard::enter(&self.call_depth, self.config.max_call_depth)?;
        let frame = proc.is_lambda.then(next_id);
        let scope = Scope::block(captured, proc.id, frame, this);
        self.bind_params(&scope, &block.params, args, proc.is_lambda)?;

        loop {
            let signal = match block.body.eval(&scope, self) {
                Err(EvalError::ControlFlow(signal)) => signal,
                other => return other,
            };
            match signal {
                ControlFlow::Next { value } => return Ok(value),
                ControlFlow::Redo => continue,
                ControlFlow::Return { value, frame: target } if Some(target) == frame => {
                    return Ok(value)
                }
                ControlFlow::Break {
                    value,
                    target: BreakTarget::Block(id),
                } if proc.is_lambda && id == proc.id => return Ok(value),
                other => return Err(EvalError::ControlFlow(other)),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Parameters
    // ═══════════════════════════════════════════════════════════════════

    /// Bind arguments to parameters in a fresh scope.
    ///
    /// Strict binding (methods, lambdas) rejects a wrong argument count.
    /// Lenient binding (blocks, procs) fills missing parameters with `nil`,
    /// drops extras, and spreads a lone array argument over several
    /// parameters.
    pub(crate) fn bind_params(
        &self,
        scope: &Rc<Scope>,
        params: &Params,
        args: Args,
        strict: bool,
    ) -> Result<(), EvalError> {
        let Args {
            mut positional,
            block,
        } = args;

        if strict {
            let given = positional.len();
            let too_many = params.rest.is_none() && given > params.positional_len();
            if given < params.required.len() || too_many {
                return Err(EvalError::arity(given, params.arity_text()));
            }
        } else if positional.len() == 1 && spreads_array(params) {
            if let Value::Array(items) = &positional[0] {
                positional = items.to_vec();
            }
        }

        let mut values = positional.into_iter();
        for name in &params.required {
            scope.define(name.clone(), values.next().unwrap_or(Value::Nil));
        }
        for (name, default) in &params.optional {
            let value = match values.next() {
                Some(value) => value,
                None => default.eval(scope, self)?,
            };
            scope.define(name.clone(), value);
        }
        if let Some(rest) = &params.rest {
            scope.define(rest.clone(), Value::array(values.collect()));
        }
        if let Some(name) = &params.block {
            scope.define(name.clone(), block.map(Value::Proc).unwrap_or(Value::Nil));
        }
        Ok(())
    }
}

fn spreads_array(params: &Params) -> bool {
    let declared = params.positional_len();
    declared > 1 || (declared == 1 && params.rest.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BuiltinFn;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_dispatch_on_integer() {
        let rt = Machine::new();
        let result = rt
            .call_method(&Value::Long(-3), "abs", Args::default())
            .unwrap();
        assert_eq!(result, Value::Long(3));
    }

    #[test]
    fn test_undefined_method_message() {
        let rt = Machine::new();
        let err = rt
            .call_method(&Value::Nil, "frobnicate", Args::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "undefined method 'frobnicate' for nil");
    }

    #[test]
    fn test_symbol_proc_sends_to_first_argument() {
        let rt = Machine::new();
        let proc = Rc::new(Proc::symbol("to_s"));
        let result = rt.call_proc(&proc, Args::new(vec![Value::Long(5)])).unwrap();
        assert_eq!(result, Value::string("5"));
        assert!(rt.call_proc(&proc, Args::default()).is_err());
    }

    #[test]
    fn test_builtin_proc() {
        let rt = Machine::new();
        let proc = Rc::new(Proc::builtin(BuiltinFn::new("double", 1, |_, _, args| {
            Ok(Value::Long(args.get(0).as_i64().unwrap_or(0) * 2))
        })));
        let result = rt.call_proc(&proc, Args::new(vec![Value::Long(4)])).unwrap();
        assert_eq!(result, Value::Long(8));
    }

    #[test]
    fn test_respond_to() {
        let rt = Machine::new();
        assert!(rt.respond_to(&Value::string("x"), "upcase"));
        assert!(!rt.respond_to(&Value::string("x"), "nope"));
        assert!(rt.respond_to(&Value::Nil, "nil?"));
    }
}
