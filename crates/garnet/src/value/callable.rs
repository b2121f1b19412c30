//! Callable value types: methods, procs, and builtins

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Cref, Value};
use crate::ast::{BlockBody, Expr, Params};
use crate::environment::Scope;
use crate::error::EvalError;
use crate::runtime::Machine;

/// Type alias for builtin function pointers to reduce complexity
pub type BuiltinFnPtr = Rc<dyn Fn(&Machine, &Value, Args) -> Result<Value, EvalError>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A fresh identifier for procs and method frames.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Arguments of a call after splats and keyword pairs are expanded.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Positional arguments
    pub positional: Vec<Value>,
    /// Block passed with the call
    pub block: Option<Rc<Proc>>,
}

impl Args {
    /// Positional arguments without a block.
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            block: None,
        }
    }

    /// Attach a block.
    pub fn with_block(mut self, block: Option<Rc<Proc>>) -> Self {
        self.block = block;
        self
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Whether there are no positional arguments.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Positional argument `i`, or `nil` when absent.
    pub fn get(&self, i: usize) -> Value {
        self.positional.get(i).cloned().unwrap_or(Value::Nil)
    }

    /// Fail unless `min..=max` positional arguments were given.
    pub fn check(&self, min: usize, max: usize) -> Result<(), EvalError> {
        let given = self.positional.len();
        if given < min || given > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{}..{}", min, max)
            };
            return Err(EvalError::arity(given, expected));
        }
        Ok(())
    }

    /// The block, or a "no block given" error.
    pub fn require_block(&self) -> Result<Rc<Proc>, EvalError> {
        self.block
            .clone()
            .ok_or_else(|| EvalError::name("no block given (yield)"))
    }
}

/// A built-in native function.
///
/// These are Rust functions exposed to the interpreter.
#[derive(Clone)]
pub struct BuiltinFn {
    /// Function name (for display/debugging)
    pub name: String,

    /// Arity (-1 for variadic)
    pub arity: i32,

    /// The actual function pointer
    pub func: BuiltinFnPtr,
}

impl BuiltinFn {
    /// Wrap a closure.
    pub fn new(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&Machine, &Value, Args) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }
    }

    /// Check the argument count, then call.
    pub fn call(&self, rt: &Machine, this: &Value, args: Args) -> Result<Value, EvalError> {
        if let Ok(expected) = usize::try_from(self.arity) {
            if args.len() != expected {
                return Err(EvalError::arity(args.len(), expected));
            }
        }
        (self.func)(rt, this, args)
    }
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}

/// A method written in script code.
#[derive(Debug)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Declared parameters
    pub params: Params,
    /// Body, shared with the defining AST
    pub body: Rc<Expr>,
    /// Lexical nesting at the point of definition
    pub cref: Rc<Cref>,
}

/// An entry in a method table.
#[derive(Debug, Clone)]
pub enum Method {
    /// `def`
    Interpreted(Rc<MethodDef>),
    /// Rust function
    Builtin(BuiltinFn),
    /// `define_method(:name) { ... }`
    Block(Rc<Proc>),
}

impl Method {
    /// Declared arity: non-negative when fixed, `-(required + 1)` otherwise.
    pub fn arity(&self) -> i64 {
        match self {
            Method::Interpreted(def) => params_arity(&def.params),
            Method::Builtin(f) => i64::from(f.arity),
            Method::Block(p) => p.arity(),
        }
    }
}

/// What a proc runs.
#[derive(Debug, Clone)]
pub enum ProcBody {
    /// A block literal and the scope it closes over
    Block {
        /// Parameters and body
        block: Rc<BlockBody>,
        /// Captured scope, shared with the definer
        scope: Rc<Scope>,
    },
    /// A Rust function
    Builtin(BuiltinFn),
    /// `&:name`: sends `name` to the first argument
    Symbol(Rc<str>),
}

/// A block, proc or lambda.
#[derive(Debug)]
pub struct Proc {
    /// Identity used as the target of `break`
    pub id: u64,
    /// What the proc runs
    pub body: ProcBody,
    /// Lambdas check arity strictly and catch `return`
    pub is_lambda: bool,
}

impl Proc {
    /// Close a block literal over `scope`.
    pub fn from_block(block: Rc<BlockBody>, scope: Rc<Scope>, is_lambda: bool) -> Self {
        Self {
            id: next_id(),
            body: ProcBody::Block { block, scope },
            is_lambda,
        }
    }

    /// Wrap a Rust function as a lambda.
    pub fn builtin(func: BuiltinFn) -> Self {
        Self {
            id: next_id(),
            body: ProcBody::Builtin(func),
            is_lambda: true,
        }
    }

    /// `:name.to_proc`
    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Self {
            id: next_id(),
            body: ProcBody::Symbol(name.into()),
            is_lambda: false,
        }
    }

    /// Same body, converted into a lambda or back.
    pub fn with_lambda(&self, is_lambda: bool) -> Self {
        Self {
            id: next_id(),
            body: self.body.clone(),
            is_lambda,
        }
    }

    /// Declared arity.
    pub fn arity(&self) -> i64 {
        match &self.body {
            ProcBody::Block { block, .. } => {
                let params = &block.params;
                if !self.is_lambda && params.optional.is_empty() && params.rest.is_none() {
                    params.required.len() as i64
                } else {
                    params_arity(params)
                }
            }
            ProcBody::Builtin(f) => i64::from(f.arity),
            ProcBody::Symbol(_) => -2,
        }
    }
}

fn params_arity(params: &Params) -> i64 {
    let required = params.required.len() as i64;
    if params.rest.is_some() || !params.optional.is_empty() {
        -(required + 1)
    } else {
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_check_range() {
        let args = Args::new(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
        assert!(args.check(1, 3).is_ok());
        let err = args.check(0, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "wrong number of arguments (given 3, expected 0..2)"
        );
    }

    #[test]
    fn test_missing_arg_is_nil() {
        assert_eq!(Args::new(vec![]).get(0), Value::Nil);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Proc::symbol("upcase");
        let b = Proc::symbol("upcase");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_params_arity() {
        let params = Params {
            required: vec!["a".into()],
            rest: Some("rest".into()),
            ..Params::default()
        };
        assert_eq!(params_arity(&params), -2);
        assert_eq!(params_arity(&Params::default()), 0);
    }
}
