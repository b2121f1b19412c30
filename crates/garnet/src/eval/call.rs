//! Method calls, blocks, indexing and `yield`
//!
//! Argument and block handling lives here once for every kind of receiver;
//! the machine then resolves the target as an interpreted method, a
//! builtin, a host member or `method_missing`.

use std::rc::Rc;

use super::control::{BreakTarget, ControlFlow};
use super::literal::eval_list;
use super::Evaluate;
use crate::ast::{BlockArg, BlockBody, CallExpr, Expr};
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::value::{Args, Proc};
use crate::{EvalError, Value};

impl Evaluate for CallExpr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        if self.receiver.is_none() && self.name == "block_given?" && self.args.is_empty() {
            return Ok(Value::Bool(scope.block_arg().is_some()));
        }

        let receiver = match &self.receiver {
            Some(expr) => expr.eval(scope, rt)?,
            None => scope.self_value().clone(),
        };
        let positional = eval_list(&self.args, scope, rt)?;
        let (block, literal) = eval_block_arg(self.block.as_ref(), scope, rt)?;
        let args = Args { positional, block };

        let result = match self.receiver {
            Some(_) => rt.call_method(&receiver, &self.name, args),
            None => rt.call_function(&receiver, &self.name, args),
        };
        catch_block_break(result, literal)
    }
}

/// Build the block passed with a call. Returns the proc and, for a literal
/// block, its id so the call site can catch `break` from it.
pub fn eval_block_arg(
    block: Option<&BlockArg>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<(Option<Rc<Proc>>, Option<u64>), EvalError> {
    match block {
        None => Ok((None, None)),
        Some(BlockArg::Literal(body)) => {
            let proc = Rc::new(Proc::from_block(body.clone(), scope.clone(), false));
            let id = proc.id;
            Ok((Some(proc), Some(id)))
        }
        Some(BlockArg::Pass(expr)) => {
            let value = expr.eval(scope, rt)?;
            Ok((to_block(rt, value)?, None))
        }
    }
}

/// `&value`: procs pass through, symbols become `Symbol#to_proc`, `nil`
/// passes no block, anything else is asked for `to_proc`.
pub fn to_block(rt: &Machine, value: Value) -> Result<Option<Rc<Proc>>, EvalError> {
    match value {
        Value::Proc(proc) => Ok(Some(proc)),
        Value::Nil => Ok(None),
        Value::Symbol(name) => Ok(Some(Rc::new(Proc::symbol(name)))),
        other => match rt.call_method(&other, "to_proc", Args::default())? {
            Value::Proc(proc) => Ok(Some(proc)),
            _ => Err(EvalError::type_error(format!(
                "wrong argument type {} (expected Proc)",
                other.type_name()
            ))),
        },
    }
}

/// A `break` out of a literal block ends the call that received it.
pub fn catch_block_break(
    result: Result<Value, EvalError>,
    literal: Option<u64>,
) -> Result<Value, EvalError> {
    match (result, literal) {
        (
            Err(EvalError::ControlFlow(ControlFlow::Break {
                value,
                target: BreakTarget::Block(id),
            })),
            Some(expected),
        ) if id == expected => Ok(value),
        (result, _) => result,
    }
}

/// `lambda { }` / `proc { }` literals.
pub fn make_proc(block: &Rc<BlockBody>, scope: &Rc<Scope>, is_lambda: bool) -> Value {
    Value::Proc(Rc::new(Proc::from_block(block.clone(), scope.clone(), is_lambda)))
}

/// `receiver[args]`
pub fn eval_index(
    receiver: &Expr,
    args: &[Expr],
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let receiver = receiver.eval(scope, rt)?;
    let args = eval_list(args, scope, rt)?;
    rt.call_method(&receiver, "[]", Args::new(args))
}

/// `yield args` invokes the block bound to the enclosing method.
pub fn eval_yield(args: &[Expr], scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    let block = scope
        .block_arg()
        .ok_or_else(|| EvalError::name("no block given (yield)"))?;
    let args = eval_list(args, scope, rt)?;
    rt.call_proc(&block, Args::new(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_caught_only_by_its_call_site() {
        let signal = |id| {
            Err(EvalError::ControlFlow(ControlFlow::Break {
                value: Value::Long(1),
                target: BreakTarget::Block(id),
            }))
        };
        assert_eq!(catch_block_break(signal(5), Some(5)).unwrap(), Value::Long(1));
        assert!(catch_block_break(signal(5), Some(6)).is_err());
        assert!(catch_block_break(signal(5), None).is_err());
    }

    #[test]
    fn test_symbol_to_block() {
        let rt = Machine::new();
        let block = to_block(&rt, Value::symbol("upcase")).unwrap().unwrap();
        let result = rt
            .call_proc(&block, Args::new(vec![Value::string("abc")]))
            .unwrap();
        assert_eq!(result, Value::string("ABC"));
    }

    #[test]
    fn test_nil_passes_no_block() {
        let rt = Machine::new();
        assert!(to_block(&rt, Value::Nil).unwrap().is_none());
    }
}
