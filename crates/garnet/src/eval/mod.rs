//! Expression evaluation

pub mod assign;
pub mod begin;
pub mod binary;
pub mod call;
pub mod case;
pub mod compare;
pub mod control;
pub mod defined;
pub mod if_expr;
pub mod item;
pub mod literal;
pub mod loops;
pub mod pattern;
pub mod unary;
pub mod variable;

pub use control::{BreakTarget, ControlFlow};

use std::rc::Rc;

use crate::ast::Expr;
use crate::environment::Scope;
use crate::runtime::Machine;
use crate::{EvalError, Value};

/// Trait for evaluating AST nodes to values.
///
/// This is the core abstraction for the tree-walking interpreter. `Expr`
/// dispatches on its variant; the larger node structs implement it
/// directly.
pub trait Evaluate {
    /// Evaluate this node in `scope`.
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for Expr {
    fn eval(&self, scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
        match self {
            // Literals
            Expr::Nil => Ok(Value::Nil),
            Expr::True => Ok(Value::Bool(true)),
            Expr::False => Ok(Value::Bool(false)),
            Expr::SelfRef => Ok(scope.self_value().clone()),
            Expr::Integer(n) => Ok(Value::Long(*n)),
            Expr::Float(f) => Ok(Value::Float(f.0)),
            Expr::Str(s) => Ok(Value::string(s)),
            Expr::Symbol(s) => Ok(Value::symbol(s)),
            Expr::Interpolated(parts) => literal::eval_interpolated(parts, scope, rt),
            Expr::Regex { pattern, flags } => literal::eval_regex(pattern, flags),
            Expr::Array(items) => literal::eval_array(items, scope, rt),
            Expr::Hash(pairs) => literal::eval_hash(pairs, scope, rt),
            Expr::Range {
                start,
                end,
                exclusive,
            } => literal::eval_range(start, end, *exclusive, scope, rt),

            // Variables and constants
            Expr::Name(name) => variable::eval_name(name, scope, rt),
            Expr::Constant(name) => variable::eval_constant(name, scope, rt),
            Expr::ScopedConstant { scope: ns, name } => {
                variable::eval_scoped_constant(ns, name, scope, rt)
            }
            Expr::InstanceVar(name) => Ok(variable::get_ivar(scope.self_value(), name)),
            Expr::ClassVar(name) => variable::eval_class_var(name, scope),
            Expr::GlobalVar(name) => Ok(rt.get_global(name)),

            // Assignment
            Expr::AssignLocal { name, value } => assign::eval_assign_local(name, value, scope, rt),
            Expr::AssignConstant { path, value } => {
                assign::eval_assign_constant(path, value, scope, rt)
            }
            Expr::AssignInstanceVar { name, value } => {
                assign::eval_assign_ivar(name, value, scope, rt)
            }
            Expr::AssignClassVar { name, value } => {
                assign::eval_assign_class_var(name, value, scope, rt)
            }
            Expr::AssignGlobal { name, value } => {
                let value = value.eval(scope, rt)?;
                rt.set_global(name, value.clone());
                Ok(value)
            }
            Expr::AssignMember {
                receiver,
                name,
                value,
            } => assign::eval_assign_member(receiver, name, value, scope, rt),
            Expr::AssignIndex {
                receiver,
                args,
                value,
            } => assign::eval_assign_index(receiver, args, value, scope, rt),

            // Operators
            Expr::Binary { op, left, right } => binary::eval_binary(*op, left, right, scope, rt),
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(scope, rt)?.truthy())),
            Expr::Negate(inner) => unary::eval_negate(inner, scope, rt),
            Expr::Plus(inner) => unary::eval_plus(inner, scope, rt),
            Expr::Splat(inner) => Ok(Value::array(literal::splat_values(
                inner.eval(scope, rt)?,
            )?)),
            Expr::DoubleSplat(inner) => inner.eval(scope, rt),

            // Calls
            Expr::Call(call) => call.eval(scope, rt),
            Expr::Index { receiver, args } => call::eval_index(receiver, args, scope, rt),
            Expr::Yield(args) => call::eval_yield(args, scope, rt),
            Expr::Lambda(block) => Ok(call::make_proc(block, scope, true)),
            Expr::ProcLiteral(block) => Ok(call::make_proc(block, scope, false)),

            // Control structures
            Expr::Sequence(exprs) => eval_sequence(exprs, scope, rt),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => if_expr::eval_if(cond, then_branch, else_branch.as_deref(), true, scope, rt),
            Expr::Unless {
                cond,
                then_branch,
                else_branch,
            } => if_expr::eval_if(cond, then_branch, else_branch.as_deref(), false, scope, rt),
            Expr::While { cond, body } => loops::eval_while(cond, body, false, scope, rt),
            Expr::Until { cond, body } => loops::eval_while(cond, body, true, scope, rt),
            Expr::For {
                vars,
                iterable,
                body,
            } => loops::eval_for(vars, iterable, body, scope, rt),
            Expr::Case(case) => case.eval(scope, rt),
            Expr::CaseIn(case) => case.eval(scope, rt),
            Expr::Break(value) => control::eval_break(value.as_deref(), scope, rt),
            Expr::Next(value) => control::eval_next(value.as_deref(), scope, rt),
            Expr::Redo => control::eval_redo(scope),
            Expr::Return(value) => control::eval_return(value.as_deref(), scope, rt),
            Expr::Begin(begin) => begin.eval(scope, rt),
            Expr::Raise(args) => begin::eval_raise(args, scope, rt),
            Expr::Defined(inner) => defined::eval_defined(inner, scope, rt),
            Expr::Require(name) => {
                let name = name.eval(scope, rt)?;
                let Some(name) = name.as_str() else {
                    return Err(EvalError::type_error(format!(
                        "no implicit conversion of {} into String",
                        name.type_name()
                    )));
                };
                Ok(Value::Bool(rt.require(name)?))
            }

            // Definitions
            Expr::Def(def) => def.eval(scope, rt),
            Expr::ClassDef(class) => class.eval(scope, rt),
            Expr::ModuleDef(module) => module.eval(scope, rt),
            Expr::SingletonClass { target, body } => {
                item::eval_singleton_class(target, body, scope, rt)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience Functions
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate statements in order; the last value is the result.
pub fn eval_sequence(exprs: &[Expr], scope: &Rc<Scope>, rt: &Machine) -> Result<Value, EvalError> {
    let mut last = Value::Nil;
    for expr in exprs {
        last = expr.eval(scope, rt)?;
    }
    Ok(last)
}
