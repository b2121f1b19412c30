//! Control flow signals for break/next/redo/return

use std::rc::Rc;

use super::Evaluate;
use crate::environment::{FrameId, Scope};
use crate::runtime::Machine;
use crate::value::Value;
use crate::EvalError;

/// Where a `break` unwinds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakTarget {
    /// The innermost `while`/`until`/`for` loop
    Loop,
    /// The call site that passed the block with this proc id
    Block(u64),
}

/// Control flow signal for non-local jumps.
///
/// When `break`, `next`, `redo` or `return` is evaluated, it doesn't return
/// a normal value. Instead, it returns an `Err(EvalError::ControlFlow(...))`
/// that propagates up until caught:
///
/// - loops catch `Break { target: Loop }`, `Next` and `Redo`
/// - block invocations catch `Next` and `Redo`
/// - the call expression that attached a literal block catches
///   `Break { target: Block(id) }` for that block
/// - method and lambda invocations catch `Return` for their own frame
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// Leave a loop or a block's call site with a value.
    Break {
        /// Result of the loop or call
        value: Value,
        /// What catches the signal
        target: BreakTarget,
    },

    /// Finish the current iteration or block invocation.
    Next {
        /// Value of the block invocation (ignored by loops)
        value: Value,
    },

    /// Restart the current iteration without re-testing the condition.
    Redo,

    /// Return from a method or lambda with a value.
    Return {
        /// Value to return
        value: Value,
        /// Invocation that catches the signal
        frame: FrameId,
    },
}

impl ControlFlow {
    /// The keyword that raised the signal.
    pub fn keyword(&self) -> &'static str {
        match self {
            ControlFlow::Break { .. } => "break",
            ControlFlow::Next { .. } => "next",
            ControlFlow::Redo => "redo",
            ControlFlow::Return { .. } => "return",
        }
    }

    /// Whether a loop consumes this signal.
    pub fn is_loop_signal(&self) -> bool {
        matches!(
            self,
            ControlFlow::Break {
                target: BreakTarget::Loop,
                ..
            } | ControlFlow::Next { .. }
                | ControlFlow::Redo
        )
    }
}

impl PartialEq for ControlFlow {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ControlFlow::Break {
                    value: v1,
                    target: t1,
                },
                ControlFlow::Break {
                    value: v2,
                    target: t2,
                },
            ) => v1 == v2 && t1 == t2,
            (ControlFlow::Next { value: v1 }, ControlFlow::Next { value: v2 }) => v1 == v2,
            (ControlFlow::Redo, ControlFlow::Redo) => true,
            (
                ControlFlow::Return {
                    value: v1,
                    frame: f1,
                },
                ControlFlow::Return {
                    value: v2,
                    frame: f2,
                },
            ) => v1 == v2 && f1 == f2,
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Signal-raising expressions
// ═══════════════════════════════════════════════════════════════════════

fn jump_value(
    value: Option<&crate::ast::Expr>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    match value {
        Some(expr) => expr.eval(scope, rt),
        None => Ok(Value::Nil),
    }
}

/// `break [value]`
pub fn eval_break(
    value: Option<&crate::ast::Expr>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let target = scope
        .break_target()
        .ok_or_else(|| EvalError::invalid("break from proc-closure or outside of a loop"))?;
    let value = jump_value(value, scope, rt)?;
    Err(EvalError::ControlFlow(ControlFlow::Break { value, target }))
}

/// `next [value]`
pub fn eval_next(
    value: Option<&crate::ast::Expr>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    if scope.break_target().is_none() {
        return Err(EvalError::invalid("next used outside of a loop or block"));
    }
    let value = jump_value(value, scope, rt)?;
    Err(EvalError::ControlFlow(ControlFlow::Next { value }))
}

/// `redo`
pub fn eval_redo(scope: &Rc<Scope>) -> Result<Value, EvalError> {
    if scope.break_target().is_none() {
        return Err(EvalError::invalid("redo used outside of a loop or block"));
    }
    Err(EvalError::ControlFlow(ControlFlow::Redo))
}

/// `return [value]`
pub fn eval_return(
    value: Option<&crate::ast::Expr>,
    scope: &Rc<Scope>,
    rt: &Machine,
) -> Result<Value, EvalError> {
    let frame = scope
        .frame()
        .ok_or_else(|| EvalError::invalid("unexpected return"))?;
    let value = jump_value(value, scope, rt)?;
    Err(EvalError::ControlFlow(ControlFlow::Return { value, frame }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(ControlFlow::Redo.keyword(), "redo");
        let ret = ControlFlow::Return {
            value: Value::Nil,
            frame: 1,
        };
        assert_eq!(ret.keyword(), "return");
    }

    #[test]
    fn test_loop_signals() {
        let loop_break = ControlFlow::Break {
            value: Value::Nil,
            target: BreakTarget::Loop,
        };
        let block_break = ControlFlow::Break {
            value: Value::Nil,
            target: BreakTarget::Block(4),
        };
        assert!(loop_break.is_loop_signal());
        assert!(!block_break.is_loop_signal());
        assert!(ControlFlow::Next { value: Value::Nil }.is_loop_signal());
    }

    #[test]
    fn test_partialeq() {
        let a = ControlFlow::Return {
            value: Value::Long(1),
            frame: 3,
        };
        let b = ControlFlow::Return {
            value: Value::Long(1),
            frame: 4,
        };
        assert_ne!(a, b);
        assert_eq!(ControlFlow::Redo, ControlFlow::Redo);
    }

    #[test]
    fn test_unexpected_display() {
        let err = EvalError::ControlFlow(ControlFlow::Next { value: Value::Nil });
        assert_eq!(err.to_string(), "unexpected next");
    }
}
