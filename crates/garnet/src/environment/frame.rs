//! RAII guards for loop nesting and call depth

use std::cell::Cell;

use crate::error::EvalError;

/// RAII guard that marks a scope as inside a loop body until dropped.
pub struct LoopGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> LoopGuard<'a> {
    pub(super) fn new(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl<'a> Drop for LoopGuard<'a> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// RAII guard that counts one level of method or block call depth.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use garnet::environment::CallGuard;
///
/// let depth = Cell::new(0);
/// {
///     let _outer = CallGuard::enter(&depth, 2).unwrap();
///     let _inner = CallGuard::enter(&depth, 2).unwrap();
///     assert!(CallGuard::enter(&depth, 2).is_err());
/// }
/// assert_eq!(depth.get(), 0);
/// ```
pub struct CallGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> CallGuard<'a> {
    /// Count one call, failing with a stack error past `max`.
    pub fn enter(depth: &'a Cell<usize>, max: usize) -> Result<Self, EvalError> {
        let next = depth.get() + 1;
        if next > max {
            return Err(EvalError::StackOverflow { depth: next, max });
        }
        depth.set(next);
        Ok(Self { depth })
    }
}

impl<'a> Drop for CallGuard<'a> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_guard_restores_depth() {
        let depth = Cell::new(0);
        {
            let _a = LoopGuard::new(&depth);
            let _b = LoopGuard::new(&depth);
            assert_eq!(depth.get(), 2);
        }
        assert_eq!(depth.get(), 0);
    }

    #[test]
    fn test_call_guard_limit() {
        let depth = Cell::new(0);
        let _guard = CallGuard::enter(&depth, 1).unwrap();
        let err = CallGuard::enter(&depth, 1).err().unwrap();
        assert!(matches!(err, EvalError::StackOverflow { depth: 2, max: 1 }));
        assert_eq!(depth.get(), 1);
    }

    #[test]
    fn test_call_guard_released_on_error_path() {
        fn recurse(depth: &Cell<usize>, n: usize) -> Result<(), EvalError> {
            let _guard = CallGuard::enter(depth, 3)?;
            if n > 0 {
                recurse(depth, n - 1)?;
            }
            Ok(())
        }
        let depth = Cell::new(0);
        assert!(recurse(&depth, 10).is_err());
        assert_eq!(depth.get(), 0);
    }
}
