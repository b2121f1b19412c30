//! # Garnet
//!
//! An embeddable, Ruby-like scripting language with a tree-walking
//! evaluator.
//!
//! Source text goes through the [`lexer`] and [`parser`] into an [`ast`]
//! that is evaluated directly against a chain of lexical [`environment`]
//! scopes. Scripts get a dynamic object model (classes, modules, mixins,
//! singleton classes), blocks with non-local `break`/`next`/`return`,
//! `begin/rescue/ensure`, and structural `case/in` pattern matching.
//!
//! ## Architecture
//!
//! - **Front end**: [`lexer::Tokenizer`] and [`parser::parse`]
//! - **Evaluator**: the [`Evaluate`] trait over [`ast::Expr`]; control flow
//!   travels as [`EvalError::ControlFlow`]
//! - **Runtime**: [`Machine`] owns the core classes, globals, output and
//!   the builtin method tables
//! - **Host bridge**: [`native`] exposes host types to scripts behind a
//!   [`TypeAccessPolicy`]
//!
//! ## Example
//!
//! ```
//! use garnet::{Machine, Value};
//!
//! let machine = Machine::new();
//! let src = "
//! class Counter
//!   def initialize
//!     @n = 0
//!   end
//!
//!   def bump
//!     @n += 1
//!   end
//! end
//!
//! c = Counter.new
//! 3.times { c.bump }
//! c.bump
//! ";
//! assert_eq!(machine.execute_text(src).unwrap(), Value::Long(4));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod config;
pub mod environment;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod runtime;
pub mod value;

// Re-export main types
pub use config::{AccessMode, MachineConfig, OutputMode};
pub use environment::Scope;
pub use error::{ErrorKind, EvalError, ParseError};
pub use eval::{eval_sequence, BreakTarget, ControlFlow, Evaluate};
pub use native::{
    AllowAll, AllowListPolicy, DenyAll, NativeCall, NativeError, NativeObject, NativeResult,
    NativeType, NativeTypeBuilder, TypeAccessPolicy,
};
pub use parser::{parse, try_parse_commands};
pub use runtime::Machine;
pub use value::{Args, BuiltinFn, Class, Object, Proc, Value};

/// Garnet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
