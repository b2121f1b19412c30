//! Error types for Garnet parsing and evaluation

use thiserror::Error;

use crate::eval::ControlFlow;
use crate::value::Value;

/// A syntax error raised by the tokenizer or parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    /// Human readable description, e.g. `expected ')'`
    pub message: String,
    /// Line the error was detected on (1-indexed)
    pub line: usize,
}

impl ParseError {
    /// Create a parse error at the given line.
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// The script-visible classification of an error.
///
/// Every kind maps onto a built-in exception class so that `rescue`
/// clauses can select on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `SyntaxError`
    Syntax,
    /// `NameError`
    Name,
    /// `NoMethodError`
    NoMethod,
    /// `TypeError`
    Type,
    /// `ArgumentError`
    Argument,
    /// `FrozenError`
    Frozen,
    /// `InvalidOperationError`
    InvalidOperation,
    /// `TypeAccessError`
    TypeAccess,
    /// `NotSupportedError`
    NotSupported,
    /// `ZeroDivisionError`
    ZeroDivision,
    /// `RangeError`
    Range,
    /// `SystemStackError`
    StackOverflow,
    /// `RuntimeError`
    Runtime,
    /// A raised user exception object
    Exception,
    /// A control-flow signal that escaped its target
    ControlFlow,
}

impl ErrorKind {
    /// The exception class name this kind is rescued as.
    pub fn class_name(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::NoMethod => "NoMethodError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::Frozen => "FrozenError",
            ErrorKind::InvalidOperation => "InvalidOperationError",
            ErrorKind::TypeAccess => "TypeAccessError",
            ErrorKind::NotSupported => "NotSupportedError",
            ErrorKind::ZeroDivision => "ZeroDivisionError",
            ErrorKind::Range => "RangeError",
            ErrorKind::StackOverflow => "SystemStackError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Exception => "Exception",
            ErrorKind::ControlFlow => "InvalidOperationError",
        }
    }

    /// Kinds that correspond to a built-in exception class, in the order
    /// the class hierarchy is bootstrapped.
    pub const BUILTIN: &'static [ErrorKind] = &[
        ErrorKind::Runtime,
        ErrorKind::Frozen,
        ErrorKind::Name,
        ErrorKind::NoMethod,
        ErrorKind::Type,
        ErrorKind::Argument,
        ErrorKind::ZeroDivision,
        ErrorKind::Range,
        ErrorKind::InvalidOperation,
        ErrorKind::TypeAccess,
        ErrorKind::NotSupported,
        ErrorKind::Syntax,
        ErrorKind::StackOverflow,
    ];

    /// Look a kind up by exception class name.
    pub fn from_class_name(name: &str) -> Option<ErrorKind> {
        Self::BUILTIN.iter().copied().find(|k| k.class_name() == name)
    }
}

/// Errors that can occur during evaluation.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Source text failed to parse
    #[error("{0}")]
    Syntax(#[from] ParseError),

    /// Undefined local variable, method or constant
    #[error("{message}")]
    Name {
        /// Error message
        message: String,
    },

    /// Receiver does not respond to a method
    #[error("{message}")]
    NoMethod {
        /// Error message
        message: String,
    },

    /// Operand of the wrong type
    #[error("{message}")]
    Type {
        /// Error message
        message: String,
    },

    /// Wrong argument count or value
    #[error("{message}")]
    Argument {
        /// Error message
        message: String,
    },

    /// Mutation of a frozen value
    #[error("{message}")]
    Frozen {
        /// Error message
        message: String,
    },

    /// An operation that is illegal in the current context
    #[error("{message}")]
    InvalidOperation {
        /// Error message
        message: String,
    },

    /// A native type or member was denied by the access policy
    #[error("{message}")]
    TypeAccess {
        /// Error message
        message: String,
    },

    /// A construct the runtime recognizes but does not implement
    #[error("{message}")]
    NotSupported {
        /// Error message
        message: String,
    },

    /// Integer division or modulo by zero
    #[error("divided by 0")]
    ZeroDivision,

    /// Numeric overflow or out-of-range argument
    #[error("{message}")]
    Range {
        /// Error message
        message: String,
    },

    /// Call depth exceeded the configured limit
    #[error("stack level too deep (depth {depth}, max {max})")]
    StackOverflow {
        /// Depth at which the limit was hit
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Generic runtime error (`raise "message"`)
    #[error("{message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// A raised exception object
    #[error("{}", describe_exception(.0))]
    Raised(Value),

    /// Non-local control flow (`break`, `next`, `redo`, `return`).
    ///
    /// Not an error in the usual sense: the signal unwinds through `?` until
    /// the loop, block call site or method frame it targets catches it.
    #[error("unexpected {}", .0.keyword())]
    ControlFlow(ControlFlow),
}

impl EvalError {
    /// Create a name error.
    pub fn name(message: impl Into<String>) -> Self {
        EvalError::Name {
            message: message.into(),
        }
    }

    /// Create a no-method error.
    pub fn no_method(message: impl Into<String>) -> Self {
        EvalError::NoMethod {
            message: message.into(),
        }
    }

    /// Create a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type {
            message: message.into(),
        }
    }

    /// Create an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        EvalError::Argument {
            message: message.into(),
        }
    }

    /// Create an argument-count error.
    pub fn arity(given: usize, expected: impl std::fmt::Display) -> Self {
        EvalError::argument(format!(
            "wrong number of arguments (given {}, expected {})",
            given, expected
        ))
    }

    /// Create a frozen error.
    pub fn frozen(message: impl Into<String>) -> Self {
        EvalError::Frozen {
            message: message.into(),
        }
    }

    /// Create an invalid-operation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        EvalError::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a type-access error.
    pub fn type_access(message: impl Into<String>) -> Self {
        EvalError::TypeAccess {
            message: message.into(),
        }
    }

    /// Create a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        EvalError::NotSupported {
            message: message.into(),
        }
    }

    /// Create a range error.
    pub fn range(message: impl Into<String>) -> Self {
        EvalError::Range {
            message: message.into(),
        }
    }

    /// Create a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime {
            message: message.into(),
        }
    }

    /// Create an error from a kind and message.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Syntax => EvalError::Syntax(ParseError::new(message, 0)),
            ErrorKind::Name => EvalError::Name { message },
            ErrorKind::NoMethod => EvalError::NoMethod { message },
            ErrorKind::Type => EvalError::Type { message },
            ErrorKind::Argument => EvalError::Argument { message },
            ErrorKind::Frozen => EvalError::Frozen { message },
            ErrorKind::TypeAccess => EvalError::TypeAccess { message },
            ErrorKind::NotSupported => EvalError::NotSupported { message },
            ErrorKind::ZeroDivision => EvalError::ZeroDivision,
            ErrorKind::Range => EvalError::Range { message },
            ErrorKind::StackOverflow => EvalError::StackOverflow { depth: 0, max: 0 },
            ErrorKind::InvalidOperation | ErrorKind::ControlFlow => {
                EvalError::InvalidOperation { message }
            }
            ErrorKind::Runtime | ErrorKind::Exception => EvalError::Runtime { message },
        }
    }

    /// The script-visible classification of this error.
    ///
    /// Raised exception objects report the nearest built-in kind among
    /// their ancestors, or [`ErrorKind::Exception`] for purely user-defined
    /// hierarchies.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax(_) => ErrorKind::Syntax,
            EvalError::Name { .. } => ErrorKind::Name,
            EvalError::NoMethod { .. } => ErrorKind::NoMethod,
            EvalError::Type { .. } => ErrorKind::Type,
            EvalError::Argument { .. } => ErrorKind::Argument,
            EvalError::Frozen { .. } => ErrorKind::Frozen,
            EvalError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            EvalError::TypeAccess { .. } => ErrorKind::TypeAccess,
            EvalError::NotSupported { .. } => ErrorKind::NotSupported,
            EvalError::ZeroDivision => ErrorKind::ZeroDivision,
            EvalError::Range { .. } => ErrorKind::Range,
            EvalError::StackOverflow { .. } => ErrorKind::StackOverflow,
            EvalError::Runtime { .. } => ErrorKind::Runtime,
            EvalError::Raised(value) => raised_kind(value),
            EvalError::ControlFlow(_) => ErrorKind::ControlFlow,
        }
    }

    /// Name of the exception class this error is rescued as.
    pub fn class_name(&self) -> String {
        match self {
            EvalError::Raised(Value::Object(obj)) => obj.class().name().to_string(),
            other => other.kind().class_name().to_string(),
        }
    }

    /// Message text without the class name.
    pub fn message(&self) -> String {
        match self {
            EvalError::Raised(value) => exception_message(value),
            other => other.to_string(),
        }
    }

    /// Control-flow signals unwind through `rescue` untouched.
    pub fn is_rescuable(&self) -> bool {
        !matches!(self, EvalError::ControlFlow(_))
    }
}

fn raised_kind(value: &Value) -> ErrorKind {
    if let Value::Object(obj) = value {
        let mut class = Some(obj.class());
        while let Some(c) = class {
            if let Some(kind) = ErrorKind::from_class_name(c.name()) {
                return kind;
            }
            class = c.superclass();
        }
    }
    ErrorKind::Exception
}

fn exception_message(value: &Value) -> String {
    match value {
        Value::Object(obj) => match obj.get_ivar("@message") {
            Some(Value::Str(s)) => s.to_string(),
            Some(Value::Nil) | None => obj.class().name().to_string(),
            Some(other) => other.to_string(),
        },
        other => other.to_string(),
    }
}

fn describe_exception(value: &Value) -> String {
    match value {
        Value::Object(obj) => format!("{} ({})", exception_message(value), obj.class().name()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_division_message() {
        assert_eq!(EvalError::ZeroDivision.to_string(), "divided by 0");
    }

    #[test]
    fn test_stack_overflow_message() {
        let err = EvalError::StackOverflow { depth: 11, max: 10 };
        assert!(err.to_string().starts_with("stack level too deep"));
        assert_eq!(err.kind().class_name(), "SystemStackError");
    }

    #[test]
    fn test_kind_roundtrip_through_class_name() {
        for kind in ErrorKind::BUILTIN {
            assert_eq!(ErrorKind::from_class_name(kind.class_name()), Some(*kind));
        }
    }

    #[test]
    fn test_arity_message() {
        let err = EvalError::arity(3, 2);
        assert_eq!(err.to_string(), "wrong number of arguments (given 3, expected 2)");
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_control_flow_not_rescuable() {
        let err = EvalError::ControlFlow(ControlFlow::Redo);
        assert!(!err.is_rescuable());
        assert!(EvalError::runtime("boom").is_rescuable());
    }
}
