//! Syntax tree for Garnet programs
//!
//! Every node derives structural equality and hashing, so two independent
//! parses of the same text compare equal and hash identically. Bodies that
//! outlive a single evaluation (method definitions and block literals) are
//! shared behind `Rc` so closures and method tables never clone the tree.

mod visit;

pub use visit::{walk_expr, Visitor};

use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A float literal with bitwise equality and hashing.
#[derive(Debug, Clone, Copy)]
pub struct FloatLit(pub f64);

impl PartialEq for FloatLit {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatLit {}

impl Hash for FloatLit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `&&` / `and`
    And,
    /// `||` / `or`
    Or,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `<=>`
    Cmp,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `**`
    Pow,
}

impl BinaryOp {
    /// Map an operator token to its binary operator.
    pub fn from_token(text: &str) -> Option<BinaryOp> {
        Some(match text {
            "&&" | "and" => BinaryOp::And,
            "||" | "or" => BinaryOp::Or,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<=>" => BinaryOp::Cmp,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "**" => BinaryOp::Pow,
            _ => return None,
        })
    }

    /// The method name an object receiver is sent for this operator.
    pub fn method_name(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Cmp => "<=>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
        }
    }
}

/// A literal or code segment of an interpolated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrPart {
    /// Literal text
    Text(String),
    /// `#{...}` code
    Code(Expr),
}

/// Formal parameter list of a method, block or lambda.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Params {
    /// Required positional parameters
    pub required: Vec<String>,
    /// Optional parameters with default expressions
    pub optional: Vec<(String, Expr)>,
    /// `*rest` parameter
    pub rest: Option<String>,
    /// `&block` parameter, always last
    pub block: Option<String>,
}

impl Params {
    /// Number of declared positional parameters (required plus optional).
    pub fn positional_len(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Human readable arity for argument errors: `2`, `1..2` or `1+`.
    pub fn arity_text(&self) -> String {
        let min = self.required.len();
        if self.rest.is_some() {
            format!("{}+", min)
        } else if self.optional.is_empty() {
            min.to_string()
        } else {
            format!("{}..{}", min, self.positional_len())
        }
    }
}

/// The block attached to a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockArg {
    /// `{ |x| ... }` or `do |x| ... end`
    Literal(Rc<BlockBody>),
    /// `&expr`
    Pass(Box<Expr>),
}

/// Parameters and body of a block, proc or lambda literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockBody {
    /// Declared parameters
    pub params: Params,
    /// Block body
    pub body: Expr,
}

/// A method call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallExpr {
    /// Explicit receiver, `None` for a call on `self`
    pub receiver: Option<Box<Expr>>,
    /// Method name
    pub name: String,
    /// Arguments, possibly containing splats and a trailing keyword hash
    pub args: Vec<Expr>,
    /// Attached block
    pub block: Option<BlockArg>,
}

/// `def` definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefExpr {
    /// `self` or another receiver for singleton definitions
    pub target: Option<Box<Expr>>,
    /// Method name, including any `?`, `!` or `=` suffix
    pub name: String,
    /// Parameters
    pub params: Params,
    /// Method body
    pub body: Rc<Expr>,
}

/// A possibly scoped constant path used as a class or module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstPath {
    /// Enclosing namespace expression (`A` in `A::B`)
    pub scope: Option<Box<Expr>>,
    /// Final constant name
    pub name: String,
}

/// `class` definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassExpr {
    /// Class name path
    pub path: ConstPath,
    /// Superclass expression after `<`
    pub superclass: Option<Box<Expr>>,
    /// Class body
    pub body: Expr,
}

/// `module` definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleExpr {
    /// Module name path
    pub path: ConstPath,
    /// Module body
    pub body: Expr,
}

/// A `rescue` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RescueClause {
    /// Exception class expressions; empty means `StandardError`
    pub classes: Vec<Expr>,
    /// `=> name` binding
    pub binding: Option<String>,
    /// Handler body
    pub body: Expr,
}

/// `begin ... rescue ... else ... ensure ... end`, also used for `def`
/// bodies with implicit rescue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeginExpr {
    /// Protected body
    pub body: Expr,
    /// Rescue clauses in order
    pub rescues: Vec<RescueClause>,
    /// Runs when the body raised nothing
    pub else_body: Option<Expr>,
    /// Always runs exactly once
    pub ensure: Option<Expr>,
}

/// A `when` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhenClause {
    /// Candidate patterns, compared with `===`
    pub patterns: Vec<Expr>,
    /// Clause body
    pub body: Expr,
}

/// `case ... when` expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseExpr {
    /// Subject, absent for the condition-list form
    pub subject: Option<Box<Expr>>,
    /// When clauses
    pub whens: Vec<WhenClause>,
    /// Else branch
    pub else_body: Option<Box<Expr>>,
}

/// Structural pattern for `case ... in`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches anything without binding (`_`)
    Wildcard,
    /// Matches anything and binds it to a local
    Bind(String),
    /// Compared against the subject with `===`
    Value(Expr),
    /// `[a, b, *rest]`
    Array {
        /// Patterns before the splat
        before: Vec<Pattern>,
        /// `*name` splat, `Some(None)` for an anonymous `*`
        rest: Option<Option<String>>,
        /// Patterns after the splat
        after: Vec<Pattern>,
    },
    /// `{key: pattern, other:}`
    Hash(Vec<(String, Option<Pattern>)>),
    /// `a | b`
    Alternatives(Vec<Pattern>),
    /// `Const(...)` deconstruction
    Deconstruct {
        /// Constant expression
        constant: Expr,
        /// Sub-patterns
        args: Vec<Pattern>,
    },
}

/// An `in` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InClause {
    /// Pattern to match
    pub pattern: Pattern,
    /// `if` guard
    pub guard: Option<Expr>,
    /// Clause body
    pub body: Expr,
}

/// `case ... in` expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseInExpr {
    /// Subject
    pub subject: Box<Expr>,
    /// In clauses
    pub clauses: Vec<InClause>,
    /// Else branch
    pub else_body: Option<Box<Expr>>,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    // ═══════════════════════════════════════════════════════════════════
    // Literals
    // ═══════════════════════════════════════════════════════════════════
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `self`
    SelfRef,
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(FloatLit),
    /// String literal
    Str(String),
    /// `"a #{b} c"`
    Interpolated(Vec<StrPart>),
    /// `:name`
    Symbol(String),
    /// `/pattern/flags`
    Regex {
        /// Pattern source
        pattern: String,
        /// Flag letters
        flags: String,
    },
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{k => v}`
    Hash(Vec<(Expr, Expr)>),
    /// `a..b` / `a...b`
    Range {
        /// Lower bound
        start: Box<Expr>,
        /// Upper bound
        end: Box<Expr>,
        /// `...` excludes the upper bound
        exclusive: bool,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Variables and constants
    // ═══════════════════════════════════════════════════════════════════
    /// Bare identifier: a local variable or a zero-argument call on self
    Name(String),
    /// `Foo`
    Constant(String),
    /// `A::B`
    ScopedConstant {
        /// Namespace expression
        scope: Box<Expr>,
        /// Constant name
        name: String,
    },
    /// `@name`
    InstanceVar(String),
    /// `@@name`
    ClassVar(String),
    /// `$name`
    GlobalVar(String),

    // ═══════════════════════════════════════════════════════════════════
    // Assignment
    // ═══════════════════════════════════════════════════════════════════
    /// `name = value`
    AssignLocal {
        /// Variable name
        name: String,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `Name = value` / `A::Name = value`
    AssignConstant {
        /// Constant path
        path: ConstPath,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `@name = value`
    AssignInstanceVar {
        /// Variable name including `@`
        name: String,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `@@name = value`
    AssignClassVar {
        /// Variable name including `@@`
        name: String,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `$name = value`
    AssignGlobal {
        /// Variable name including `$`
        name: String,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `receiver.name = value`
    AssignMember {
        /// Receiver
        receiver: Box<Expr>,
        /// Attribute name without `=`
        name: String,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `receiver[args] = value`
    AssignIndex {
        /// Receiver
        receiver: Box<Expr>,
        /// Index arguments
        args: Vec<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `!x` / `not x`
    Not(Box<Expr>),
    /// `-x`
    Negate(Box<Expr>),
    /// `+x`
    Plus(Box<Expr>),
    /// `*expr` in argument and array lists
    Splat(Box<Expr>),
    /// `**expr` in argument lists
    DoubleSplat(Box<Expr>),

    // ═══════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════
    /// Method call
    Call(CallExpr),
    /// `receiver[args]`
    Index {
        /// Receiver
        receiver: Box<Expr>,
        /// Index arguments
        args: Vec<Expr>,
    },
    /// `yield args`
    Yield(Vec<Expr>),
    /// `lambda { }` / `-> (x) { }`
    Lambda(Rc<BlockBody>),
    /// `proc { }`
    ProcLiteral(Rc<BlockBody>),

    // ═══════════════════════════════════════════════════════════════════
    // Control structures
    // ═══════════════════════════════════════════════════════════════════
    /// Statement sequence; evaluates to the last value
    Sequence(Vec<Expr>),
    /// `if` / `elsif` / ternary / `if` modifier
    If {
        /// Condition
        cond: Box<Expr>,
        /// Taken when truthy
        then_branch: Box<Expr>,
        /// Taken when falsy
        else_branch: Option<Box<Expr>>,
    },
    /// `unless` / `unless` modifier
    Unless {
        /// Condition
        cond: Box<Expr>,
        /// Taken when falsy
        then_branch: Box<Expr>,
        /// Taken when truthy
        else_branch: Option<Box<Expr>>,
    },
    /// `while` loop or modifier
    While {
        /// Loop condition
        cond: Box<Expr>,
        /// Loop body
        body: Box<Expr>,
    },
    /// `until` loop or modifier
    Until {
        /// Exit condition
        cond: Box<Expr>,
        /// Loop body
        body: Box<Expr>,
    },
    /// `for a, b in iterable`
    For {
        /// Loop variables
        vars: Vec<String>,
        /// Iterated value
        iterable: Box<Expr>,
        /// Loop body
        body: Box<Expr>,
    },
    /// `case ... when`
    Case(Box<CaseExpr>),
    /// `case ... in`
    CaseIn(Box<CaseInExpr>),
    /// `break [value]`
    Break(Option<Box<Expr>>),
    /// `next [value]`
    Next(Option<Box<Expr>>),
    /// `redo`
    Redo,
    /// `return [value]`
    Return(Option<Box<Expr>>),
    /// `begin` / `rescue` / `ensure`
    Begin(Box<BeginExpr>),
    /// `raise args`
    Raise(Vec<Expr>),
    /// `defined?(expr)`
    Defined(Box<Expr>),
    /// `require expr`
    Require(Box<Expr>),

    // ═══════════════════════════════════════════════════════════════════
    // Definitions
    // ═══════════════════════════════════════════════════════════════════
    /// `def`
    Def(Box<DefExpr>),
    /// `class`
    ClassDef(Box<ClassExpr>),
    /// `module`
    ModuleDef(Box<ModuleExpr>),
    /// `class << target`
    SingletonClass {
        /// Object whose singleton class is opened
        target: Box<Expr>,
        /// Body
        body: Box<Expr>,
    },
}

impl Expr {
    /// Build a method call node.
    pub fn call(receiver: Option<Expr>, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call(CallExpr {
            receiver: receiver.map(Box::new),
            name: name.into(),
            args,
            block: None,
        })
    }

    /// Build a binary node.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Name carried by the node: variable, constant, method or definition
    /// name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::Name(n)
            | Expr::Constant(n)
            | Expr::InstanceVar(n)
            | Expr::ClassVar(n)
            | Expr::GlobalVar(n)
            | Expr::ScopedConstant { name: n, .. }
            | Expr::AssignLocal { name: n, .. }
            | Expr::AssignInstanceVar { name: n, .. }
            | Expr::AssignClassVar { name: n, .. }
            | Expr::AssignGlobal { name: n, .. }
            | Expr::AssignMember { name: n, .. } => Some(n),
            Expr::AssignConstant { path, .. } => Some(&path.name),
            Expr::Call(call) => Some(&call.name),
            Expr::Def(def) => Some(&def.name),
            Expr::ClassDef(class) => Some(&class.path.name),
            Expr::ModuleDef(module) => Some(&module.path.name),
            _ => None,
        }
    }

    /// Receiver or target expression of the node.
    pub fn target(&self) -> Option<&Expr> {
        match self {
            Expr::Call(call) => call.receiver.as_deref(),
            Expr::Index { receiver, .. }
            | Expr::AssignMember { receiver, .. }
            | Expr::AssignIndex { receiver, .. } => Some(receiver),
            Expr::ScopedConstant { scope, .. } => Some(scope),
            Expr::Def(def) => def.target.as_deref(),
            Expr::SingletonClass { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Body of a definition, loop or block-carrying node.
    pub fn body(&self) -> Option<&Expr> {
        match self {
            Expr::Def(def) => Some(&def.body),
            Expr::ClassDef(class) => Some(&class.body),
            Expr::ModuleDef(module) => Some(&module.body),
            Expr::SingletonClass { body, .. }
            | Expr::While { body, .. }
            | Expr::Until { body, .. }
            | Expr::For { body, .. } => Some(body),
            Expr::Lambda(block) | Expr::ProcLiteral(block) => Some(&block.body),
            Expr::Begin(begin) => Some(&begin.body),
            Expr::Call(CallExpr {
                block: Some(BlockArg::Literal(block)),
                ..
            }) => Some(&block.body),
            _ => None,
        }
    }

    /// Short description used by `defined?` and diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Nil => "nil",
            Expr::True => "true",
            Expr::False => "false",
            Expr::SelfRef => "self",
            Expr::Name(_) | Expr::Call(_) => "method",
            Expr::Constant(_) | Expr::ScopedConstant { .. } => "constant",
            Expr::InstanceVar(_) => "instance-variable",
            Expr::ClassVar(_) => "class variable",
            Expr::GlobalVar(_) => "global-variable",
            Expr::Yield(_) => "yield",
            Expr::AssignLocal { .. }
            | Expr::AssignConstant { .. }
            | Expr::AssignInstanceVar { .. }
            | Expr::AssignClassVar { .. }
            | Expr::AssignGlobal { .. }
            | Expr::AssignMember { .. }
            | Expr::AssignIndex { .. } => "assignment",
            _ => "expression",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(expr: &Expr) -> u64 {
        let mut hasher = DefaultHasher::new();
        expr.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_float_literal_equality_is_bitwise() {
        assert_eq!(FloatLit(1.5), FloatLit(1.5));
        assert_ne!(FloatLit(0.0), FloatLit(-0.0));
        assert_eq!(FloatLit(f64::NAN), FloatLit(f64::NAN));
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let a = Expr::binary(BinaryOp::Add, Expr::Integer(1), Expr::Name("x".into()));
        let b = Expr::binary(BinaryOp::Add, Expr::Integer(1), Expr::Name("x".into()));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_accessors() {
        let call = Expr::call(Some(Expr::Name("a".into())), "b", vec![]);
        assert_eq!(call.name(), Some("b"));
        assert_eq!(call.target(), Some(&Expr::Name("a".into())));
        assert_eq!(call.body(), None);
    }

    #[test]
    fn test_arity_text() {
        let params = Params {
            required: vec!["a".into()],
            optional: vec![("b".into(), Expr::Nil)],
            ..Params::default()
        };
        assert_eq!(params.arity_text(), "1..2");
    }
}
