//! Lexical scopes: locals, `self`, enclosing module and bound block

mod frame;

pub use frame::{CallGuard, LoopGuard};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::eval::BreakTarget;
use crate::value::{Cref, Proc, Value};

/// Identifies a method or lambda invocation; `return` unwinds to it.
pub type FrameId = u64;

/// What created a scope. Decides how far name lookup and control-flow
/// target resolution walk up the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Script top level
    TopLevel,
    /// Method body
    Method,
    /// Block, proc or lambda body; sees the locals of its definer
    Block,
    /// `class`/`module` body
    ClassBody,
    /// `rescue` handler; holds the `=> name` binding only
    Rescue,
}

/// A lexical frame in the scope chain.
///
/// Blocks share their defining scope by reference, so assignments made on
/// either side of the capture are visible to the other.
///
/// # Example
///
/// ```
/// use garnet::environment::Scope;
/// use garnet::value::{Class, Cref, Value};
///
/// let object = Class::new_class("Object", None);
/// let top = Scope::top_level(Value::Nil, Cref::root(object));
/// top.set("x", Value::Long(1));
///
/// let block = Scope::block(&top, 7, None, None);
/// block.set("x", Value::Long(2)); // assigns the outer x
/// block.set("y", Value::Long(3)); // block-local
///
/// assert_eq!(top.get("x"), Some(Value::Long(2)));
/// assert_eq!(top.get("y"), None);
/// ```
pub struct Scope {
    locals: RefCell<IndexMap<String, Value>>,
    self_value: Value,
    cref: Rc<Cref>,
    block: Option<Rc<Proc>>,
    parent: Option<Rc<Scope>>,
    frame: Option<FrameId>,
    kind: ScopeKind,
    proc_id: Option<u64>,
    loop_depth: Cell<usize>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("locals", &self.locals.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Scope {
    fn build(
        kind: ScopeKind,
        self_value: Value,
        cref: Rc<Cref>,
        block: Option<Rc<Proc>>,
        parent: Option<Rc<Scope>>,
        frame: Option<FrameId>,
        proc_id: Option<u64>,
    ) -> Rc<Self> {
        Rc::new(Self {
            locals: RefCell::new(IndexMap::new()),
            self_value,
            cref,
            block,
            parent,
            frame,
            kind,
            proc_id,
            loop_depth: Cell::new(0),
        })
    }

    /// The root scope of a machine.
    pub fn top_level(self_value: Value, cref: Rc<Cref>) -> Rc<Self> {
        Self::build(ScopeKind::TopLevel, self_value, cref, None, None, None, None)
    }

    /// A fresh method-body scope; it sees no outer locals.
    pub fn method(
        self_value: Value,
        cref: Rc<Cref>,
        block: Option<Rc<Proc>>,
        frame: FrameId,
    ) -> Rc<Self> {
        Self::build(ScopeKind::Method, self_value, cref, block, None, Some(frame), None)
    }

    /// A `class`/`module` body scope; `self` is the class.
    pub fn class_body(self_value: Value, cref: Rc<Cref>) -> Rc<Self> {
        Self::build(ScopeKind::ClassBody, self_value, cref, None, None, None, None)
    }

    /// A block body closing over `parent`. Lambdas pass their own frame.
    /// `self_value` rebinds `self` (for `define_method` bodies).
    pub fn block(
        parent: &Rc<Scope>,
        proc_id: u64,
        frame: Option<FrameId>,
        self_value: Option<Value>,
    ) -> Rc<Self> {
        Self::build(
            ScopeKind::Block,
            self_value.unwrap_or_else(|| parent.self_value.clone()),
            parent.cref.clone(),
            None,
            Some(parent.clone()),
            frame,
            Some(proc_id),
        )
    }

    /// A rescue handler scope, transparent to everything but its binding.
    pub fn rescue(parent: &Rc<Scope>) -> Rc<Self> {
        Self::build(
            ScopeKind::Rescue,
            parent.self_value.clone(),
            parent.cref.clone(),
            None,
            Some(parent.clone()),
            None,
            None,
        )
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// What created this scope.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Current `self`.
    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    /// Lexical module nesting.
    pub fn cref(&self) -> &Rc<Cref> {
        &self.cref
    }

    /// Parent scope, for blocks and rescue handlers.
    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Scopes from this one outward while lookup is transparent.
    fn chain(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |&s| match s.kind {
            ScopeKind::Block | ScopeKind::Rescue => s.parent.as_deref(),
            _ => None,
        })
    }

    /// The block `yield` invokes: the one bound to the enclosing method.
    pub fn block_arg(&self) -> Option<Rc<Proc>> {
        self.chain().find_map(|s| s.block.clone())
    }

    /// Frame that `return` unwinds to, if inside a method or lambda.
    pub fn frame(&self) -> Option<FrameId> {
        self.chain().find_map(|s| s.frame)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Locals
    // ═══════════════════════════════════════════════════════════════════

    /// Look a local up through enclosing block scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.chain()
            .find_map(|s| s.locals.borrow().get(name).cloned())
    }

    /// Whether a local is visible.
    pub fn contains(&self, name: &str) -> bool {
        self.chain().any(|s| s.locals.borrow().contains_key(name))
    }

    /// Assign a local: updates the visible binding, or creates one in the
    /// nearest scope that owns new locals.
    pub fn set(&self, name: &str, value: Value) {
        if let Some(owner) = self.chain().find(|s| s.locals.borrow().contains_key(name)) {
            owner.locals.borrow_mut().insert(name.to_string(), value);
            return;
        }
        let owner = self
            .chain()
            .find(|s| s.kind != ScopeKind::Rescue)
            .unwrap_or(self);
        owner.locals.borrow_mut().insert(name.to_string(), value);
    }

    /// Bind a local in this scope, shadowing outer ones (block parameters,
    /// rescue bindings).
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.locals.borrow_mut().insert(name.into(), value);
    }

    /// Remove a visible local.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let owner = self.chain().find(|s| s.locals.borrow().contains_key(name))?;
        let mut locals = owner.locals.borrow_mut();
        locals.shift_remove(name)
    }

    /// Names of all visible locals, innermost first.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for scope in self.chain() {
            for name in scope.locals.borrow().keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    // ═══════════════════════════════════════════════════════════════════
    // Control-flow targets
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a loop body; the returned guard leaves it.
    pub fn enter_loop(&self) -> LoopGuard<'_> {
        LoopGuard::new(&self.loop_depth)
    }

    /// What `break`/`next`/`redo` unwind to from here: the innermost loop
    /// of this body, else the enclosing block invocation.
    pub fn break_target(&self) -> Option<BreakTarget> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if s.loop_depth.get() > 0 {
                return Some(BreakTarget::Loop);
            }
            match s.kind {
                ScopeKind::Rescue => scope = s.parent.as_deref(),
                ScopeKind::Block => return s.proc_id.map(BreakTarget::Block),
                _ => return None,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Class;

    fn top() -> Rc<Scope> {
        Scope::top_level(Value::Nil, Cref::root(Class::new_class("Object", None)))
    }

    #[test]
    fn test_method_scope_is_isolated() {
        let top = top();
        top.set("x", Value::Long(1));
        let method = Scope::method(Value::Nil, top.cref().clone(), None, 1);
        assert_eq!(method.get("x"), None);
    }

    #[test]
    fn test_block_shares_definer_locals() {
        let top = top();
        top.set("count", Value::Long(0));
        let block = Scope::block(&top, 9, None, None);
        block.set("count", Value::Long(5));
        assert_eq!(top.get("count"), Some(Value::Long(5)));
    }

    #[test]
    fn test_block_parameter_shadows() {
        let top = top();
        top.set("x", Value::Long(1));
        let block = Scope::block(&top, 9, None, None);
        block.define("x", Value::Long(2));
        assert_eq!(block.get("x"), Some(Value::Long(2)));
        assert_eq!(top.get("x"), Some(Value::Long(1)));
    }

    #[test]
    fn test_rescue_assignments_land_outside() {
        let top = top();
        let rescue = Scope::rescue(&top);
        rescue.define("e", Value::string("boom"));
        rescue.set("handled", Value::Bool(true));
        assert_eq!(top.get("handled"), Some(Value::Bool(true)));
        assert_eq!(top.get("e"), None);
    }

    #[test]
    fn test_frame_found_through_blocks() {
        let method = Scope::method(Value::Nil, top().cref().clone(), None, 42);
        let block = Scope::block(&method, 1, None, None);
        assert_eq!(block.frame(), Some(42));
        assert_eq!(top().frame(), None);
    }

    #[test]
    fn test_break_target() {
        let top = top();
        assert_eq!(top.break_target(), None);
        {
            let _guard = top.enter_loop();
            assert_eq!(top.break_target(), Some(BreakTarget::Loop));
        }
        let block = Scope::block(&top, 3, None, None);
        assert_eq!(block.break_target(), Some(BreakTarget::Block(3)));
    }
}
