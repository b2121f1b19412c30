//! Classes, modules, singleton classes and object instances

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{BuiltinFn, Method, Value};
use crate::error::EvalError;

/// What a [`Class`] value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Instantiable class
    Class,
    /// Module: mixed in, never instantiated
    Module,
    /// Per-object class holding singleton methods
    Singleton,
}

/// A class, module or singleton class.
///
/// Method tables, mixins and constants are mutable so that classes can be
/// reopened; the name and superclass are fixed at creation.
pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    kind: ClassKind,
    mixins: RefCell<Vec<Rc<Class>>>,
    methods: RefCell<HashMap<String, Method>>,
    singleton: RefCell<Option<Rc<Class>>>,
    constants: RefCell<IndexMap<String, Value>>,
    class_vars: RefCell<IndexMap<String, Value>>,
    ivars: RefCell<IndexMap<String, Value>>,
    frozen: Cell<bool>,
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Class({})", self.name)
    }
}

impl Class {
    fn with_kind(name: impl Into<String>, superclass: Option<Rc<Class>>, kind: ClassKind) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            superclass,
            kind,
            mixins: RefCell::new(Vec::new()),
            methods: RefCell::new(HashMap::new()),
            singleton: RefCell::new(None),
            constants: RefCell::new(IndexMap::new()),
            class_vars: RefCell::new(IndexMap::new()),
            ivars: RefCell::new(IndexMap::new()),
            frozen: Cell::new(false),
        })
    }

    /// Create a class. Only the root class has no superclass.
    pub fn new_class(name: impl Into<String>, superclass: Option<Rc<Class>>) -> Rc<Self> {
        Self::with_kind(name, superclass, ClassKind::Class)
    }

    /// Create a module.
    pub fn new_module(name: impl Into<String>) -> Rc<Self> {
        Self::with_kind(name, None, ClassKind::Module)
    }

    /// Fully qualified name, e.g. `Outer::Inner`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct superclass.
    pub fn superclass(&self) -> Option<Rc<Class>> {
        self.superclass.clone()
    }

    /// What this class value stands for.
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Whether this is a module.
    pub fn is_module(&self) -> bool {
        self.kind == ClassKind::Module
    }

    /// Whether this is a singleton class.
    pub fn is_singleton(&self) -> bool {
        self.kind == ClassKind::Singleton
    }

    // ═══════════════════════════════════════════════════════════════════
    // Methods and mixins
    // ═══════════════════════════════════════════════════════════════════

    /// Add or replace a method.
    pub fn define_method(&self, name: impl Into<String>, method: Method) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.methods.borrow_mut().insert(name.into(), method);
        Ok(())
    }

    /// Install a builtin during bootstrap, before anything can be frozen.
    pub(crate) fn define_builtin(&self, func: BuiltinFn) {
        self.methods
            .borrow_mut()
            .insert(func.name.clone(), Method::Builtin(func));
    }

    /// Remove a method defined directly on this class.
    pub fn remove_method(&self, name: &str) -> Result<bool, EvalError> {
        self.check_frozen()?;
        Ok(self.methods.borrow_mut().remove(name).is_some())
    }

    /// Method defined directly on this class.
    pub fn own_method(&self, name: &str) -> Option<Method> {
        self.methods.borrow().get(name).cloned()
    }

    /// Names of methods defined directly on this class, sorted.
    pub fn own_method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Mix a module in. Including the same module twice is a no-op.
    pub fn include(&self, module: Rc<Class>) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.include_builtin(module);
        Ok(())
    }

    /// Mix a module in during bootstrap.
    pub(crate) fn include_builtin(&self, module: Rc<Class>) {
        let mut mixins = self.mixins.borrow_mut();
        if !mixins.iter().any(|m| Rc::ptr_eq(m, &module)) {
            mixins.push(module);
        }
    }

    /// Mixed-in modules in inclusion order.
    pub fn mixins(&self) -> Vec<Rc<Class>> {
        self.mixins.borrow().clone()
    }

    /// Resolve a method: own table, then mixins depth-first in inclusion
    /// order, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        if let Some(method) = self.own_method(name) {
            return Some(method);
        }
        for mixin in self.mixins() {
            if let Some(method) = mixin.find_method(name) {
                return Some(method);
            }
        }
        self.superclass.as_ref().and_then(|s| s.find_method(name))
    }

    /// Method resolution order starting at this class.
    pub fn ancestors(self: &Rc<Self>) -> Vec<Rc<Class>> {
        let mut out = Vec::new();
        self.collect_ancestors(&mut out);
        out
    }

    fn collect_ancestors(self: &Rc<Self>, out: &mut Vec<Rc<Class>>) {
        if out.iter().any(|c| Rc::ptr_eq(c, self)) {
            return;
        }
        out.push(self.clone());
        for mixin in self.mixins() {
            mixin.collect_ancestors(out);
        }
        if let Some(superclass) = &self.superclass {
            superclass.collect_ancestors(out);
        }
    }

    /// Whether `other` appears among this class's ancestors.
    pub fn inherits_from(self: &Rc<Self>, other: &Rc<Class>) -> bool {
        self.ancestors().iter().any(|c| Rc::ptr_eq(c, other))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Singleton class
    // ═══════════════════════════════════════════════════════════════════

    /// The singleton class holding class methods, created on first use.
    pub fn singleton_class(&self) -> Rc<Class> {
        self.singleton
            .borrow_mut()
            .get_or_insert_with(|| {
                Class::with_kind(format!("#<Class:{}>", self.name), None, ClassKind::Singleton)
            })
            .clone()
    }

    /// The singleton class if one has been created.
    pub fn existing_singleton(&self) -> Option<Rc<Class>> {
        self.singleton.borrow().clone()
    }

    /// Resolve a class method through the singleton classes of this class
    /// and its superclasses.
    pub fn find_class_method(&self, name: &str) -> Option<Method> {
        if let Some(method) = self.existing_singleton().and_then(|s| s.find_method(name)) {
            return Some(method);
        }
        self.superclass.as_ref().and_then(|s| s.find_class_method(name))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Constants and class variables
    // ═══════════════════════════════════════════════════════════════════

    /// Constant defined directly on this class.
    pub fn own_constant(&self, name: &str) -> Option<Value> {
        self.constants.borrow().get(name).cloned()
    }

    /// Constant on this class, its mixins or its superclasses.
    pub fn find_constant(self: &Rc<Self>, name: &str) -> Option<Value> {
        self.ancestors().iter().find_map(|c| c.own_constant(name))
    }

    /// Define or replace a constant.
    pub fn set_constant(&self, name: impl Into<String>, value: Value) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.constants.borrow_mut().insert(name.into(), value);
        Ok(())
    }

    pub(crate) fn insert_constant(&self, name: impl Into<String>, value: Value) {
        self.constants.borrow_mut().insert(name.into(), value);
    }

    /// Names of constants in definition order.
    pub fn constant_names(&self) -> Vec<String> {
        self.constants.borrow().keys().cloned().collect()
    }

    /// Class variable, searched up the superclass chain.
    pub fn get_class_var(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.class_vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.superclass.as_ref().and_then(|s| s.get_class_var(name))
    }

    /// Assign a class variable on the class that already defines it, or
    /// on this class.
    pub fn set_class_var(&self, name: &str, value: Value) -> Result<(), EvalError> {
        if !self.class_vars.borrow().contains_key(name) {
            if let Some(owner) = self.superclass.as_ref().filter(|s| s.get_class_var(name).is_some()) {
                return owner.set_class_var(name, value);
            }
        }
        self.check_frozen()?;
        self.class_vars.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    /// Class-level instance variable (`@x` with `self` a class).
    pub fn get_ivar(&self, name: &str) -> Option<Value> {
        self.ivars.borrow().get(name).cloned()
    }

    /// Assign a class-level instance variable.
    pub fn set_ivar(&self, name: impl Into<String>, value: Value) -> Result<(), EvalError> {
        self.check_frozen()?;
        self.ivars.borrow_mut().insert(name.into(), value);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Freezing
    // ═══════════════════════════════════════════════════════════════════

    /// Freeze in place.
    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    /// Whether frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    fn check_frozen(&self) -> Result<(), EvalError> {
        if self.frozen.get() {
            let what = if self.is_module() { "Module" } else { "Class" };
            return Err(EvalError::frozen(format!(
                "can't modify frozen {}: {}",
                what, self.name
            )));
        }
        Ok(())
    }
}

/// Lexical module nesting used for constant lookup.
///
/// Each `class`/`module` body pushes a link; methods capture the chain
/// they were defined under.
#[derive(Debug)]
pub struct Cref {
    /// Innermost enclosing module
    pub module: Rc<Class>,
    /// Outer nesting
    pub parent: Option<Rc<Cref>>,
}

impl Cref {
    /// The root nesting.
    pub fn root(module: Rc<Class>) -> Rc<Self> {
        Rc::new(Self {
            module,
            parent: None,
        })
    }

    /// Nest `module` inside this chain.
    pub fn push(self: &Rc<Self>, module: Rc<Class>) -> Rc<Self> {
        Rc::new(Self {
            module,
            parent: Some(self.clone()),
        })
    }

    /// Resolve a constant lexically, innermost first, then through the
    /// ancestors of the innermost module.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut cref = Some(self);
        while let Some(c) = cref {
            if let Some(value) = c.module.own_constant(name) {
                return Some(value);
            }
            cref = c.parent.as_deref();
        }
        self.module.find_constant(name)
    }
}

/// An instance of a script class.
pub struct Object {
    class: Rc<Class>,
    ivars: RefCell<IndexMap<String, Value>>,
    singleton: RefCell<Option<Rc<Class>>>,
    frozen: Cell<bool>,
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.class.name)
    }
}

impl Object {
    /// Create an instance without running `initialize`.
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            ivars: RefCell::new(IndexMap::new()),
            singleton: RefCell::new(None),
            frozen: Cell::new(false),
        }
    }

    /// The instance's class (never its singleton class).
    pub fn class(&self) -> Rc<Class> {
        self.class.clone()
    }

    /// Read an instance variable; the name includes `@`.
    pub fn get_ivar(&self, name: &str) -> Option<Value> {
        self.ivars.borrow().get(name).cloned()
    }

    /// Assign an instance variable.
    pub fn set_ivar(&self, name: impl Into<String>, value: Value) -> Result<(), EvalError> {
        if self.frozen.get() {
            return Err(EvalError::frozen(format!(
                "can't modify frozen {}",
                self.class.name
            )));
        }
        self.ivars.borrow_mut().insert(name.into(), value);
        Ok(())
    }

    /// Snapshot of the instance variables in assignment order.
    pub fn ivars(&self) -> Vec<(String, Value)> {
        self.ivars
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The singleton class, created on first use.
    pub fn singleton_class(&self) -> Rc<Class> {
        self.singleton
            .borrow_mut()
            .get_or_insert_with(|| {
                Class::with_kind(
                    format!("#<Class:#<{}>>", self.class.name),
                    None,
                    ClassKind::Singleton,
                )
            })
            .clone()
    }

    /// The singleton class if one has been created.
    pub fn existing_singleton(&self) -> Option<Rc<Class>> {
        self.singleton.borrow().clone()
    }

    /// Resolve a method: singleton class first, then the class chain.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        self.existing_singleton()
            .and_then(|s| s.find_method(name))
            .or_else(|| self.class.find_method(name))
    }

    /// Freeze in place.
    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    /// Whether frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }
}
