//! Native host bridge
//!
//! Hosts describe their types with [`NativeType::builder`]: a constructor,
//! instance methods, properties, static methods and enum constants. Script
//! code reaches registered types through qualified constants
//! (`Host::Text::Builder.new`) once the active [`TypeAccessPolicy`] allows
//! them.
//!
//! Host functions receive a [`NativeCall`] and return a [`NativeResult`].
//! Errors from host code travel as `anyhow::Error` and surface to scripts as
//! `RuntimeError`; interpreter errors raised inside a host function (for
//! instance from a block it called back into) pass through unchanged.

mod adapter;
mod policy;

pub(crate) use adapter::{invoke, resolve_path, scoped_constant};
pub use policy::{policy_for, AllowAll, AllowListPolicy, DenyAll, TypeAccessPolicy};

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::EvalError;
use crate::runtime::Machine;
use crate::value::{Args, Proc, Value};

/// Result of a host function.
pub type NativeResult = Result<Value, NativeError>;

/// Host function pointer.
pub type NativeFn = Rc<dyn Fn(&NativeCall<'_>) -> NativeResult>;

/// Error returned by host functions.
#[derive(Error, Debug)]
pub enum NativeError {
    /// An interpreter error, propagated unchanged
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A host failure
    #[error("{0:#}")]
    Host(#[from] anyhow::Error),
}

impl From<NativeError> for EvalError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Eval(e) => e,
            NativeError::Host(e) => EvalError::runtime(format!("{:#}", e)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════════════════

/// A host property: getter plus optional setter.
#[derive(Clone)]
pub struct NativeProperty {
    getter: NativeFn,
    setter: Option<NativeFn>,
}

/// A host type visible to scripts.
pub struct NativeType {
    name: String,
    constructor: Option<NativeFn>,
    methods: HashMap<String, NativeFn>,
    properties: HashMap<String, NativeProperty>,
    static_methods: HashMap<String, NativeFn>,
    enum_values: IndexMap<String, i64>,
}

impl std::fmt::Debug for NativeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeType({})", self.name)
    }
}

impl NativeType {
    /// Start describing a type with a `::`-qualified name.
    pub fn builder(name: impl Into<String>) -> NativeTypeBuilder {
        NativeTypeBuilder {
            ty: NativeType {
                name: name.into(),
                constructor: None,
                methods: HashMap::new(),
                properties: HashMap::new(),
                static_methods: HashMap::new(),
                enum_values: IndexMap::new(),
            },
        }
    }

    /// Qualified name, e.g. `Host::Text::Builder`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the type declares enum constants.
    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Enum constant names in declaration order.
    pub fn enum_names(&self) -> Vec<String> {
        self.enum_values.keys().cloned().collect()
    }

    pub(crate) fn constructor(&self) -> Option<&NativeFn> {
        self.constructor.as_ref()
    }

    pub(crate) fn method(&self, name: &str) -> Option<&NativeFn> {
        self.methods.get(name)
    }

    pub(crate) fn property(&self, name: &str) -> Option<&NativeProperty> {
        self.properties.get(name)
    }

    pub(crate) fn static_method(&self, name: &str) -> Option<&NativeFn> {
        self.static_methods.get(name)
    }

    pub(crate) fn enum_value(&self, name: &str) -> Option<i64> {
        self.enum_values.get(name).copied()
    }

    /// Whether instances answer to `name`.
    pub fn has_instance_member(&self, name: &str) -> bool {
        self.methods.contains_key(name)
            || self.properties.contains_key(name)
            || name
                .strip_suffix('=')
                .and_then(|p| self.properties.get(p))
                .is_some_and(|p| p.setter.is_some())
    }

    /// Whether the type itself answers to `name`.
    pub fn has_static_member(&self, name: &str) -> bool {
        (name == "new" && self.constructor.is_some()) || self.static_methods.contains_key(name)
    }
}

/// Builder for [`NativeType`].
pub struct NativeTypeBuilder {
    ty: NativeType,
}

impl NativeTypeBuilder {
    /// Constructor invoked by `Type.new(...)`.
    pub fn constructor(mut self, f: impl Fn(&NativeCall<'_>) -> NativeResult + 'static) -> Self {
        self.ty.constructor = Some(Rc::new(f));
        self
    }

    /// Instance method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&NativeCall<'_>) -> NativeResult + 'static,
    ) -> Self {
        self.ty.methods.insert(name.into(), Rc::new(f));
        self
    }

    /// Read-only property.
    pub fn property(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&NativeCall<'_>) -> NativeResult + 'static,
    ) -> Self {
        self.ty.properties.insert(
            name.into(),
            NativeProperty {
                getter: Rc::new(getter),
                setter: None,
            },
        );
        self
    }

    /// Read-write property; the setter receives the new value as argument 0.
    pub fn property_rw(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&NativeCall<'_>) -> NativeResult + 'static,
        setter: impl Fn(&NativeCall<'_>) -> NativeResult + 'static,
    ) -> Self {
        self.ty.properties.insert(
            name.into(),
            NativeProperty {
                getter: Rc::new(getter),
                setter: Some(Rc::new(setter)),
            },
        );
        self
    }

    /// Static method, called on the type.
    pub fn static_method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&NativeCall<'_>) -> NativeResult + 'static,
    ) -> Self {
        self.ty.static_methods.insert(name.into(), Rc::new(f));
        self
    }

    /// Enum constant reachable as `Type::NAME`.
    pub fn enum_value(mut self, name: impl Into<String>, ordinal: i64) -> Self {
        self.ty.enum_values.insert(name.into(), ordinal);
        self
    }

    /// Finish the description.
    pub fn build(self) -> NativeType {
        self.ty
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Objects
// ═══════════════════════════════════════════════════════════════════════

enum NativeData {
    Host(RefCell<Box<dyn Any>>),
    Enum { name: Rc<str>, ordinal: i64 },
}

/// A host value wrapped for scripts.
pub struct NativeObject {
    ty: Rc<NativeType>,
    data: NativeData,
}

impl std::fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeObject({})", self.ty.name)
    }
}

impl NativeObject {
    /// Wrap host data.
    pub fn new<T: Any>(ty: Rc<NativeType>, data: T) -> Self {
        Self {
            ty,
            data: NativeData::Host(RefCell::new(Box::new(data))),
        }
    }

    pub(crate) fn enum_member(ty: Rc<NativeType>, name: &str, ordinal: i64) -> Self {
        Self {
            ty,
            data: NativeData::Enum {
                name: Rc::from(name),
                ordinal,
            },
        }
    }

    /// The host type.
    pub fn native_type(&self) -> &Rc<NativeType> {
        &self.ty
    }

    /// Enum constant name and ordinal, for enum members.
    pub fn enum_info(&self) -> Option<(&str, i64)> {
        match &self.data {
            NativeData::Enum { name, ordinal } => Some((name, *ordinal)),
            NativeData::Host(_) => None,
        }
    }

    /// Borrow the host data as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Result<Ref<'_, T>, EvalError> {
        let NativeData::Host(cell) = &self.data else {
            return Err(self.wrong_type::<T>());
        };
        let data = cell
            .try_borrow()
            .map_err(|_| EvalError::invalid(format!("{} is already mutably borrowed", self.ty.name)))?;
        Ref::filter_map(data, |b| b.downcast_ref::<T>()).map_err(|_| self.wrong_type::<T>())
    }

    /// Borrow the host data mutably as `T`.
    pub fn downcast_mut<T: Any>(&self) -> Result<RefMut<'_, T>, EvalError> {
        let NativeData::Host(cell) = &self.data else {
            return Err(self.wrong_type::<T>());
        };
        let data = cell
            .try_borrow_mut()
            .map_err(|_| EvalError::invalid(format!("{} is already borrowed", self.ty.name)))?;
        RefMut::filter_map(data, |b| b.downcast_mut::<T>()).map_err(|_| self.wrong_type::<T>())
    }

    fn wrong_type<T: Any>(&self) -> EvalError {
        EvalError::type_error(format!(
            "{} does not hold a {}",
            self.ty.name,
            std::any::type_name::<T>()
        ))
    }

    /// Equality: enum members compare by type and ordinal, host objects by
    /// identity.
    pub fn native_eq(&self, other: &NativeObject) -> bool {
        match (&self.data, &other.data) {
            (NativeData::Enum { ordinal: a, .. }, NativeData::Enum { ordinal: b, .. }) => {
                Rc::ptr_eq(&self.ty, &other.ty) && a == b
            }
            _ => std::ptr::eq(self, other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Calls
// ═══════════════════════════════════════════════════════════════════════

/// Arguments and context of a host function call.
pub struct NativeCall<'a> {
    rt: &'a Machine,
    this: Value,
    args: Args,
}

impl<'a> NativeCall<'a> {
    pub(crate) fn new(rt: &'a Machine, this: Value, args: Args) -> Self {
        Self { rt, this, args }
    }

    /// The running machine.
    pub fn machine(&self) -> &Machine {
        self.rt
    }

    /// Receiver: the object for instance members, the type for statics.
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// Borrow the receiver's host data.
    pub fn this_ref<T: Any>(&self) -> Result<Ref<'_, T>, NativeError> {
        match &self.this {
            Value::Native(obj) => Ok(obj.downcast_ref::<T>()?),
            other => Err(EvalError::type_error(format!("{} is not a host object", other.type_name())).into()),
        }
    }

    /// Borrow the receiver's host data mutably.
    pub fn this_mut<T: Any>(&self) -> Result<RefMut<'_, T>, NativeError> {
        match &self.this {
            Value::Native(obj) => Ok(obj.downcast_mut::<T>()?),
            other => Err(EvalError::type_error(format!("{} is not a host object", other.type_name())).into()),
        }
    }

    /// All positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args.positional
    }

    /// Argument `i`, or `nil`.
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i)
    }

    /// Fail unless `min..=max` arguments were given.
    pub fn check_args(&self, min: usize, max: usize) -> Result<(), NativeError> {
        Ok(self.args.check(min, max)?)
    }

    /// Argument `i` as a string.
    pub fn arg_str(&self, i: usize) -> Result<String, NativeError> {
        match self.args.positional.get(i) {
            Some(Value::Str(s)) | Some(Value::Symbol(s)) => Ok(s.to_string()),
            Some(other) => Err(EvalError::type_error(format!(
                "no implicit conversion of {} into String",
                other.type_name()
            ))
            .into()),
            None => Err(EvalError::arity(self.args.len(), i + 1).into()),
        }
    }

    /// Argument `i` as an integer.
    pub fn arg_i64(&self, i: usize) -> Result<i64, NativeError> {
        let value = self.arg(i);
        value.as_i64().ok_or_else(|| {
            EvalError::type_error(format!(
                "no implicit conversion of {} into Integer",
                value.type_name()
            ))
            .into()
        })
    }

    /// Argument `i` as a float; integers widen.
    pub fn arg_f64(&self, i: usize) -> Result<f64, NativeError> {
        let value = self.arg(i);
        value.as_f64().ok_or_else(|| {
            EvalError::type_error(format!(
                "no implicit conversion of {} into Float",
                value.type_name()
            ))
            .into()
        })
    }

    /// The block passed with the call.
    pub fn block(&self) -> Option<&Rc<Proc>> {
        self.args.block.as_ref()
    }

    /// Call the block with `args`; fails when no block was given.
    pub fn call_block(&self, args: Vec<Value>) -> NativeResult {
        let block = self.args.require_block()?;
        Ok(self.rt.call_proc(&block, Args::new(args))?)
    }

    /// Wrap host data as an instance of `ty`.
    pub fn wrap<T: Any>(&self, ty: &Rc<NativeType>, data: T) -> Value {
        Value::Native(Rc::new(NativeObject::new(ty.clone(), data)))
    }

    /// Wrap host data as an instance of the receiver type (inside a
    /// constructor or static method).
    pub fn wrap_self<T: Any>(&self, data: T) -> NativeResult {
        match &self.this {
            Value::NativeType(ty) => Ok(self.wrap(ty, data)),
            Value::Native(obj) => Ok(self.wrap(obj.native_type(), data)),
            other => Err(EvalError::type_error(format!("{} is not a host type", other.type_name())).into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Host types known to a machine. Types registered directly are active at
/// once; package types become active on `require`.
#[derive(Default)]
pub struct NativeRegistry {
    active: RefCell<IndexMap<String, Rc<NativeType>>>,
    packages: RefCell<HashMap<String, Vec<Rc<NativeType>>>>,
}

impl NativeRegistry {
    /// Make a type reachable.
    pub fn register(&self, ty: Rc<NativeType>) {
        tracing::debug!(name = %ty.name(), "registering native type");
        self.active.borrow_mut().insert(ty.name().to_string(), ty);
    }

    /// Record a package that `require name` activates.
    pub fn register_package(&self, name: impl Into<String>, types: Vec<Rc<NativeType>>) {
        self.packages.borrow_mut().insert(name.into(), types);
    }

    /// Activate a package. Returns `false` when no such package exists.
    pub fn activate(&self, name: &str) -> bool {
        let Some(types) = self.packages.borrow_mut().remove(name) else {
            return false;
        };
        tracing::debug!(package = name, count = types.len(), "activating native package");
        for ty in types {
            self.register(ty);
        }
        true
    }

    /// Whether `require name` names a package not yet activated.
    pub fn has_package(&self, name: &str) -> bool {
        self.packages.borrow().contains_key(name)
    }

    /// Active type with this exact name.
    pub fn get(&self, name: &str) -> Option<Rc<NativeType>> {
        self.active.borrow().get(name).cloned()
    }

    /// Whether any active type lives under the namespace `prefix`.
    pub fn has_namespace(&self, prefix: &str) -> bool {
        let nested = format!("{}::", prefix);
        self.active.borrow().keys().any(|k| k.starts_with(&nested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_type() -> Rc<NativeType> {
        Rc::new(
            NativeType::builder("Host::Counter")
                .constructor(|call| call.wrap_self(call.arg_i64(0)?))
                .method("value", |call| Ok(Value::Long(*call.this_ref::<i64>()?)))
                .build(),
        )
    }

    #[test]
    fn test_downcast_wrong_type() {
        let obj = NativeObject::new(counter_type(), 5i64);
        assert_eq!(*obj.downcast_ref::<i64>().unwrap(), 5);
        assert!(obj.downcast_ref::<String>().is_err());
    }

    #[test]
    fn test_mutable_borrow_conflict_is_an_error() {
        let obj = NativeObject::new(counter_type(), 5i64);
        let _held = obj.downcast_mut::<i64>().unwrap();
        assert!(obj.downcast_ref::<i64>().is_err());
    }

    #[test]
    fn test_enum_equality() {
        let ty = Rc::new(
            NativeType::builder("Host::Color")
                .enum_value("Red", 0)
                .enum_value("Blue", 1)
                .build(),
        );
        let a = NativeObject::enum_member(ty.clone(), "Red", 0);
        let b = NativeObject::enum_member(ty.clone(), "Red", 0);
        let c = NativeObject::enum_member(ty, "Blue", 1);
        assert!(a.native_eq(&b));
        assert!(!a.native_eq(&c));
    }

    #[test]
    fn test_host_error_becomes_runtime_error() {
        let err: EvalError = NativeError::Host(anyhow::anyhow!("disk full")).into();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(err.class_name(), "RuntimeError");
    }

    #[test]
    fn test_registry_packages_activate_once() {
        let registry = NativeRegistry::default();
        registry.register_package("counter", vec![counter_type()]);
        assert!(registry.get("Host::Counter").is_none());
        assert!(registry.activate("counter"));
        assert!(!registry.activate("counter"));
        assert!(registry.has_namespace("Host"));
        assert!(registry.get("Host::Counter").is_some());
    }
}
