//! Core class hierarchy bootstrap

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::value::{Class, Value};

/// The built-in classes every machine starts with.
///
/// The root of the hierarchy is `Object`, which mixes in `Kernel`; every
/// core class and every constant below is also reachable by name from
/// scripts.
pub struct CoreClasses {
    /// `Object`, the only class without a superclass
    pub object: Rc<Class>,
    /// `Kernel`, mixed into `Object`
    pub kernel: Rc<Class>,
    /// `Module`
    pub module: Rc<Class>,
    /// `Class`
    pub class: Rc<Class>,
    /// `Comparable`
    pub comparable: Rc<Class>,
    /// `NilClass`
    pub nil_class: Rc<Class>,
    /// `TrueClass`
    pub true_class: Rc<Class>,
    /// `FalseClass`
    pub false_class: Rc<Class>,
    /// `Numeric`
    pub numeric: Rc<Class>,
    /// `Integer`
    pub integer: Rc<Class>,
    /// `Float`
    pub float: Rc<Class>,
    /// `String`
    pub string: Rc<Class>,
    /// `Symbol`
    pub symbol: Rc<Class>,
    /// `Array`
    pub array: Rc<Class>,
    /// `Hash`
    pub hash: Rc<Class>,
    /// `Range`
    pub range: Rc<Class>,
    /// `Regexp`
    pub regexp: Rc<Class>,
    /// `Proc`
    pub proc: Rc<Class>,
    /// `Exception`
    pub exception: Rc<Class>,
    /// `StandardError`
    pub standard_error: Rc<Class>,
    errors: HashMap<ErrorKind, Rc<Class>>,
}

impl CoreClasses {
    /// Build the hierarchy and register every class as a constant on
    /// `Object`. Builtin methods are installed separately.
    pub(crate) fn bootstrap() -> Self {
        let object = Class::new_class("Object", None);
        let kernel = Class::new_module("Kernel");
        object.include_builtin(kernel.clone());

        let sub = |name: &str, parent: &Rc<Class>| Class::new_class(name, Some(parent.clone()));

        let module = sub("Module", &object);
        let class = sub("Class", &module);
        let comparable = Class::new_module("Comparable");
        let numeric = sub("Numeric", &object);
        numeric.include_builtin(comparable.clone());
        let string = sub("String", &object);
        string.include_builtin(comparable.clone());

        let exception = sub("Exception", &object);
        let standard_error = sub("StandardError", &exception);
        let script_error = sub("ScriptError", &exception);

        let runtime_error = sub("RuntimeError", &standard_error);
        let name_error = sub("NameError", &standard_error);
        let mut errors = HashMap::new();
        for kind in ErrorKind::BUILTIN {
            let parent = match kind {
                ErrorKind::Runtime => {
                    errors.insert(*kind, runtime_error.clone());
                    continue;
                }
                ErrorKind::Name => {
                    errors.insert(*kind, name_error.clone());
                    continue;
                }
                ErrorKind::Frozen => &runtime_error,
                ErrorKind::NoMethod => &name_error,
                ErrorKind::Syntax => &script_error,
                ErrorKind::StackOverflow => &exception,
                _ => &standard_error,
            };
            errors.insert(*kind, sub(kind.class_name(), parent));
        }

        let core = Self {
            nil_class: sub("NilClass", &object),
            true_class: sub("TrueClass", &object),
            false_class: sub("FalseClass", &object),
            integer: sub("Integer", &numeric),
            float: sub("Float", &numeric),
            symbol: sub("Symbol", &object),
            array: sub("Array", &object),
            hash: sub("Hash", &object),
            range: sub("Range", &object),
            regexp: sub("Regexp", &object),
            proc: sub("Proc", &object),
            object,
            kernel,
            module,
            class,
            comparable,
            numeric,
            string,
            exception,
            standard_error,
            errors,
        };

        let mut named: Vec<Rc<Class>> = vec![
            core.object.clone(),
            core.kernel.clone(),
            core.module.clone(),
            core.class.clone(),
            core.comparable.clone(),
            core.nil_class.clone(),
            core.true_class.clone(),
            core.false_class.clone(),
            core.numeric.clone(),
            core.integer.clone(),
            core.float.clone(),
            core.string.clone(),
            core.symbol.clone(),
            core.array.clone(),
            core.hash.clone(),
            core.range.clone(),
            core.regexp.clone(),
            core.proc.clone(),
            core.exception.clone(),
            core.standard_error.clone(),
            script_error,
        ];
        named.extend(core.errors.values().cloned());
        for class in named {
            core.object
                .insert_constant(class.name().to_string(), Value::Class(class));
        }
        core
    }

    /// The exception class an error kind is rescued as.
    pub fn error_class(&self, kind: ErrorKind) -> Rc<Class> {
        match kind {
            ErrorKind::Exception => self.exception.clone(),
            ErrorKind::ControlFlow => self.error_class(ErrorKind::InvalidOperation),
            other => self
                .errors
                .get(&other)
                .cloned()
                .unwrap_or_else(|| self.standard_error.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_hierarchy() {
        let core = CoreClasses::bootstrap();
        let frozen = core.error_class(ErrorKind::Frozen);
        let runtime = core.error_class(ErrorKind::Runtime);
        assert!(frozen.inherits_from(&runtime));
        assert!(frozen.inherits_from(&core.standard_error));

        let no_method = core.error_class(ErrorKind::NoMethod);
        assert!(no_method.inherits_from(&core.error_class(ErrorKind::Name)));

        let stack = core.error_class(ErrorKind::StackOverflow);
        assert!(!stack.inherits_from(&core.standard_error));
        assert!(stack.inherits_from(&core.exception));
    }

    #[test]
    fn test_classes_are_constants() {
        let core = CoreClasses::bootstrap();
        for name in ["Object", "Integer", "TypeError", "SyntaxError", "Comparable"] {
            assert!(core.object.own_constant(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_object_mixes_in_kernel() {
        let core = CoreClasses::bootstrap();
        assert!(core.integer.inherits_from(&core.kernel));
        assert!(core.class.inherits_from(&core.module));
    }
}
