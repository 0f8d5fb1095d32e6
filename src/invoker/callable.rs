//! Callable references and their resolution to something invocable

use crate::class::{ClassRegistry, INVOKE_METHOD, Method};
use crate::container::ServiceLocator;
use crate::signature::Signature;
use crate::{Arguments, DiError, Function, ObjectRef, Result, Value};

/// Object side of a method reference.
#[derive(Debug, Clone)]
pub enum MethodTarget {
    /// An existing object
    Object(ObjectRef),
    /// A container entry, or a class name for static methods
    Name(String),
}

/// Something that may be called: the target of `call` and of factories.
#[derive(Debug, Clone)]
pub enum CallableRef {
    /// A native function
    Function(Function),
    /// `target::method`
    Method { target: MethodTarget, method: String },
    /// An object with an [`INVOKE_METHOD`] method
    Object(ObjectRef),
    /// A container entry holding a callable or an invokable object
    Entry(String),
}

impl CallableRef {
    /// Describe the reference in error messages
    pub fn describe(&self) -> String {
        match self {
            CallableRef::Function(function) => function.signature().name().to_string(),
            CallableRef::Method { target, method } => match target {
                MethodTarget::Object(object) => format!("{}::{}", object.class(), method),
                MethodTarget::Name(name) => format!("{name}::{method}"),
            },
            CallableRef::Object(object) => format!("{}::{}", object.class(), INVOKE_METHOD),
            CallableRef::Entry(name) => name.clone(),
        }
    }
}

impl From<Function> for CallableRef {
    fn from(function: Function) -> Self {
        CallableRef::Function(function)
    }
}

impl From<ObjectRef> for CallableRef {
    fn from(object: ObjectRef) -> Self {
        CallableRef::Object(object)
    }
}

/// `"Class::method"` is a method reference, anything else an entry name
impl From<&str> for CallableRef {
    fn from(s: &str) -> Self {
        match s.split_once("::") {
            Some((target, method)) => CallableRef::Method {
                target: MethodTarget::Name(target.to_string()),
                method: method.to_string(),
            },
            None => CallableRef::Entry(s.to_string()),
        }
    }
}

impl From<String> for CallableRef {
    fn from(s: String) -> Self {
        CallableRef::from(s.as_str())
    }
}

/// `[entry-or-class, method]` pair
impl From<(&str, &str)> for CallableRef {
    fn from((target, method): (&str, &str)) -> Self {
        CallableRef::Method {
            target: MethodTarget::Name(target.to_string()),
            method: method.to_string(),
        }
    }
}

impl From<(ObjectRef, &str)> for CallableRef {
    fn from((object, method): (ObjectRef, &str)) -> Self {
        CallableRef::Method {
            target: MethodTarget::Object(object),
            method: method.to_string(),
        }
    }
}

/// A resolved callable, ready to receive arguments.
#[derive(Clone)]
pub enum Invocable {
    Function(Function),
    Method { object: ObjectRef, method: Method },
}

impl Invocable {
    #[inline]
    pub fn signature(&self) -> &Signature {
        match self {
            Invocable::Function(function) => function.signature(),
            Invocable::Method { method, .. } => method.signature(),
        }
    }

    pub fn invoke(&self, args: Arguments) -> Result<Value> {
        match self {
            Invocable::Function(function) => function.call(args),
            Invocable::Method { object, method } => method.invoke(object, args),
        }
    }
}

impl std::fmt::Debug for Invocable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invocable({})", self.signature().name())
    }
}

/// Turns [`CallableRef`]s into [`Invocable`]s, fetching targets from the container.
pub struct CallableResolver<'a> {
    registry: &'a ClassRegistry,
}

impl<'a> CallableResolver<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, callable: &CallableRef, locator: &dyn ServiceLocator) -> Result<Invocable> {
        match callable {
            CallableRef::Function(function) => Ok(Invocable::Function(function.clone())),
            CallableRef::Object(object) => self.bound_method(object, INVOKE_METHOD),
            CallableRef::Method {
                target: MethodTarget::Object(object),
                method,
            } => self.bound_method(object, method),
            CallableRef::Method {
                target: MethodTarget::Name(name),
                method,
            } => {
                if let Some(function) = self
                    .registry
                    .class(name)
                    .and_then(|meta| meta.static_method(method).cloned())
                {
                    return Ok(Invocable::Function(function));
                }
                if !locator.has(name) {
                    return Err(DiError::not_callable(format!(
                        "{name}::{method} (neither a container entry nor a class with that static method)"
                    )));
                }
                match locator.get(name)? {
                    Value::Object(object) => self.bound_method(&object, method),
                    other => Err(DiError::not_callable(format!(
                        "{}::{} ({} is not an object)",
                        name,
                        method,
                        other.type_name()
                    ))),
                }
            }
            CallableRef::Entry(name) => {
                if !locator.has(name) {
                    return Err(DiError::not_callable(format!(
                        "{name} (not a container entry)"
                    )));
                }
                self.from_value(locator.get(name)?)
            }
        }
    }

    /// Invocable form of a resolved value
    pub fn from_value(&self, value: Value) -> Result<Invocable> {
        match value {
            Value::Callable(function) => Ok(Invocable::Function(function)),
            Value::Object(object) => self.bound_method(&object, INVOKE_METHOD),
            other => Err(DiError::not_callable(format!(
                "a value of type {}",
                other.type_name()
            ))),
        }
    }

    fn bound_method(&self, object: &ObjectRef, method: &str) -> Result<Invocable> {
        let meta = self
            .registry
            .class(object.class())
            .ok_or_else(|| DiError::not_callable(format!("{}::{}", object.class(), method)))?;
        let method = meta
            .method(method)
            .cloned()
            .ok_or_else(|| DiError::not_callable(format!("{}::{}", object.class(), method)))?;
        Ok(Invocable::Method {
            object: object.clone(),
            method,
        })
    }
}
