//! Runtime values produced by resolution
//!
//! Definitions resolve to [`Value`]s. Objects are type-erased behind
//! [`ObjectRef`], a shared handle that keeps identity across clones so that
//! property and method injection mutate the one instance every holder sees.
//! An `ObjectRef` may also be a lazy proxy that builds its target on first
//! access.

use crate::container::ServiceLocator;
use crate::signature::Signature;
use crate::{DiError, Result};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Type-erased object storage
pub type AnyObject = Box<dyn Any + Send + Sync>;

/// Builds the real object behind a lazy proxy
pub(crate) type LazyInit = Arc<dyn Fn() -> Result<ObjectRef> + Send + Sync>;

/// Native function body
pub type NativeFn = dyn Fn(Arguments) -> Result<Value> + Send + Sync;

/// A resolved value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(ObjectRef),
    Callable(Function),
    /// Handle on the container that performed the resolution
    Container(Arc<dyn ServiceLocator>),
}

impl Value {
    /// Human-readable type of the value, objects report their class name
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "string".into(),
            Value::Array(_) => "array".into(),
            Value::Object(object) => object.class().to_string(),
            Value::Callable(_) => "callable".into(),
            Value::Container(_) => "container".into(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Function> {
        match self {
            Value::Callable(function) => Some(function),
            _ => None,
        }
    }

    /// String form used when interpolating into string templates.
    ///
    /// Arrays, objects, callables and containers have no string form.
    pub fn to_template_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => ObjectRef::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Function::ptr_eq(a, b),
            (Value::Container(a), Value::Container(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Callable(function) => fmt::Debug::fmt(function, f),
            Value::Container(_) => f.write_str("Container"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Callable(v)
    }
}

// =============================================================================
// Objects
// =============================================================================

/// Shared, identity-preserving handle on a constructed object.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

struct ObjectCell {
    class: String,
    slot: Slot,
}

enum Slot {
    Ready(RwLock<AnyObject>),
    Lazy {
        target: OnceCell<ObjectRef>,
        init: LazyInit,
    },
}

impl ObjectRef {
    /// Wrap a constructed value as an object of `class`
    pub fn new<T: Any + Send + Sync>(class: impl Into<String>, value: T) -> Self {
        Self::from_boxed(class, Box::new(value))
    }

    pub(crate) fn from_boxed(class: impl Into<String>, value: AnyObject) -> Self {
        Self(Arc::new(ObjectCell {
            class: class.into(),
            slot: Slot::Ready(RwLock::new(value)),
        }))
    }

    /// Create a proxy that runs `init` on first real access
    pub(crate) fn lazy(class: impl Into<String>, init: LazyInit) -> Self {
        Self(Arc::new(ObjectCell {
            class: class.into(),
            slot: Slot::Lazy {
                target: OnceCell::new(),
                init,
            },
        }))
    }

    /// Class name the object was built as
    #[inline]
    pub fn class(&self) -> &str {
        &self.0.class
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self.0.slot, Slot::Lazy { .. })
    }

    /// False only for a lazy proxy that has not been touched yet
    pub fn is_initialized(&self) -> bool {
        match &self.0.slot {
            Slot::Ready(_) => true,
            Slot::Lazy { target, .. } => target.get().is_some(),
        }
    }

    /// Same underlying object (a proxy is its own identity)
    #[inline]
    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// The object that actually holds state, building it if this is a proxy
    fn target(&self) -> Result<&ObjectRef> {
        match &self.0.slot {
            Slot::Ready(_) => Ok(self),
            Slot::Lazy { target, init } => target.get_or_try_init(|| {
                #[cfg(feature = "logging")]
                tracing::debug!(
                    target: "autowire_di",
                    class = self.class(),
                    "Lazy object initializing on first access"
                );
                init()
            }),
        }
    }

    fn lock(&self) -> Result<&RwLock<AnyObject>> {
        match &self.target()?.0.slot {
            Slot::Ready(lock) => Ok(lock),
            Slot::Lazy { .. } => Err(DiError::Internal(format!(
                "lazy proxy for {} resolved to another proxy",
                self.class()
            ))),
        }
    }

    /// Borrow the object as `T`
    pub fn read<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self
            .lock()?
            .read()
            .map_err(|_| DiError::Internal(format!("object {} lock poisoned", self.class())))?;
        let value = (**guard)
            .downcast_ref::<T>()
            .ok_or_else(|| DiError::wrong_type(std::any::type_name::<T>(), self.class()))?;
        Ok(f(value))
    }

    /// Mutably borrow the object as `T`
    pub fn write<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.write_any()?;
        let value = (**guard)
            .downcast_mut::<T>()
            .ok_or_else(|| DiError::wrong_type(std::any::type_name::<T>(), self.class()))?;
        Ok(f(value))
    }

    pub(crate) fn write_any(&self) -> Result<std::sync::RwLockWriteGuard<'_, AnyObject>> {
        self.lock()?
            .write()
            .map_err(|_| DiError::Internal(format!("object {} lock poisoned", self.class())))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class())
            .field("lazy", &self.is_lazy())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// A native callable with a declared signature.
#[derive(Clone)]
pub struct Function {
    signature: Arc<Signature>,
    body: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature: Arc::new(signature),
            body: Arc::new(body),
        }
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn call(&self, args: Arguments) -> Result<Value> {
        (self.body)(args)
    }

    #[inline]
    pub fn ptr_eq(a: &Function, b: &Function) -> bool {
        Arc::ptr_eq(&a.body, &b.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.signature.name())
    }
}

/// Positional arguments handed to native code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    #[inline]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Argument at `index`, failing when it was not passed
    pub fn value(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| DiError::wrong_type(format!("argument #{}", index + 1), "nothing"))
    }

    pub fn string(&self, index: usize) -> Result<String> {
        let value = self.value(index)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DiError::wrong_type("string", value.type_name()))
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        let value = self.value(index)?;
        value
            .as_int()
            .ok_or_else(|| DiError::wrong_type("int", value.type_name()))
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        let value = self.value(index)?;
        value
            .as_float()
            .ok_or_else(|| DiError::wrong_type("float", value.type_name()))
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        let value = self.value(index)?;
        value
            .as_bool()
            .ok_or_else(|| DiError::wrong_type("bool", value.type_name()))
    }

    pub fn array(&self, index: usize) -> Result<Vec<Value>> {
        let value = self.value(index)?;
        value
            .as_array()
            .map(<[Value]>::to_vec)
            .ok_or_else(|| DiError::wrong_type("array", value.type_name()))
    }

    pub fn object(&self, index: usize) -> Result<ObjectRef> {
        let value = self.value(index)?;
        value
            .as_object()
            .cloned()
            .ok_or_else(|| DiError::wrong_type("object", value.type_name()))
    }

    /// Arguments from `index` onwards (variadic tail)
    pub fn rest(&self, index: usize) -> &[Value] {
        self.values.get(index..).unwrap_or(&[])
    }

    #[inline]
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
