//! Class registry
//!
//! Object definitions name their class by string. The [`ClassRegistry`] maps
//! those names to [`ClassMeta`]: the constructor signature and factory, the
//! property setters and the methods injection may call. A class *exists*
//! when it is registered and is *instantiable* when it has a constructor
//! (interfaces and abstract classes are registered without one).
//!
//! # Example
//!
//! ```rust
//! use autowire_di::{ClassBuilder, ClassRegistry, Parameter, ScalarType, Value};
//!
//! struct Connection {
//!     host: String,
//!     timeout: i64,
//! }
//!
//! let registry = ClassRegistry::new();
//! registry.register(
//!     ClassBuilder::<Connection>::new("App\\Connection")
//!         .constructor(vec![Parameter::new("host").scalar(ScalarType::String)], |args| {
//!             Ok(Connection { host: args.string(0)?, timeout: 30 })
//!         })
//!         .property("timeout", |c: &mut Connection, v: Value| {
//!             c.timeout = v.as_int().unwrap_or(30);
//!             Ok(())
//!         })
//!         .build(),
//! );
//!
//! assert!(registry.is_instantiable("App\\Connection"));
//! ```

use crate::signature::{Parameter, Signature};
use crate::value::{AnyObject, Arguments, Function, ObjectRef};
use crate::{DiError, Result, Value};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Name of the method that makes an object callable
pub const INVOKE_METHOD: &str = "invoke";

type ConstructorFn = dyn Fn(Arguments) -> Result<AnyObject> + Send + Sync;
type PropertySetter = dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync;
type MethodFn = dyn Fn(&mut (dyn Any + Send + Sync), Arguments) -> Result<Value> + Send + Sync;

/// Existence facts about a class name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassFacts {
    pub exists: bool,
    pub instantiable: bool,
}

/// Constructor of a registered class
#[derive(Clone)]
pub struct Constructor {
    signature: Signature,
    build: Arc<ConstructorFn>,
}

impl Constructor {
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Injectable property
#[derive(Clone)]
pub struct Property {
    declaring_class: String,
    name: String,
    setter: Arc<PropertySetter>,
}

impl Property {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    /// Assign `value` on `object`
    pub fn set(&self, object: &ObjectRef, value: Value) -> Result<()> {
        let mut guard = object.write_any()?;
        (self.setter)(&mut **guard, value)
    }
}

/// Instance method
#[derive(Clone)]
pub struct Method {
    signature: Signature,
    body: Arc<MethodFn>,
    autocall: bool,
}

impl Method {
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether the container calls this method on autowired objects
    #[inline]
    pub fn is_autocall(&self) -> bool {
        self.autocall
    }

    /// Run the method against `object`
    pub fn invoke(&self, object: &ObjectRef, args: Arguments) -> Result<Value> {
        let mut guard = object.write_any()?;
        (self.body)(&mut **guard, args)
    }
}

/// Metadata for one registered class
#[derive(Clone)]
pub struct ClassMeta {
    name: String,
    parents: Vec<String>,
    constructor: Option<Constructor>,
    properties: Vec<Property>,
    methods: Vec<(String, Method)>,
    static_methods: HashMap<String, Function>,
}

impl ClassMeta {
    /// Metadata for an interface or abstract class: exists, never instantiable
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            constructor: None,
            properties: Vec::new(),
            methods: Vec::new(),
            static_methods: HashMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parent classes and interfaces
    #[inline]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    #[inline]
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.constructor.is_some()
    }

    /// Build a new instance from positional arguments
    pub fn instantiate(&self, args: Arguments) -> Result<ObjectRef> {
        let constructor = self.constructor.as_ref().ok_or_else(|| {
            DiError::invalid_definition(&self.name, format!("{} is not instantiable", self.name))
        })?;
        let object = (constructor.build)(args)?;
        Ok(ObjectRef::from_boxed(self.name.clone(), object))
    }

    /// Find a property, optionally restricted to the class that declared it.
    ///
    /// Without a qualifier a property declared by the class itself wins over
    /// one it re-declares for an ancestor.
    pub fn property(&self, name: &str, declaring_class: Option<&str>) -> Option<&Property> {
        match declaring_class {
            Some(declaring) => self
                .properties
                .iter()
                .find(|p| p.name == name && p.declaring_class == declaring),
            None => self
                .properties
                .iter()
                .find(|p| p.name == name && p.declaring_class == self.name)
                .or_else(|| self.properties.iter().find(|p| p.name == name)),
        }
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// Methods flagged for automatic invocation, in declaration order
    pub fn autocall_methods(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.methods
            .iter()
            .filter(|(_, m)| m.autocall)
            .map(|(n, m)| (n.as_str(), m))
    }

    pub fn static_method(&self, name: &str) -> Option<&Function> {
        self.static_methods.get(name)
    }
}

impl std::fmt::Debug for ClassMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMeta")
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("instantiable", &self.is_instantiable())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Typed builder for [`ClassMeta`].
///
/// Setters and methods receive `&mut T`; the builder erases the type and
/// checks the downcast when they run.
pub struct ClassBuilder<T> {
    meta: ClassMeta,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: ClassMeta::interface(name),
            _marker: PhantomData,
        }
    }

    /// Declare a parent class
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.meta.parents.push(parent.into());
        self
    }

    /// Declare an implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.meta.parents.push(interface.into());
        self
    }

    pub fn constructor<F>(mut self, parameters: Vec<Parameter>, build: F) -> Self
    where
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        let signature = Signature::new(format!("{}::__construct", self.meta.name), parameters);
        self.meta.constructor = Some(Constructor {
            signature,
            build: Arc::new(move |args: Arguments| Ok(Box::new(build(args)?) as AnyObject)),
        });
        self
    }

    /// Property declared by this class
    pub fn property<F>(self, name: impl Into<String>, set: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let declaring = self.meta.name.clone();
        self.property_of(declaring, name, set)
    }

    /// Property declared by `declaring_class` (an ancestor shadowed by this class)
    pub fn property_of<F>(
        mut self,
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        set: F,
    ) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let class = self.meta.name.clone();
        self.meta.properties.push(Property {
            declaring_class: declaring_class.into(),
            name: name.into(),
            setter: Arc::new(move |object: &mut (dyn Any + Send + Sync), value: Value| {
                let target = object
                    .downcast_mut::<T>()
                    .ok_or_else(|| DiError::wrong_type(class.clone(), std::any::type_name::<T>()))?;
                set(target, value)
            }),
        });
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, parameters: Vec<Parameter>, body: F) -> Self
    where
        F: Fn(&mut T, Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let class = self.meta.name.clone();
        let signature = Signature::new(format!("{class}::{name}"), parameters);
        self.meta.methods.push((
            name,
            Method {
                signature,
                body: Arc::new(move |object: &mut (dyn Any + Send + Sync), args: Arguments| {
                    let target = object.downcast_mut::<T>().ok_or_else(|| {
                        DiError::wrong_type(class.clone(), std::any::type_name::<T>())
                    })?;
                    body(target, args)
                }),
                autocall: false,
            },
        ));
        self
    }

    /// Flag an already declared method for automatic invocation
    pub fn autocall(mut self, method: &str) -> Self {
        if let Some((_, m)) = self.meta.methods.iter_mut().find(|(n, _)| n == method) {
            m.autocall = true;
        }
        self
    }

    pub fn static_method<F>(mut self, name: impl Into<String>, parameters: Vec<Parameter>, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let signature = Signature::new(format!("{}::{}", self.meta.name, name), parameters);
        self.meta
            .static_methods
            .insert(name, Function::new(signature, body));
        self
    }

    #[inline]
    pub fn build(self) -> ClassMeta {
        self.meta
    }
}

/// Registry of known classes, keyed by class name.
pub struct ClassRegistry {
    classes: DashMap<String, Arc<ClassMeta>, RandomState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register (or replace) a class
    pub fn register(&self, meta: ClassMeta) {
        #[cfg(feature = "logging")]
        tracing::trace!(
            target: "autowire_di",
            class = meta.name(),
            instantiable = meta.is_instantiable(),
            "Registering class"
        );

        self.classes.insert(meta.name.clone(), Arc::new(meta));
    }

    /// Register an interface with its parent interfaces
    pub fn register_interface(&self, name: impl Into<String>, parents: &[&str]) {
        let mut meta = ClassMeta::interface(name);
        meta.parents = parents.iter().map(|p| p.to_string()).collect();
        self.register(meta);
    }

    pub fn class(&self, name: &str) -> Option<Arc<ClassMeta>> {
        self.classes.get(name).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_instantiable(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .map(|entry| entry.is_instantiable())
            .unwrap_or(false)
    }

    pub fn facts(&self, name: &str) -> ClassFacts {
        match self.classes.get(name) {
            Some(entry) => ClassFacts {
                exists: true,
                instantiable: entry.is_instantiable(),
            },
            None => ClassFacts::default(),
        }
    }

    /// Whether `class` is `ancestor` or inherits from it (transitively)
    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        let mut pending = vec![class.to_string()];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            if let Some(meta) = self.class(&current) {
                pending.extend(meta.parents.iter().cloned());
            }
            seen.push(current);
        }
        false
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer {
        transport: String,
        sent: Vec<String>,
    }

    fn mailer_class() -> ClassMeta {
        ClassBuilder::<Mailer>::new("App\\Mailer")
            .implements("App\\MailerInterface")
            .constructor(vec![Parameter::new("transport")], |args| {
                Ok(Mailer {
                    transport: args.string(0)?,
                    sent: Vec::new(),
                })
            })
            .property("transport", |m: &mut Mailer, v| {
                m.transport = v.as_str().unwrap_or_default().to_string();
                Ok(())
            })
            .method("send", vec![Parameter::new("to")], |m: &mut Mailer, args| {
                m.sent.push(args.string(0)?);
                Ok(Value::Int(m.sent.len() as i64))
            })
            .autocall("send")
            .build()
    }

    #[test]
    fn test_instantiate_and_inject() {
        let registry = ClassRegistry::new();
        registry.register(mailer_class());

        let meta = registry.class("App\\Mailer").unwrap();
        let object = meta
            .instantiate(Arguments::new(vec![Value::from("smtp")]))
            .unwrap();
        assert_eq!(object.class(), "App\\Mailer");

        meta.property("transport", None)
            .unwrap()
            .set(&object, Value::from("sendmail"))
            .unwrap();
        let count = meta
            .method("send")
            .unwrap()
            .invoke(&object, Arguments::new(vec![Value::from("a@b.c")]))
            .unwrap();

        assert_eq!(count, Value::Int(1));
        assert_eq!(
            object.read::<Mailer, _>(|m| m.transport.clone()).unwrap(),
            "sendmail"
        );
        assert_eq!(meta.autocall_methods().count(), 1);
    }

    #[test]
    fn test_interfaces_are_not_instantiable() {
        let registry = ClassRegistry::new();
        registry.register_interface("App\\MailerInterface", &[]);
        registry.register(mailer_class());

        assert_eq!(
            registry.facts("App\\MailerInterface"),
            ClassFacts {
                exists: true,
                instantiable: false
            }
        );
        assert_eq!(registry.facts("App\\Missing"), ClassFacts::default());
        assert!(registry.is_a("App\\Mailer", "App\\MailerInterface"));
        assert!(!registry.is_a("App\\MailerInterface", "App\\Mailer"));
    }

    #[test]
    fn test_shadowed_property_lookup() {
        #[allow(dead_code)]
        struct Child {
            own: i64,
            inherited: i64,
        }

        let meta = ClassBuilder::<Child>::new("Child")
            .extends("Parent")
            .property_of("Parent", "id", |c: &mut Child, v| {
                c.inherited = v.as_int().unwrap_or_default();
                Ok(())
            })
            .property("id", |c: &mut Child, v| {
                c.own = v.as_int().unwrap_or_default();
                Ok(())
            })
            .build();

        assert_eq!(meta.property("id", None).unwrap().declaring_class(), "Child");
        assert_eq!(
            meta.property("id", Some("Parent")).unwrap().declaring_class(),
            "Parent"
        );
        assert!(meta.property("id", Some("Other")).is_none());
    }
}
