//! Definition-driven container
//!
//! The `Container` looks up entry names in its definition sources, resolves
//! the definition and keeps the result: every later `get` of the same name
//! returns the same value. `make` resolves a fresh value every time, and
//! `call` invokes callables with parameters guessed from the container.

use crate::class::ClassRegistry;
use crate::definition::{Definition, InstanceDefinition, ObjectDefinition};
use crate::invoker::{CallableRef, Invoker, Parameters};
use crate::resolver::DefinitionResolver;
use crate::source::{Autowiring, DefinitionArray, DefinitionSource, SourceChain};
use crate::storage::EntryStorage;
use crate::{DiError, ObjectRef, Result, Value};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Read access to container entries.
///
/// This is the view definitions and the parameter chain have of the
/// container while resolving.
pub trait ServiceLocator: Send + Sync {
    /// Whether `name` can be provided
    fn has(&self, name: &str) -> bool;

    /// Value of the entry `name`
    fn get(&self, name: &str) -> Result<Value>;

    /// Owned handle on this locator, for container injection
    fn handle(&self) -> Option<Arc<dyn ServiceLocator>> {
        None
    }

    /// Handle that does not keep this locator alive.
    ///
    /// Lazy proxies hold this one: the locator may store the proxy itself.
    fn weak_handle(&self) -> Option<Arc<dyn WeakLocator>> {
        None
    }
}

/// Non-owning handle on a [`ServiceLocator`]
pub trait WeakLocator: Send + Sync {
    /// The locator, if it is still alive
    fn upgrade(&self) -> Option<Arc<dyn ServiceLocator>>;
}

/// Dependency injection container with named entries.
///
/// Cloning is cheap and clones share everything: resolved entries,
/// definitions and the lock state.
///
/// # Examples
///
/// ```rust
/// use autowire_di::Container;
/// use autowire_di::helpers::{get, string, value};
///
/// let container = Container::new();
/// container.set("db.host", value("localhost")).unwrap();
/// container.set("db.url", string("postgres://{db.host}/app")).unwrap();
/// container.set("database", get("db.url")).unwrap();
///
/// let url = container.get("database").unwrap();
/// assert_eq!(url.as_str(), Some("postgres://localhost/app"));
/// ```
#[derive(Clone)]
pub struct Container {
    /// Resolved entries (lock-free)
    storage: Arc<EntryStorage>,
    /// Definitions added at runtime; highest priority source
    definitions: Arc<DefinitionArray>,
    /// All sources, highest priority first
    sources: Arc<SourceChain>,
    /// Linked definitions already fetched from the sources
    fetched: Arc<DashMap<String, Definition, RandomState>>,
    resolver: DefinitionResolver,
    /// Lock state - uses AtomicBool for fast lock checking (no contention)
    locked: Arc<AtomicBool>,
}

impl Container {
    /// Create a container with an empty class registry and autowiring enabled.
    #[inline]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ClassRegistry::new()))
    }

    /// Create a container that autowires classes from `registry`.
    pub fn with_registry(registry: Arc<ClassRegistry>) -> Self {
        let definitions = Arc::new(DefinitionArray::new());
        let sources: Vec<Arc<dyn DefinitionSource>> = vec![
            definitions.clone(),
            Arc::new(Autowiring::new(registry.clone())),
        ];
        Self::from_parts(definitions, sources, DefinitionResolver::new(registry))
    }

    /// `sources` must start with `definitions` and be ordered highest priority first
    pub(crate) fn from_parts(
        definitions: Arc<DefinitionArray>,
        sources: Vec<Arc<dyn DefinitionSource>>,
        resolver: DefinitionResolver,
    ) -> Self {
        let sources = SourceChain::new(sources);
        let capacity = sources.definition_names().len();

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            sources = sources.len(),
            definitions = capacity,
            classes = resolver.registry().len(),
            "Creating new DI container"
        );

        Self {
            storage: Arc::new(EntryStorage::with_capacity(capacity)),
            definitions,
            sources: Arc::new(sources),
            fetched: Arc::new(DashMap::with_hasher(RandomState::new())),
            resolver,
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Value of the entry `name`, resolving its definition on first access.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use autowire_di::{Container, Value};
    ///
    /// let container = Container::new();
    /// container.set_value("answer", 42).unwrap();
    /// assert_eq!(container.get("answer").unwrap(), Value::Int(42));
    /// assert!(container.get("question").is_err());
    /// ```
    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.storage.get(name) {
            #[cfg(feature = "logging")]
            trace!(target: "autowire_di", entry = name, location = "resolved", "Entry served from resolved entries");
            return Ok(value);
        }

        let definition = self.definition(name)?.ok_or_else(|| {
            #[cfg(feature = "logging")]
            debug!(target: "autowire_di", entry = name, "No entry or class found");
            DiError::not_found(name)
        })?;

        let value = self.resolver.resolve(&definition, self)?;
        self.storage.insert(name, value.clone());

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            entry = name,
            kind = definition.variant(),
            resolved_entries = self.storage.len(),
            "Entry resolved"
        );

        Ok(value)
    }

    /// Build a fresh value for `name`, never cached.
    ///
    /// `parameters` override the constructor or factory parameters of the definition.
    pub fn make(&self, name: &str, parameters: &Parameters) -> Result<Value> {
        let definition = self
            .definition(name)?
            .ok_or_else(|| DiError::not_found(name))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire_di",
            entry = name,
            overrides = parameters.len(),
            "Making new instance"
        );

        self.resolver.resolve_with(&definition, self, parameters)
    }

    /// Whether `get(name)` can succeed as far as can be told without resolving
    pub fn has(&self, name: &str) -> bool {
        if self.storage.contains(name) {
            return true;
        }
        match self.definition(name) {
            Ok(Some(definition)) => self.resolver.is_resolvable(&definition),
            _ => false,
        }
    }

    /// Call a function, method or invokable object.
    ///
    /// `parameters` are explicit values by position or name; the rest are
    /// guessed from the container or taken from defaults.
    pub fn call(&self, callable: impl Into<CallableRef>, parameters: &Parameters) -> Result<Value> {
        Invoker::new(self.resolver.clone()).call(self, callable, parameters)
    }

    /// Apply property and method injections to an object built elsewhere.
    ///
    /// Uses the object definition of its class if there is one, otherwise
    /// the class metadata alone (autocall methods only).
    pub fn inject_on(&self, object: &ObjectRef) -> Result<ObjectRef> {
        let class = object.class();
        let template = match self.definition(class)? {
            Some(Definition::Object(definition)) => definition,
            _ => {
                let mut definition = ObjectDefinition::new(Some(class.to_string()));
                definition.set_autowired(true);
                definition
            }
        };

        #[cfg(feature = "logging")]
        debug!(target: "autowire_di", class, "Injecting on existing instance");

        let definition = Definition::Instance(InstanceDefinition::new(object.clone(), template));
        self.resolver.resolve(&definition, self)?;
        Ok(object.clone())
    }

    /// Linked definition for `name`, fetched from the sources once
    pub(crate) fn definition(&self, name: &str) -> Result<Option<Definition>> {
        if let Some(definition) = self.fetched.get(name) {
            return Ok(Some(definition.clone()));
        }
        let definition = self.sources.get_definition(name)?;
        if let Some(definition) = &definition {
            self.fetched.insert(name.to_string(), definition.clone());
        }
        Ok(definition)
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Define (or redefine) the entry `name`.
    ///
    /// Forgets the resolved value of `name` and every fetched definition, so
    /// extensions are relinked on next access.
    pub fn set(&self, name: impl Into<String>, definition: impl Into<Definition>) -> Result<()> {
        self.check_not_locked()?;
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(target: "autowire_di", entry = %name, "Setting definition");

        self.definitions.add(name.clone(), definition)?;
        self.storage.remove(&name);
        self.fetched.clear();
        Ok(())
    }

    /// Store an already resolved value under `name`.
    pub fn set_value(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.check_not_locked()?;
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(target: "autowire_di", entry = %name, "Setting resolved value");

        self.storage.insert(name, value.into());
        Ok(())
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Names of resolved entries and enumerable definitions, sorted
    pub fn known_entry_names(&self) -> Vec<String> {
        let mut names = self.sources.definition_names();
        names.extend(self.storage.names());
        names.sort();
        names.dedup();
        names
    }

    /// Number of resolved entries
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        self.resolver.registry()
    }

    #[inline]
    pub fn resolver(&self) -> &DefinitionResolver {
        &self.resolver
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Lock the container to prevent further definitions and values.
    #[inline]
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            resolved_entries = self.storage.len(),
            "Container locked - no further definitions allowed"
        );
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Forget every resolved entry; definitions are kept.
    #[inline]
    pub fn clear(&self) {
        let count = self.storage.len();
        self.storage.clear();

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            entries_removed = count,
            "Container cleared - resolved entries removed"
        );
        #[cfg(not(feature = "logging"))]
        let _ = count;
    }

    #[inline]
    fn check_not_locked(&self) -> Result<()> {
        if self.locked.load(Ordering::Relaxed) {
            return Err(DiError::Locked);
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLocator for Container {
    #[inline]
    fn has(&self, name: &str) -> bool {
        Container::has(self, name)
    }

    #[inline]
    fn get(&self, name: &str) -> Result<Value> {
        Container::get(self, name)
    }

    fn handle(&self) -> Option<Arc<dyn ServiceLocator>> {
        Some(Arc::new(self.clone()))
    }

    fn weak_handle(&self) -> Option<Arc<dyn WeakLocator>> {
        Some(Arc::new(WeakContainer {
            storage: Arc::downgrade(&self.storage),
            definitions: Arc::downgrade(&self.definitions),
            sources: Arc::downgrade(&self.sources),
            fetched: Arc::downgrade(&self.fetched),
            resolver: self.resolver.clone(),
            locked: Arc::downgrade(&self.locked),
        }))
    }
}

/// A [`Container`] whose shared state is only weakly held
struct WeakContainer {
    storage: Weak<EntryStorage>,
    definitions: Weak<DefinitionArray>,
    sources: Weak<SourceChain>,
    fetched: Weak<DashMap<String, Definition, RandomState>>,
    resolver: DefinitionResolver,
    locked: Weak<AtomicBool>,
}

impl WeakLocator for WeakContainer {
    fn upgrade(&self) -> Option<Arc<dyn ServiceLocator>> {
        let container = Container {
            storage: self.storage.upgrade()?,
            definitions: self.definitions.upgrade()?,
            sources: self.sources.upgrade()?,
            fetched: self.fetched.upgrade()?,
            resolver: self.resolver.clone(),
            locked: self.locked.upgrade()?,
        };
        Some(Arc::new(container))
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("resolved", &self.storage.len())
            .field("definitions", &self.definitions.len())
            .field("sources", &self.sources.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::definition::helpers::{autowire, create, get, value};
    use crate::signature::Parameter;
    use crate::{Function, Signature};
    use std::sync::atomic::AtomicU32;

    #[derive(Clone)]
    struct TestService {
        value: String,
    }

    #[allow(dead_code)]
    struct Consumer {
        service: ObjectRef,
        started: bool,
    }

    fn registry() -> Arc<ClassRegistry> {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<TestService>::new("TestService")
                .constructor(vec![Parameter::new("value").default_value("default")], |args| {
                    Ok(TestService {
                        value: args.string(0)?,
                    })
                })
                .method("value", vec![], |s: &mut TestService, _| {
                    Ok(Value::from(s.value.clone()))
                })
                .build(),
        );
        registry.register(
            ClassBuilder::<Consumer>::new("Consumer")
                .constructor(vec![Parameter::new("service").class("TestService")], |args| {
                    Ok(Consumer {
                        service: args.object(0)?,
                        started: false,
                    })
                })
                .method("start", vec![], |c: &mut Consumer, _| {
                    c.started = true;
                    Ok(Value::Null)
                })
                .autocall("start")
                .build(),
        );
        Arc::new(registry)
    }

    #[test]
    fn test_get_caches() {
        let container = Container::with_registry(registry());

        let s1 = container.get("TestService").unwrap();
        let s2 = container.get("TestService").unwrap();

        assert_eq!(s1, s2);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_make_builds_fresh_instances() {
        let container = Container::with_registry(registry());

        let shared = container.get("TestService").unwrap();
        let made = container
            .make("TestService", &Parameters::new().with("value", "made"))
            .unwrap();

        assert_ne!(shared, made);
        let object = made.as_object().unwrap();
        assert_eq!(object.read::<TestService, _>(|s| s.value.clone()).unwrap(), "made");
    }

    #[test]
    fn test_autowired_dependency_and_autocall() {
        let container = Container::with_registry(registry());

        let consumer = container.get("Consumer").unwrap();
        let service = container.get("TestService").unwrap();
        let object = consumer.as_object().unwrap();

        assert!(object.read::<Consumer, _>(|c| c.started).unwrap());
        let injected = object.read::<Consumer, _>(|c| c.service.clone()).unwrap();
        assert_eq!(Value::Object(injected), service);
    }

    #[test]
    fn test_not_found() {
        let container = Container::new();
        let result = container.get("missing");
        assert!(matches!(result, Err(DiError::NotFound { .. })));
        assert!(!container.has("missing"));
    }

    #[test]
    fn test_has_checks_instantiability() {
        let registry = registry();
        registry.register_interface("Contract", &[]);
        let container = Container::with_registry(registry);

        assert!(container.has("TestService"));
        assert!(!container.has("Contract"));
        assert!(matches!(
            container.get("Contract"),
            Err(DiError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_set_replaces_resolved_value() {
        let container = Container::new();
        container.set("greeting", value("hello")).unwrap();
        assert_eq!(container.get("greeting").unwrap(), Value::from("hello"));

        container.set("greeting", value("bye")).unwrap();
        assert_eq!(container.get("greeting").unwrap(), Value::from("bye"));
    }

    #[test]
    fn test_lock() {
        let container = Container::new();
        assert!(!container.is_locked());

        container.lock();
        assert!(container.is_locked());
        assert!(matches!(container.set("a", value(1)), Err(DiError::Locked)));
        assert!(matches!(container.set_value("a", 1), Err(DiError::Locked)));
    }

    #[test]
    fn test_known_entry_names() {
        let container = Container::new();
        container.set("b", value(1)).unwrap();
        container.set_value("a", 2).unwrap();
        container.set("c.*", value(3)).unwrap();

        assert_eq!(container.known_entry_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_call_with_container_parameters() {
        let container = Container::new();
        container.set_value("host", "db.local").unwrap();

        let connect = Function::new(
            Signature::new(
                "connect",
                vec![Parameter::new("host"), Parameter::new("port").default_value(5432)],
            ),
            |args| Ok(Value::from(format!("{}:{}", args.string(0)?, args.int(1)?))),
        );

        let result = container.call(connect, &Parameters::new()).unwrap();
        assert_eq!(result, Value::from("db.local:5432"));
    }

    #[test]
    fn test_call_unknown_entry_not_callable() {
        let container = Container::new();
        let err = container.call("nothing", &Parameters::new()).unwrap_err();
        assert!(matches!(err, DiError::NotCallable { .. }));
    }

    #[test]
    fn test_inject_on_existing_object() {
        let container = Container::with_registry(registry());
        container.set("TestService", create(None).constructor(vec!["unused".into()])).unwrap();
        container
            .set("Consumer", autowire(None).constructor(vec![get("TestService").into()]))
            .unwrap();

        let service = container.get("TestService").unwrap().as_object().cloned().unwrap();
        let consumer = ObjectRef::new(
            "Consumer",
            Consumer {
                service,
                started: false,
            },
        );

        let injected = container.inject_on(&consumer).unwrap();
        assert!(ObjectRef::ptr_eq(&injected, &consumer));
        assert!(consumer.read::<Consumer, _>(|c| c.started).unwrap());
    }

    #[test]
    fn test_lazy_definition_builds_on_first_use() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<TestService>::new("Expensive")
                .constructor(vec![], |_| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(TestService {
                        value: "expensive".into(),
                    })
                })
                .build(),
        );
        let container = Container::with_registry(Arc::new(registry));
        container.set("Expensive", create(None).lazy()).unwrap();

        let proxy = container.get("Expensive").unwrap();
        let object = proxy.as_object().unwrap();
        assert!(object.is_lazy());
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);

        assert_eq!(object.read::<TestService, _>(|s| s.value.clone()).unwrap(), "expensive");
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_storage_sized_from_definitions() {
        let definitions = DefinitionArray::from_definitions(
            (0..40).map(|i| (format!("entry.{i}"), value(i as i64))),
        )
        .unwrap();
        let container = crate::ContainerBuilder::new()
            .add_definitions(definitions)
            .build()
            .unwrap();

        assert_eq!(Container::new().storage.capacity(), 0);
        assert!(container.storage.capacity() > 0);
        assert_eq!(container.get("entry.7").unwrap(), Value::Int(7));
    }

    fn expensive_registry() -> Arc<ClassRegistry> {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<TestService>::new("Expensive")
                .constructor(vec![], |_| {
                    Ok(TestService {
                        value: "expensive".into(),
                    })
                })
                .build(),
        );
        Arc::new(registry)
    }

    #[test]
    fn test_lazy_proxy_does_not_keep_container_alive() {
        static DROPPED: AtomicU32 = AtomicU32::new(0);

        struct Tracked;

        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let container = Container::with_registry(expensive_registry());
            container.set_value("tracked", ObjectRef::new("Tracked", Tracked)).unwrap();
            container.set("Expensive", create(None).lazy()).unwrap();
            container.get("Expensive").unwrap();
        }

        assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_proxy_outliving_container() {
        let proxy = {
            let container = Container::with_registry(expensive_registry());
            container.set("Expensive", create(None).lazy()).unwrap();
            container.get("Expensive").unwrap().as_object().cloned().unwrap()
        };

        let err = proxy.read::<TestService, _>(|s| s.value.clone()).unwrap_err();
        assert!(matches!(err, DiError::Internal(_)));
    }
}
