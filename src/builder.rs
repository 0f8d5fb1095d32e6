//! Container configuration
//!
//! # Example
//!
//! ```rust
//! use autowire_di::{ContainerBuilder, DefinitionArray};
//! use autowire_di::helpers::{add, array, value};
//!
//! let defaults = DefinitionArray::from_definitions([
//!     ("log.level", value("info")),
//!     ("plugins", array(vec![1.into(), 2.into()])),
//! ])
//! .unwrap();
//! let overrides = DefinitionArray::from_definitions([
//!     ("plugins", add(vec![3.into(), 4.into()])),
//! ])
//! .unwrap();
//!
//! let container = ContainerBuilder::new()
//!     .add_definitions(defaults)
//!     .add_definitions(overrides)
//!     .build()
//!     .unwrap();
//!
//! let plugins = container.get("plugins").unwrap();
//! assert_eq!(plugins.as_array().map(|p| p.len()), Some(4));
//! ```

use crate::class::ClassRegistry;
use crate::container::Container;
use crate::invoker::ResolverChain;
use crate::resolver::{DefinitionResolver, EnvReader};
use crate::source::{Autowiring, DefinitionArray, DefinitionSource};
use crate::Result;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Builds a [`Container`].
///
/// Sources added later take priority over sources added earlier; an array
/// extension or decorator in a later source extends the definition of the
/// same name in an earlier one.
pub struct ContainerBuilder {
    registry: Arc<ClassRegistry>,
    sources: Vec<Arc<dyn DefinitionSource>>,
    autowiring: bool,
    lazy_proxies: bool,
    env: Option<EnvReader>,
    chain: Option<ResolverChain>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ClassRegistry::new()),
            sources: Vec::new(),
            autowiring: true,
            lazy_proxies: true,
            env: None,
            chain: None,
        }
    }

    /// Classes available to object definitions and autowiring
    pub fn with_registry(mut self, registry: Arc<ClassRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn add_definitions(self, definitions: DefinitionArray) -> Self {
        self.add_source(Arc::new(definitions))
    }

    /// Add a custom source with higher priority than those added before it
    pub fn add_source(mut self, source: Arc<dyn DefinitionSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Build objects for registered classes that have no definition (default: on)
    pub fn use_autowiring(mut self, enabled: bool) -> Self {
        self.autowiring = enabled;
        self
    }

    /// Hand out proxies for lazy object definitions (default: on)
    pub fn use_lazy_proxies(mut self, enabled: bool) -> Self {
        self.lazy_proxies = enabled;
        self
    }

    /// Read environment variables through `reader` instead of the process environment
    pub fn env_reader<F>(mut self, reader: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Some(Arc::new(reader));
        self
    }

    /// Replace the default parameter resolution chain
    pub fn parameter_chain(mut self, chain: ResolverChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Build the container and link every enumerable definition.
    ///
    /// Fails if an extension cannot be linked to its predecessor.
    pub fn build(self) -> Result<Container> {
        let mut resolver =
            DefinitionResolver::new(self.registry.clone()).with_lazy_proxies(self.lazy_proxies);
        if let Some(env) = self.env {
            resolver = resolver.with_env_reader(env);
        }
        if let Some(chain) = self.chain {
            resolver = resolver.with_parameter_chain(chain);
        }

        let definitions = Arc::new(DefinitionArray::new());
        let mut sources: Vec<Arc<dyn DefinitionSource>> = vec![definitions.clone()];
        sources.extend(self.sources.into_iter().rev());
        if self.autowiring {
            sources.push(Arc::new(Autowiring::new(self.registry.clone())));
        }

        let container = Container::from_parts(definitions, sources, resolver);

        let names = container.known_entry_names();
        for name in &names {
            container.definition(name)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            definitions = names.len(),
            autowiring = self.autowiring,
            lazy_proxies = self.lazy_proxies,
            "Container built"
        );

        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::definition::helpers::{add, create, env, value};
    use crate::{DiError, Value};

    struct Service;

    #[test]
    fn test_later_source_wins() {
        let container = ContainerBuilder::new()
            .add_definitions(DefinitionArray::from_definitions([("a", value(1))]).unwrap())
            .add_definitions(DefinitionArray::from_definitions([("a", value(2))]).unwrap())
            .build()
            .unwrap();

        assert_eq!(container.get("a").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_build_fails_on_bad_extension() {
        let result = ContainerBuilder::new()
            .add_definitions(DefinitionArray::from_definitions([("a", value(1))]).unwrap())
            .add_definitions(DefinitionArray::from_definitions([("a", add(vec![2.into()]))]).unwrap())
            .build();

        assert!(matches!(result, Err(DiError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_autowiring_can_be_disabled() {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<Service>::new("Service")
                .constructor(vec![], |_| Ok(Service))
                .build(),
        );
        let registry = Arc::new(registry);

        let autowired = ContainerBuilder::new()
            .with_registry(registry.clone())
            .build()
            .unwrap();
        assert!(autowired.has("Service"));

        let explicit = ContainerBuilder::new()
            .with_registry(registry)
            .use_autowiring(false)
            .build()
            .unwrap();
        assert!(!explicit.has("Service"));
    }

    #[test]
    fn test_lazy_proxies_can_be_disabled() {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<Service>::new("Service")
                .constructor(vec![], |_| Ok(Service))
                .build(),
        );

        let container = ContainerBuilder::new()
            .with_registry(Arc::new(registry))
            .add_definitions(DefinitionArray::from_definitions([("Service", create(None).lazy())]).unwrap())
            .use_lazy_proxies(false)
            .build()
            .unwrap();

        let service = container.get("Service").unwrap();
        assert!(!service.as_object().unwrap().is_lazy());
    }

    #[test]
    fn test_env_reader_override() {
        let container = ContainerBuilder::new()
            .add_definitions(DefinitionArray::from_definitions([("home", env("HOME_DIR"))]).unwrap())
            .env_reader(|name| (name == "HOME_DIR").then(|| "/srv".to_string()))
            .build()
            .unwrap();

        assert_eq!(container.get("home").unwrap(), Value::from("/srv"));
    }
}
