//! Definition resolution
//!
//! [`DefinitionResolver`] turns a [`Definition`] into a [`Value`]. It matches
//! on the definition shape and hands objects, arrays and factories to the
//! dedicated submodules.
//!
//! Each named entry being resolved on the current thread is tracked on a
//! resolution stack; meeting an entry that is already on the stack fails with
//! [`DiError::CircularDependency`] instead of recursing forever.

mod array;
mod factory;
mod object;

use crate::class::ClassRegistry;
use crate::container::ServiceLocator;
use crate::definition::{Argument, Definition, EnvironmentVariableDefinition, StringDefinition};
use crate::invoker::{Parameters, ResolverChain};
use crate::{DiError, Result, Value};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Reads an environment variable
pub type EnvReader = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

// =============================================================================
// Resolution stack
// =============================================================================

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Keeps an entry on the resolution stack for as long as it lives.
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(entry: &str) -> Result<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|e| e == entry) {
                let mut path = stack.join(" -> ");
                path.push_str(" -> ");
                path.push_str(entry);

                #[cfg(feature = "logging")]
                debug!(target: "autowire_di", path = %path, "Circular dependency detected");

                return Err(DiError::CircularDependency { path });
            }
            stack.push(entry.to_string());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves definitions to values.
///
/// Cloning is cheap; clones share the class registry and the parameter chain.
#[derive(Clone)]
pub struct DefinitionResolver {
    registry: Arc<ClassRegistry>,
    chain: Arc<ResolverChain>,
    env: EnvReader,
    lazy_proxies: bool,
}

impl DefinitionResolver {
    /// Resolver reading the process environment, with the default parameter chain
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            chain: Arc::new(ResolverChain::default()),
            env: Arc::new(|name| std::env::var(name).ok()),
            lazy_proxies: true,
        }
    }

    /// Replace how environment variables are read
    pub fn with_env_reader(mut self, env: EnvReader) -> Self {
        self.env = env;
        self
    }

    /// Replace the parameter resolution chain
    pub fn with_parameter_chain(mut self, chain: ResolverChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    /// When disabled, lazy object definitions are built eagerly
    pub fn with_lazy_proxies(mut self, enabled: bool) -> Self {
        self.lazy_proxies = enabled;
        self
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    #[inline]
    pub fn parameters(&self) -> &ResolverChain {
        &self.chain
    }

    #[inline]
    pub(crate) fn lazy_proxies(&self) -> bool {
        self.lazy_proxies
    }

    /// Resolve a definition
    pub fn resolve(&self, definition: &Definition, locator: &dyn ServiceLocator) -> Result<Value> {
        self.resolve_with(definition, locator, &Parameters::new())
    }

    /// Resolve a definition, overriding explicit constructor or factory parameters
    pub fn resolve_with(
        &self,
        definition: &Definition,
        locator: &dyn ServiceLocator,
        parameters: &Parameters,
    ) -> Result<Value> {
        let name = definition.name();
        let _guard = if name.is_empty() {
            None
        } else {
            Some(ResolutionGuard::enter(name).map_err(|e| DiError::dependency(name, e))?)
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire_di",
            entry = name,
            kind = definition.variant(),
            "Resolving definition"
        );

        self.dispatch(definition, locator, parameters)
    }

    /// Resolve without touching the resolution stack.
    ///
    /// Used for the predecessor of an extension, which shares its entry name.
    pub(crate) fn dispatch(
        &self,
        definition: &Definition,
        locator: &dyn ServiceLocator,
        parameters: &Parameters,
    ) -> Result<Value> {
        let name = definition.name();
        match definition {
            Definition::Value(d) => Ok(d.value().clone()),
            Definition::Reference(d) => locator.get(d.target()),
            Definition::EnvironmentVariable(d) => self.resolve_env(name, d, locator),
            Definition::String(d) => self.resolve_string(name, d, locator),
            Definition::Array(d) => array::resolve_array(self, name, d, locator),
            Definition::ArrayExtension(d) => array::resolve_extension(self, name, d, locator),
            Definition::Object(d) => object::resolve_object(self, d, locator, parameters),
            Definition::Factory(d) => factory::resolve_factory(self, name, d, locator, parameters),
            Definition::Decorator(d) => factory::resolve_decorator(self, name, d, locator, parameters),
            Definition::Instance(d) => object::resolve_instance(self, d, locator),
        }
    }

    /// Resolve a literal or nested definition
    pub fn resolve_argument(&self, argument: &Argument, locator: &dyn ServiceLocator) -> Result<Value> {
        match argument {
            Argument::Value(value) => Ok(value.clone()),
            Argument::Definition(definition) => self.resolve(definition, locator),
        }
    }

    /// Whether resolving `definition` can succeed as far as can be told without running it
    pub fn is_resolvable(&self, definition: &Definition) -> bool {
        match definition {
            Definition::Object(d) => d.class_facts(&self.registry).instantiable,
            Definition::Decorator(d) => d.decorated().is_some(),
            _ => true,
        }
    }

    fn resolve_env(
        &self,
        entry: &str,
        definition: &EnvironmentVariableDefinition,
        locator: &dyn ServiceLocator,
    ) -> Result<Value> {
        match (self.env)(definition.variable()) {
            Some(value) => Ok(Value::Str(value)),
            None if definition.is_optional() => {
                self.resolve_argument(definition.default_value(), locator)
            }
            None => Err(DiError::dependency(
                if entry.is_empty() { definition.variable() } else { entry },
                DiError::EnvironmentVariableNotDefined {
                    variable: definition.variable().to_string(),
                },
            )),
        }
    }

    fn resolve_string(
        &self,
        entry: &str,
        definition: &StringDefinition,
        locator: &dyn ServiceLocator,
    ) -> Result<Value> {
        let template = definition.template();
        let entry = if entry.is_empty() { template } else { entry };
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = match after.find('}') {
                Some(close) if close > 0 && !after[..close].contains('{') => close,
                _ => {
                    output.push('{');
                    rest = after;
                    continue;
                }
            };

            let placeholder = &after[..close];
            let value = locator
                .get(placeholder)
                .map_err(|e| DiError::dependency(entry, e))?;
            let text = value.to_template_string().ok_or_else(|| {
                DiError::dependency(
                    entry,
                    DiError::wrong_type(
                        format!("a value convertible to string for '{placeholder}'"),
                        value.type_name(),
                    ),
                )
            })?;
            output.push_str(&text);
            rest = &after[close + 1..];
        }
        output.push_str(rest);

        Ok(Value::Str(output))
    }
}

impl fmt::Debug for DefinitionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionResolver")
            .field("classes", &self.registry.len())
            .field("chain", &self.chain)
            .field("lazy_proxies", &self.lazy_proxies)
            .finish()
    }
}
