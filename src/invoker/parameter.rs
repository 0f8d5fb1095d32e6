//! Parameter resolution chain
//!
//! Filling a signature runs an ordered list of [`ParameterResolver`]
//! strategies. Each strategy only fills positions that are still empty, so
//! the first strategy to provide a value for a position wins. The default
//! order is:
//!
//! 1. explicit parameters that are definitions (resolved)
//! 2. explicit parameters keyed by position
//! 3. explicit parameters keyed by name
//! 4. the declared class type, when the container has it
//! 5. the parameter name, when the container has it
//! 6. the declared default value
//!
//! Parameters pinned to an entry with [`Parameter::inject`](crate::Parameter::inject)
//! are filled before the chain runs. A required position still empty after
//! the chain fails with [`DiError::NotEnoughParameters`].

use crate::container::ServiceLocator;
use crate::definition::Argument;
use crate::resolver::DefinitionResolver;
use crate::signature::{ParameterKind, Signature};
use crate::{Arguments, DiError, Result, Value};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "logging")]
use tracing::trace;

// =============================================================================
// Explicit parameters
// =============================================================================

/// Key of an explicit parameter: a 0-based position or a parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKey {
    Index(usize),
    Name(String),
}

impl ParameterKey {
    /// Position this key designates in `signature`
    pub fn position(&self, signature: &Signature) -> Option<usize> {
        match self {
            ParameterKey::Index(index) => Some(*index),
            ParameterKey::Name(name) => signature.position_of(name),
        }
    }
}

impl From<usize> for ParameterKey {
    fn from(index: usize) -> Self {
        ParameterKey::Index(index)
    }
}

/// Negative indices become a name no parameter can have, so they never match
impl From<i32> for ParameterKey {
    fn from(index: i32) -> Self {
        match usize::try_from(index) {
            Ok(index) => ParameterKey::Index(index),
            Err(_) => ParameterKey::Name(index.to_string()),
        }
    }
}

impl From<&str> for ParameterKey {
    fn from(name: &str) -> Self {
        ParameterKey::Name(name.to_string())
    }
}

impl From<String> for ParameterKey {
    fn from(name: String) -> Self {
        ParameterKey::Name(name)
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKey::Index(index) => write!(f, "{index}"),
            ParameterKey::Name(name) => write!(f, "${name}"),
        }
    }
}

/// Explicit parameters, in insertion order. Setting a key again replaces its value.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    entries: Vec<(ParameterKey, Argument)>,
}

impl Parameters {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values keyed by their position
    pub fn positional<I, A>(values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(index, value)| (ParameterKey::Index(index), value.into()))
                .collect(),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<ParameterKey>, value: impl Into<Argument>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: ParameterKey, value: Argument) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &ParameterKey) -> Option<&Argument> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Copy every entry of `other` into `self`, replacing on conflicts
    pub fn merge(&mut self, other: &Parameters) {
        for (key, value) in &other.entries {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &Argument)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// What a strategy may consult while filling a signature.
pub struct ResolutionContext<'a> {
    resolver: &'a DefinitionResolver,
    locator: &'a dyn ServiceLocator,
    requested_entry: Option<&'a str>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(resolver: &'a DefinitionResolver, locator: &'a dyn ServiceLocator) -> Self {
        Self {
            resolver,
            locator,
            requested_entry: None,
        }
    }

    /// Name of the entry whose factory is being invoked
    pub fn with_requested_entry(mut self, entry: &'a str) -> Self {
        if !entry.is_empty() {
            self.requested_entry = Some(entry);
        }
        self
    }

    #[inline]
    pub fn resolver(&self) -> &DefinitionResolver {
        self.resolver
    }

    #[inline]
    pub fn locator(&self) -> &dyn ServiceLocator {
        self.locator
    }

    #[inline]
    pub fn requested_entry(&self) -> Option<&str> {
        self.requested_entry
    }
}

/// Positions filled so far
pub type ResolvedParameters = BTreeMap<usize, Value>;

/// One strategy of the chain.
pub trait ParameterResolver: Send + Sync {
    /// Short name, used in logs
    fn name(&self) -> &'static str;

    /// Fill positions of `signature` that are not in `resolved` yet
    fn resolve_parameters(
        &self,
        ctx: &ResolutionContext<'_>,
        signature: &Signature,
        provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()>;
}

/// Explicit parameters given as definitions.
pub struct DefinitionParameterResolver;

impl ParameterResolver for DefinitionParameterResolver {
    fn name(&self) -> &'static str {
        "definition"
    }

    fn resolve_parameters(
        &self,
        ctx: &ResolutionContext<'_>,
        signature: &Signature,
        provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (key, argument) in provided.iter() {
            let Argument::Definition(definition) = argument else {
                continue;
            };
            let Some(position) = key.position(signature) else {
                continue;
            };
            if resolved.contains_key(&position) {
                continue;
            }
            let value = ctx.resolver().resolve(definition, ctx.locator())?;
            resolved.insert(position, value);
        }
        Ok(())
    }
}

/// Explicit literal parameters keyed by position.
pub struct NumericArrayResolver;

impl ParameterResolver for NumericArrayResolver {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn resolve_parameters(
        &self,
        _ctx: &ResolutionContext<'_>,
        _signature: &Signature,
        provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (key, argument) in provided.iter() {
            if let (ParameterKey::Index(index), Argument::Value(value)) = (key, argument) {
                resolved.entry(*index).or_insert_with(|| value.clone());
            }
        }
        Ok(())
    }
}

/// Explicit literal parameters keyed by name.
pub struct AssociativeArrayResolver;

impl ParameterResolver for AssociativeArrayResolver {
    fn name(&self) -> &'static str {
        "by-name"
    }

    fn resolve_parameters(
        &self,
        _ctx: &ResolutionContext<'_>,
        signature: &Signature,
        provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (key, argument) in provided.iter() {
            if let (ParameterKey::Name(name), Argument::Value(value)) = (key, argument) {
                if let Some(position) = signature.position_of(name) {
                    resolved.entry(position).or_insert_with(|| value.clone());
                }
            }
        }
        Ok(())
    }
}

/// Declared class type looked up in the container.
///
/// Also hands the container itself and the requested entry name to
/// parameters that ask for them.
pub struct TypeHintContainerResolver;

impl ParameterResolver for TypeHintContainerResolver {
    fn name(&self) -> &'static str {
        "type-hint"
    }

    fn resolve_parameters(
        &self,
        ctx: &ResolutionContext<'_>,
        signature: &Signature,
        _provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (position, parameter) in signature.parameters().iter().enumerate() {
            if resolved.contains_key(&position) {
                continue;
            }
            match parameter.kind() {
                ParameterKind::Container => {
                    if let Some(handle) = ctx.locator().handle() {
                        resolved.insert(position, Value::Container(handle));
                    }
                }
                ParameterKind::RequestedEntry => {
                    if let Some(entry) = ctx.requested_entry() {
                        resolved.insert(position, Value::Str(entry.to_string()));
                    }
                }
                ParameterKind::Plain => {
                    if let Some(class) = parameter.class_hint() {
                        if ctx.locator().has(class) {
                            resolved.insert(position, ctx.locator().get(class)?);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parameter name looked up in the container.
pub struct ContainerNameResolver;

impl ParameterResolver for ContainerNameResolver {
    fn name(&self) -> &'static str {
        "container-name"
    }

    fn resolve_parameters(
        &self,
        ctx: &ResolutionContext<'_>,
        signature: &Signature,
        _provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (position, parameter) in signature.parameters().iter().enumerate() {
            if resolved.contains_key(&position) {
                continue;
            }
            if ctx.locator().has(parameter.name()) {
                resolved.insert(position, ctx.locator().get(parameter.name())?);
            }
        }
        Ok(())
    }
}

/// Declared default values.
pub struct DefaultValueResolver;

impl ParameterResolver for DefaultValueResolver {
    fn name(&self) -> &'static str {
        "default"
    }

    fn resolve_parameters(
        &self,
        _ctx: &ResolutionContext<'_>,
        signature: &Signature,
        _provided: &Parameters,
        resolved: &mut ResolvedParameters,
    ) -> Result<()> {
        for (position, parameter) in signature.parameters().iter().enumerate() {
            if let Some(default) = parameter.default() {
                resolved.entry(position).or_insert_with(|| default.clone());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered list of strategies.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ParameterResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn ParameterResolver>>) -> Self {
        Self { resolvers }
    }

    /// Append a strategy after the existing ones
    pub fn push(&mut self, resolver: Box<dyn ParameterResolver>) {
        self.resolvers.push(resolver);
    }

    /// Insert a strategy before the existing ones
    pub fn prepend(&mut self, resolver: Box<dyn ParameterResolver>) {
        self.resolvers.insert(0, resolver);
    }

    /// Strategy names in the order they run
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Produce positional arguments for `signature`
    pub fn resolve(
        &self,
        ctx: &ResolutionContext<'_>,
        signature: &Signature,
        provided: &Parameters,
    ) -> Result<Arguments> {
        let mut resolved = ResolvedParameters::new();

        for (position, parameter) in signature.parameters().iter().enumerate() {
            if let Some(entry) = parameter.injected_entry() {
                resolved.insert(position, ctx.locator().get(entry)?);
            }
        }

        for resolver in &self.resolvers {
            resolver.resolve_parameters(ctx, signature, provided, &mut resolved)?;
        }

        for (position, parameter) in signature.parameters().iter().enumerate() {
            if !parameter.is_variadic() && !resolved.contains_key(&position) {
                return Err(DiError::NotEnoughParameters {
                    position: position + 1,
                    name: parameter.name().to_string(),
                    function: signature.name().to_string(),
                });
            }
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire_di",
            function = signature.name(),
            resolved = resolved.len(),
            "Parameters resolved"
        );

        Ok(Arguments::new(resolved.into_values().collect()))
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(DefinitionParameterResolver),
            Box::new(NumericArrayResolver),
            Box::new(AssociativeArrayResolver),
            Box::new(TypeHintContainerResolver),
            Box::new(ContainerNameResolver),
            Box::new(DefaultValueResolver),
        ])
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverChain")
            .field("resolvers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassRegistry;
    use crate::definition::helpers;
    use crate::signature::Parameter;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MapLocator(HashMap<String, Value>);

    impl ServiceLocator for MapLocator {
        fn has(&self, name: &str) -> bool {
            self.0.contains_key(name)
        }

        fn get(&self, name: &str) -> Result<Value> {
            self.0.get(name).cloned().ok_or_else(|| DiError::not_found(name))
        }
    }

    fn locator(entries: &[(&str, Value)]) -> MapLocator {
        MapLocator(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn resolver() -> DefinitionResolver {
        DefinitionResolver::new(Arc::new(ClassRegistry::new()))
    }

    #[test]
    fn test_default_order() {
        assert_eq!(
            ResolverChain::default().names(),
            vec!["definition", "numeric", "by-name", "type-hint", "container-name", "default"]
        );
    }

    #[test]
    fn test_default_used_when_nothing_else_applies() {
        let resolver = resolver();
        let locator = locator(&[]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new(
            "f",
            vec![Parameter::new("a"), Parameter::new("b").default_value(5)],
        );

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with(0, 10))
            .unwrap();
        assert_eq!(args.into_vec(), vec![Value::Int(10), Value::Int(5)]);
    }

    #[test]
    fn test_missing_parameter_reports_position_and_name() {
        let resolver = resolver();
        let locator = locator(&[]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new(
            "f",
            vec![Parameter::new("a"), Parameter::new("b").default_value(5)],
        );

        let err = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new())
            .unwrap_err();
        assert!(matches!(
            err,
            DiError::NotEnoughParameters { position: 1, ref name, .. } if name == "a"
        ));
    }

    #[test]
    fn test_explicit_beats_container() {
        let resolver = resolver();
        let locator = locator(&[("App\\Logger", Value::from("container logger")), ("host", Value::from("db"))]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new(
            "f",
            vec![Parameter::new("logger").class("App\\Logger"), Parameter::new("host")],
        );

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with("logger", "explicit"))
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "explicit");
        // Filled by name from the container
        assert_eq!(args.string(1).unwrap(), "db");
    }

    #[test]
    fn test_type_hint_beats_name() {
        let resolver = resolver();
        let locator = locator(&[
            ("App\\Logger", Value::from("by type")),
            ("logger", Value::from("by name")),
        ]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new("f", vec![Parameter::new("logger").class("App\\Logger")]);

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new())
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "by type");
    }

    #[test]
    fn test_definition_parameter_is_resolved() {
        let resolver = resolver();
        let locator = locator(&[("db.host", Value::from("localhost"))]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new("connect", vec![Parameter::new("host")]);

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with(0, helpers::get("db.host")))
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "localhost");
    }

    #[test]
    fn test_pinned_parameter_ignores_explicit_value() {
        let resolver = resolver();
        let locator = locator(&[("logger.file", Value::from("file logger"))]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new("f", vec![Parameter::new("logger").inject("logger.file")]);

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with(0, "explicit"))
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "file logger");
    }

    #[test]
    fn test_variadic_may_stay_empty() {
        let resolver = resolver();
        let locator = locator(&[]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new(
            "sum",
            vec![Parameter::new("first"), Parameter::new("rest").variadic()],
        );

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::positional([1, 2, 3]))
            .unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.rest(1), &[Value::Int(2), Value::Int(3)]);

        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with(0, 1))
            .unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_negative_index_matches_nothing() {
        let resolver = resolver();
        let locator = locator(&[]);
        let ctx = ResolutionContext::new(&resolver, &locator);
        let sig = Signature::new("f", vec![Parameter::new("a")]);

        assert_eq!(ParameterKey::from(-1), ParameterKey::Name("-1".into()));
        let err = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new().with(-1, 7))
            .unwrap_err();
        assert!(matches!(err, DiError::NotEnoughParameters { position: 1, .. }));
    }

    #[test]
    fn test_requested_entry_only_for_factories() {
        let resolver = resolver();
        let locator = locator(&[]);
        let sig = Signature::new("f", vec![Parameter::new("entry").requested_entry()]);

        let ctx = ResolutionContext::new(&resolver, &locator).with_requested_entry("mailer");
        let args = ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new())
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "mailer");

        let ctx = ResolutionContext::new(&resolver, &locator);
        assert!(ResolverChain::default()
            .resolve(&ctx, &sig, &Parameters::new())
            .is_err());
    }
}
