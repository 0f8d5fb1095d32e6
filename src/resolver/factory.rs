//! Factories and decorators

use super::DefinitionResolver;
use crate::container::ServiceLocator;
use crate::definition::{Argument, DecoratorDefinition, FactoryDefinition};
use crate::invoker::{
    CallableResolver, Invocable, Invoker, ParameterKey, Parameters, ResolutionContext,
};
use crate::{DiError, Result, Value};

#[cfg(feature = "logging")]
use tracing::debug;

pub(super) fn resolve_factory(
    resolver: &DefinitionResolver,
    entry: &str,
    definition: &FactoryDefinition,
    locator: &dyn ServiceLocator,
    overrides: &Parameters,
) -> Result<Value> {
    let target = resolve_target(resolver, entry, definition, locator)?;
    let mut parameters = definition.parameters().clone();
    parameters.merge(overrides);
    call_factory(resolver, entry, &target, locator, &parameters)
}

/// The decorated value is passed as the first argument.
///
/// Explicit parameters keep their keys but may not target the first position.
pub(super) fn resolve_decorator(
    resolver: &DefinitionResolver,
    entry: &str,
    definition: &DecoratorDefinition,
    locator: &dyn ServiceLocator,
    overrides: &Parameters,
) -> Result<Value> {
    let decorated = definition.decorated().ok_or_else(|| {
        DiError::invalid_definition(
            entry,
            format!("Entry \"{entry}\" decorates nothing: no previous definition with the same name was found"),
        )
    })?;

    let factory = definition.factory();
    let target = resolve_target(resolver, entry, factory, locator)?;
    let mut parameters = factory.parameters().clone();
    parameters.merge(overrides);

    if let Some((key, _)) = parameters
        .iter()
        .find(|(key, _)| key.position(target.signature()) == Some(0))
    {
        return Err(DiError::invalid_definition(
            entry,
            format!("Entry \"{entry}\" cannot be resolved: parameter {key} receives the decorated value"),
        ));
    }

    #[cfg(feature = "logging")]
    debug!(target: "autowire_di", entry, decorated = decorated.variant(), "Decorating entry");

    let previous = resolver
        .dispatch(decorated, locator, &Parameters::new())
        .map_err(|e| DiError::dependency(entry, e))?;
    parameters.insert(ParameterKey::Index(0), Argument::Value(previous));

    call_factory(resolver, entry, &target, locator, &parameters)
}

fn call_factory(
    resolver: &DefinitionResolver,
    entry: &str,
    target: &Invocable,
    locator: &dyn ServiceLocator,
    parameters: &Parameters,
) -> Result<Value> {
    let ctx = ResolutionContext::new(resolver, locator).with_requested_entry(entry);

    Invoker::new(resolver.clone())
        .invoke(&ctx, target, parameters)
        .map_err(|e| DiError::dependency(entry, e))
}

fn resolve_target(
    resolver: &DefinitionResolver,
    entry: &str,
    definition: &FactoryDefinition,
    locator: &dyn ServiceLocator,
) -> Result<Invocable> {
    CallableResolver::new(resolver.registry())
        .resolve(definition.callable(), locator)
        .map_err(|e| match e {
            DiError::NotCallable { description } => DiError::invalid_definition(
                entry,
                format!("Entry \"{entry}\" cannot be resolved: factory {description} is not callable"),
            ),
            other => DiError::dependency(entry, other),
        })
}
