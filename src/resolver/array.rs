//! Arrays and array extensions

use super::DefinitionResolver;
use crate::container::ServiceLocator;
use crate::definition::{Argument, ArrayDefinition, ArrayDefinitionExtension};
use crate::invoker::Parameters;
use crate::{DiError, Result, Value};

pub(super) fn resolve_array(
    resolver: &DefinitionResolver,
    entry: &str,
    definition: &ArrayDefinition,
    locator: &dyn ServiceLocator,
) -> Result<Value> {
    resolve_values(resolver, entry, definition.values(), locator).map(Value::Array)
}

/// Predecessor values first, then the extension's own values
pub(super) fn resolve_extension(
    resolver: &DefinitionResolver,
    entry: &str,
    definition: &ArrayDefinitionExtension,
    locator: &dyn ServiceLocator,
) -> Result<Value> {
    let mut values = match definition.extended() {
        Some(previous) => match resolver.dispatch(previous, locator, &Parameters::new())? {
            Value::Array(values) => values,
            other => {
                return Err(DiError::invalid_definition(
                    previous.name(),
                    format!(
                        "an array extension expects the previous definition to resolve to an array, got {}",
                        other.type_name()
                    ),
                ));
            }
        },
        None => Vec::new(),
    };

    let own = resolve_values(resolver, entry, definition.values(), locator)?;
    values.extend(own);
    Ok(Value::Array(values))
}

fn resolve_values(
    resolver: &DefinitionResolver,
    entry: &str,
    arguments: &[Argument],
    locator: &dyn ServiceLocator,
) -> Result<Vec<Value>> {
    arguments
        .iter()
        .enumerate()
        .map(|(index, argument)| {
            resolver
                .resolve_argument(argument, locator)
                .map_err(|e| DiError::dependency(format!("{entry}[{index}]"), e))
        })
        .collect()
}
