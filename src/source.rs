//! Definition sources
//!
//! A [`DefinitionSource`] answers "what is the definition of this name?".
//! [`SourceChain`] asks its sources in priority order and links extension
//! definitions (array extensions, decorators) to the definition of the same
//! name found in a lower-priority source.

use crate::class::ClassRegistry;
use crate::definition::{Definition, ObjectDefinition};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Something that can provide definitions by entry name.
pub trait DefinitionSource: Send + Sync {
    /// Unlinked definition for `name`, if this source has one
    fn get_definition(&self, name: &str) -> Option<Definition>;

    /// Names this source can enumerate (wildcards and autowiring cannot)
    fn definition_names(&self) -> Vec<String> {
        Vec::new()
    }
}

// =============================================================================
// DefinitionArray
// =============================================================================

struct WildcardDefinition {
    pattern: Regex,
    definition: Definition,
}

/// Definitions registered by name.
///
/// A name containing `*` is a wildcard: `*` matches one name segment (no
/// backslash), and each matched segment replaces the corresponding `*` in
/// the class name of an object definition.
#[derive(Default)]
pub struct DefinitionArray {
    exact: DashMap<String, Definition, RandomState>,
    wildcards: RwLock<Vec<WildcardDefinition>>,
}

impl DefinitionArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, definition)` pairs
    pub fn from_definitions<I, N, D>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<Definition>,
    {
        let array = Self::new();
        for (name, definition) in definitions {
            array.add(name, definition)?;
        }
        Ok(array)
    }

    /// Register `definition` under `name`, replacing any previous one
    pub fn add(&self, name: impl Into<String>, definition: impl Into<Definition>) -> Result<()> {
        let name = name.into();
        let definition = definition.into().named(name.clone());

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire_di",
            entry = %name,
            kind = definition.variant(),
            "Registering definition"
        );

        if name.contains('*') {
            let pattern = wildcard_pattern(&name)?;
            let mut wildcards = self
                .wildcards
                .write()
                .map_err(|_| DiError::Internal("wildcard definitions lock poisoned".into()))?;
            wildcards.retain(|w| w.definition.name() != name);
            wildcards.push(WildcardDefinition {
                pattern,
                definition,
            });
        } else {
            self.exact.insert(name, definition);
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.read().map(|w| w.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `App\*\Service` becomes `^App\\([^\\]+)\\Service$`
fn wildcard_pattern(name: &str) -> Result<Regex> {
    let escaped = regex::escape(name).replace(r"\*", r"([^\\]+)");
    Regex::new(&format!("^{escaped}$")).map_err(|e| {
        DiError::invalid_definition(name, format!("invalid wildcard pattern: {e}"))
    })
}

impl DefinitionSource for DefinitionArray {
    fn get_definition(&self, name: &str) -> Option<Definition> {
        if let Some(definition) = self.exact.get(name) {
            return Some(definition.clone());
        }

        let wildcards = self.wildcards.read().ok()?;
        wildcards.iter().find_map(|wildcard| {
            let captures = wildcard.pattern.captures(name)?;
            let segments: Vec<String> = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect();

            #[cfg(feature = "logging")]
            trace!(
                target: "autowire_di",
                entry = name,
                pattern = wildcard.definition.name(),
                "Wildcard definition matched"
            );

            let mut definition = wildcard.definition.clone().named(name);
            definition.replace_wildcards(&segments);
            Some(definition)
        })
    }

    fn definition_names(&self) -> Vec<String> {
        self.exact.iter().map(|e| e.key().clone()).collect()
    }
}

impl std::fmt::Debug for DefinitionArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionArray")
            .field("exact", &self.exact.len())
            .field(
                "wildcards",
                &self.wildcards.read().map(|w| w.len()).unwrap_or(0),
            )
            .finish()
    }
}

// =============================================================================
// Autowiring
// =============================================================================

/// Object definitions for any registered class, built from its metadata alone.
pub struct Autowiring {
    registry: Arc<ClassRegistry>,
}

impl Autowiring {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self { registry }
    }
}

impl DefinitionSource for Autowiring {
    fn get_definition(&self, name: &str) -> Option<Definition> {
        if !self.registry.exists(name) {
            return None;
        }
        let mut definition = ObjectDefinition::new(None);
        definition.set_autowired(true);
        Some(Definition::Object(definition).named(name))
    }
}

// =============================================================================
// SourceChain
// =============================================================================

/// Sources in priority order, highest first.
#[derive(Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn DefinitionSource>>,
}

impl SourceChain {
    /// `sources` ordered from highest to lowest priority
    pub fn new(sources: Vec<Arc<dyn DefinitionSource>>) -> Self {
        Self { sources }
    }

    /// Linked definition for `name` from the highest-priority source that has one
    pub fn get_definition(&self, name: &str) -> Result<Option<Definition>> {
        self.lookup(name, 0)
    }

    fn lookup(&self, name: &str, start: usize) -> Result<Option<Definition>> {
        for (index, source) in self.sources.iter().enumerate().skip(start) {
            let Some(definition) = source.get_definition(name) else {
                continue;
            };
            if !definition.is_extension() {
                return Ok(Some(definition));
            }

            return match self.lookup(name, index + 1)? {
                Some(previous) => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "autowire_di",
                        entry = name,
                        kind = definition.variant(),
                        extends = previous.variant(),
                        "Linking definition to its predecessor"
                    );
                    definition.link(previous).map(Some)
                }
                None => Ok(Some(definition)),
            };
        }
        Ok(None)
    }

    /// Names every source can enumerate, deduplicated and sorted
    pub fn definition_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .iter()
            .flat_map(|source| source.definition_names())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("sources", &self.sources.len())
            .finish()
    }
}
