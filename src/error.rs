//! Error types for definition resolution and invocation

use thiserror::Error;

/// Errors that can occur while resolving definitions or invoking callables
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// A definition is malformed or used where it is not supported
    #[error("Invalid definition for entry '{entry}': {reason}")]
    InvalidDefinition { entry: String, reason: String },

    /// No entry or definition is registered under the requested name
    #[error("No entry or class found for '{name}'")]
    NotFound { name: String },

    /// A nested resolution failed while resolving `entry`
    #[error("Error while resolving entry '{entry}': {source}")]
    Dependency {
        entry: String,
        #[source]
        source: Box<DiError>,
    },

    /// The resolved target cannot be invoked
    #[error("{description} is not a callable")]
    NotCallable { description: String },

    /// A parameter could not be filled by any resolution strategy
    #[error("Unable to invoke {function}: parameter #{position} (${name}) has no value defined or guessable")]
    NotEnoughParameters {
        position: usize,
        name: String,
        function: String,
    },

    /// An entry was revisited while it was still being resolved
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// A required environment variable is not set
    #[error("The environment variable '{variable}' has not been defined")]
    EnvironmentVariableNotDefined { variable: String },

    /// A value did not have the type the caller asked for
    #[error("Expected {expected}, found {found}")]
    WrongType { expected: String, found: String },

    /// Container is locked and cannot be modified
    #[error("Container is locked - cannot register new definitions")]
    Locked,

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a NotFound error for an entry name
    #[inline]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an InvalidDefinition error
    #[inline]
    pub fn invalid_definition(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a nested failure with the name of the entry being resolved
    #[inline]
    pub fn dependency(entry: impl Into<String>, source: DiError) -> Self {
        Self::Dependency {
            entry: entry.into(),
            source: Box::new(source),
        }
    }

    /// Create a NotCallable error
    #[inline]
    pub fn not_callable(description: impl Into<String>) -> Self {
        Self::NotCallable {
            description: description.into(),
        }
    }

    /// Create a WrongType error
    #[inline]
    pub fn wrong_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::WrongType {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Walk `Dependency` wrappers down to the failure that started the chain
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let Self::Dependency { source, .. } = current {
            current = source;
        }
        current
    }

    /// Entry names of every `Dependency` wrapper, outermost first
    pub fn entry_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let Self::Dependency { entry, source } = current {
            chain.push(entry.as_str());
            current = source;
        }
        chain
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_dependency_keeps_cause() {
        let err = DiError::dependency(
            "outer",
            DiError::dependency("middle", DiError::not_found("inner")),
        );

        assert_eq!(err.entry_chain(), vec!["outer", "middle"]);
        assert!(matches!(err.root_cause(), DiError::NotFound { name } if name == "inner"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_not_enough_parameters_message() {
        let err = DiError::NotEnoughParameters {
            position: 1,
            name: "a".into(),
            function: "closure".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to invoke closure: parameter #1 ($a) has no value defined or guessable"
        );
    }
}
