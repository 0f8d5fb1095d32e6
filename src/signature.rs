//! Callable signatures
//!
//! A [`Signature`] is the ordered parameter list of a constructor, method or
//! function. The parameter chain reads it to decide which strategy fills
//! each position.

use crate::Value;

/// Built-in (non-class) parameter types. These are never looked up in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    String,
    Array,
    Callable,
}

/// Declared parameter type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Scalar(ScalarType),
    /// A class or interface name
    Class(String),
}

/// What a parameter asks for beyond its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterKind {
    #[default]
    Plain,
    /// Receives the container performing the resolution
    Container,
    /// Receives the name of the entry being resolved (factories only)
    RequestedEntry,
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    type_hint: Option<TypeHint>,
    default: Option<Value>,
    variadic: bool,
    kind: ParameterKind,
    inject: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
            variadic: false,
            kind: ParameterKind::Plain,
            inject: None,
        }
    }

    /// Declare a class or interface type
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.type_hint = Some(TypeHint::Class(class.into()));
        self
    }

    /// Declare a built-in type
    pub fn scalar(mut self, scalar: ScalarType) -> Self {
        self.type_hint = Some(TypeHint::Scalar(scalar));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Receive the container itself
    pub fn container(mut self) -> Self {
        self.kind = ParameterKind::Container;
        self
    }

    /// Receive the requested entry name
    pub fn requested_entry(mut self) -> Self {
        self.kind = ParameterKind::RequestedEntry;
        self
    }

    /// Pin this parameter to a container entry
    pub fn inject(mut self, entry: impl Into<String>) -> Self {
        self.inject = Some(entry.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_hint(&self) -> Option<&TypeHint> {
        self.type_hint.as_ref()
    }

    /// Class name of the declared type, if it is a class
    pub fn class_hint(&self) -> Option<&str> {
        match &self.type_hint {
            Some(TypeHint::Class(class)) => Some(class),
            _ => None,
        }
    }

    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    #[inline]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    #[inline]
    pub fn injected_entry(&self) -> Option<&str> {
        self.inject.as_deref()
    }
}

/// Ordered parameter list of a callable.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    name: String,
    parameters: Vec<Parameter>,
}

impl Signature {
    /// `name` describes the callable in error messages
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Position of the parameter called `name`
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_builder() {
        let p = Parameter::new("logger")
            .class("App\\Logger")
            .inject("logger.file");

        assert_eq!(p.name(), "logger");
        assert_eq!(p.class_hint(), Some("App\\Logger"));
        assert_eq!(p.injected_entry(), Some("logger.file"));
        assert_eq!(p.kind(), ParameterKind::Plain);
        assert!(p.default().is_none());
    }

    #[test]
    fn test_scalar_is_not_a_class_hint() {
        let p = Parameter::new("port").scalar(ScalarType::Int).default_value(80);
        assert_eq!(p.class_hint(), None);
        assert_eq!(p.default(), Some(&Value::Int(80)));
    }

    #[test]
    fn test_position_of() {
        let sig = Signature::new(
            "connect",
            vec![Parameter::new("host"), Parameter::new("port")],
        );
        assert_eq!(sig.position_of("port"), Some(1));
        assert_eq!(sig.position_of("user"), None);
    }
}
