//! Definitions: blueprints for container entries
//!
//! A [`Definition`] describes how to produce the value of one named entry.
//! The set of shapes is closed; the resolver matches on it exhaustively.
//!
//! Definitions are built unnamed (the name is assigned when they are added
//! to a [`DefinitionArray`](crate::DefinitionArray)). Extension-capable
//! definitions ([`Definition::ArrayExtension`] and [`Definition::Decorator`])
//! are paired with the definition they extend in a separate linking step,
//! [`Definition::link`], which consumes the unlinked definition and returns
//! the linked one.

mod dumper;
pub mod helpers;
mod object;

pub use object::*;

use crate::invoker::{CallableRef, Parameters};
use crate::{DiError, Function, ObjectRef, Result, Value};

/// A literal or a nested definition, used wherever definitions embed values.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Definition(Box<Definition>),
}

impl Argument {
    #[inline]
    pub fn as_definition(&self) -> Option<&Definition> {
        match self {
            Argument::Definition(definition) => Some(definition),
            Argument::Value(_) => None,
        }
    }
}

impl Default for Argument {
    fn default() -> Self {
        Argument::Value(Value::Null)
    }
}

impl From<Definition> for Argument {
    fn from(definition: Definition) -> Self {
        Argument::Definition(Box::new(definition))
    }
}

macro_rules! literal_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Argument {
                fn from(v: $ty) -> Self {
                    Argument::Value(Value::from(v))
                }
            }
        )*
    };
}

literal_argument!(Value, bool, i32, i64, f64, &str, String, ObjectRef, Function, Vec<Value>);

// =============================================================================
// Simple shapes
// =============================================================================

/// A literal value.
#[derive(Debug, Clone)]
pub struct ValueDefinition {
    name: String,
    value: Value,
}

impl ValueDefinition {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            name: String::new(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// An alias for another container entry.
#[derive(Debug, Clone)]
pub struct Reference {
    name: String,
    target: String,
}

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            target: target.into(),
        }
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Value read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvironmentVariableDefinition {
    name: String,
    variable: String,
    optional: bool,
    default: Argument,
}

impl EnvironmentVariableDefinition {
    /// Required variable
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            variable: variable.into(),
            optional: false,
            default: Argument::default(),
        }
    }

    /// Optional variable falling back to `default` (a literal or a definition)
    pub fn optional(variable: impl Into<String>, default: impl Into<Argument>) -> Self {
        Self {
            name: String::new(),
            variable: variable.into(),
            optional: true,
            default: default.into(),
        }
    }

    #[inline]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    pub fn default_value(&self) -> &Argument {
        &self.default
    }
}

/// String template with `{entry}` placeholders.
#[derive(Debug, Clone)]
pub struct StringDefinition {
    name: String,
    template: String,
}

impl StringDefinition {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            template: template.into(),
        }
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Ordered list of values.
#[derive(Debug, Clone, Default)]
pub struct ArrayDefinition {
    name: String,
    values: Vec<Argument>,
}

impl ArrayDefinition {
    pub fn new(values: Vec<Argument>) -> Self {
        Self {
            name: String::new(),
            values,
        }
    }

    #[inline]
    pub fn values(&self) -> &[Argument] {
        &self.values
    }
}

/// Values appended to the array defined under the same name with lower priority.
#[derive(Debug, Clone, Default)]
pub struct ArrayDefinitionExtension {
    name: String,
    values: Vec<Argument>,
    extended: Option<Box<Definition>>,
}

impl ArrayDefinitionExtension {
    pub fn new(values: Vec<Argument>) -> Self {
        Self {
            name: String::new(),
            values,
            extended: None,
        }
    }

    #[inline]
    pub fn values(&self) -> &[Argument] {
        &self.values
    }

    /// The array this extension appends to, once linked
    #[inline]
    pub fn extended(&self) -> Option<&Definition> {
        self.extended.as_deref()
    }
}

/// Value produced by calling a factory.
#[derive(Debug, Clone)]
pub struct FactoryDefinition {
    name: String,
    factory: CallableRef,
    parameters: Parameters,
}

impl FactoryDefinition {
    pub fn new(factory: impl Into<CallableRef>) -> Self {
        Self {
            name: String::new(),
            factory: factory.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    #[inline]
    pub fn callable(&self) -> &CallableRef {
        &self.factory
    }

    /// Explicit parameters for values the chain cannot guess
    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[inline]
    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }
}

/// Factory that receives the value of the definition it replaces as its first argument.
#[derive(Debug, Clone)]
pub struct DecoratorDefinition {
    factory: FactoryDefinition,
    decorated: Option<Box<Definition>>,
}

impl DecoratorDefinition {
    pub fn new(factory: impl Into<CallableRef>) -> Self {
        Self {
            factory: FactoryDefinition::new(factory),
            decorated: None,
        }
    }

    #[inline]
    pub fn factory(&self) -> &FactoryDefinition {
        &self.factory
    }

    #[inline]
    pub fn factory_mut(&mut self) -> &mut FactoryDefinition {
        &mut self.factory
    }

    /// The definition being decorated, once linked
    #[inline]
    pub fn decorated(&self) -> Option<&Definition> {
        self.decorated.as_deref()
    }
}

/// Injections applied to an object that was built outside the container.
#[derive(Debug, Clone)]
pub struct InstanceDefinition {
    instance: ObjectRef,
    object: ObjectDefinition,
}

impl InstanceDefinition {
    /// `object` describes the property and method injections to apply
    pub fn new(instance: ObjectRef, mut object: ObjectDefinition) -> Self {
        object.set_class_name(Some(instance.class().to_string()));
        Self { instance, object }
    }

    #[inline]
    pub fn instance(&self) -> &ObjectRef {
        &self.instance
    }

    #[inline]
    pub fn object_definition(&self) -> &ObjectDefinition {
        &self.object
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Blueprint for one container entry.
#[derive(Debug, Clone)]
pub enum Definition {
    Value(ValueDefinition),
    Reference(Reference),
    EnvironmentVariable(EnvironmentVariableDefinition),
    String(StringDefinition),
    Array(ArrayDefinition),
    ArrayExtension(ArrayDefinitionExtension),
    Object(ObjectDefinition),
    Factory(FactoryDefinition),
    Decorator(DecoratorDefinition),
    Instance(InstanceDefinition),
}

impl Definition {
    /// Entry name, empty for anonymous nested definitions
    pub fn name(&self) -> &str {
        match self {
            Definition::Value(d) => &d.name,
            Definition::Reference(d) => &d.name,
            Definition::EnvironmentVariable(d) => &d.name,
            Definition::String(d) => &d.name,
            Definition::Array(d) => &d.name,
            Definition::ArrayExtension(d) => &d.name,
            Definition::Object(d) => d.name(),
            Definition::Factory(d) => &d.name,
            Definition::Decorator(d) => &d.factory.name,
            Definition::Instance(d) => d.object.name(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Definition::Value(d) => d.name = name,
            Definition::Reference(d) => d.name = name,
            Definition::EnvironmentVariable(d) => d.name = name,
            Definition::String(d) => d.name = name,
            Definition::Array(d) => d.name = name,
            Definition::ArrayExtension(d) => d.name = name,
            Definition::Object(d) => d.set_name(name),
            Definition::Factory(d) => d.name = name,
            Definition::Decorator(d) => d.factory.name = name,
            Definition::Instance(d) => d.object.set_name(name),
        }
    }

    /// Builder-style [`set_name`](Self::set_name)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    /// Short name of the shape, for logs and dumps
    pub fn variant(&self) -> &'static str {
        match self {
            Definition::Value(_) => "value",
            Definition::Reference(_) => "reference",
            Definition::EnvironmentVariable(_) => "environment variable",
            Definition::String(_) => "string",
            Definition::Array(_) => "array",
            Definition::ArrayExtension(_) => "array extension",
            Definition::Object(_) => "object",
            Definition::Factory(_) => "factory",
            Definition::Decorator(_) => "decorator",
            Definition::Instance(_) => "instance",
        }
    }

    /// Whether this definition extends a previous definition of the same name
    #[inline]
    pub fn is_extension(&self) -> bool {
        matches!(
            self,
            Definition::ArrayExtension(_) | Definition::Decorator(_)
        )
    }

    /// Whether an extension-capable definition has been paired with its predecessor
    pub fn is_linked(&self) -> bool {
        match self {
            Definition::ArrayExtension(d) => d.extended.is_some(),
            Definition::Decorator(d) => d.decorated.is_some(),
            _ => true,
        }
    }

    /// Pair an extension-capable definition with the definition it extends.
    ///
    /// Array extensions only extend arrays (plain or already extended).
    pub fn link(self, previous: Definition) -> Result<Definition> {
        match self {
            Definition::ArrayExtension(mut d) => match previous {
                Definition::Array(_) | Definition::ArrayExtension(_) => {
                    d.extended = Some(Box::new(previous));
                    Ok(Definition::ArrayExtension(d))
                }
                other => Err(DiError::invalid_definition(
                    &d.name,
                    format!(
                        "Definition '{}' tries to add array entries but the previous definition is not an array ({})",
                        d.name,
                        other.variant()
                    ),
                )),
            },
            Definition::Decorator(mut d) => {
                d.decorated = Some(Box::new(previous));
                Ok(Definition::Decorator(d))
            }
            other => Err(DiError::invalid_definition(
                other.name(),
                format!("a {} definition cannot extend another definition", other.variant()),
            )),
        }
    }

    /// Substitute wildcard segments matched in the requested entry name.
    ///
    /// Only object definitions carry a class name; other shapes are unchanged.
    pub fn replace_wildcards(&mut self, segments: &[String]) {
        if let Definition::Object(d) = self {
            d.replace_wildcards(segments);
        }
    }
}

impl From<ValueDefinition> for Definition {
    fn from(d: ValueDefinition) -> Self {
        Definition::Value(d)
    }
}

impl From<Reference> for Definition {
    fn from(d: Reference) -> Self {
        Definition::Reference(d)
    }
}

impl From<EnvironmentVariableDefinition> for Definition {
    fn from(d: EnvironmentVariableDefinition) -> Self {
        Definition::EnvironmentVariable(d)
    }
}

impl From<StringDefinition> for Definition {
    fn from(d: StringDefinition) -> Self {
        Definition::String(d)
    }
}

impl From<ArrayDefinition> for Definition {
    fn from(d: ArrayDefinition) -> Self {
        Definition::Array(d)
    }
}

impl From<ArrayDefinitionExtension> for Definition {
    fn from(d: ArrayDefinitionExtension) -> Self {
        Definition::ArrayExtension(d)
    }
}

impl From<ObjectDefinition> for Definition {
    fn from(d: ObjectDefinition) -> Self {
        Definition::Object(d)
    }
}

impl From<FactoryDefinition> for Definition {
    fn from(d: FactoryDefinition) -> Self {
        Definition::Factory(d)
    }
}

impl From<DecoratorDefinition> for Definition {
    fn from(d: DecoratorDefinition) -> Self {
        Definition::Decorator(d)
    }
}

impl From<InstanceDefinition> for Definition {
    fn from(d: InstanceDefinition) -> Self {
        Definition::Instance(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_assigned_after_construction() {
        let definition = Definition::from(ValueDefinition::new(42));
        assert_eq!(definition.name(), "");

        let definition = definition.named("answer");
        assert_eq!(definition.name(), "answer");
        assert_eq!(definition.variant(), "value");
    }

    #[test]
    fn test_array_extension_links_to_array() {
        let base = Definition::from(ArrayDefinition::new(vec![1.into(), 2.into()])).named("list");
        let extension =
            Definition::from(ArrayDefinitionExtension::new(vec![3.into()])).named("list");

        assert!(extension.is_extension());
        assert!(!extension.is_linked());

        let linked = extension.link(base).unwrap();
        assert!(linked.is_linked());
        match linked {
            Definition::ArrayExtension(d) => {
                assert!(matches!(d.extended(), Some(Definition::Array(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_array_extension_rejects_non_array() {
        let base = Definition::from(ValueDefinition::new("scalar")).named("list");
        let extension =
            Definition::from(ArrayDefinitionExtension::new(vec![3.into()])).named("list");

        let err = extension.link(base).unwrap_err();
        assert!(matches!(err, DiError::InvalidDefinition { entry, .. } if entry == "list"));
    }

    #[test]
    fn test_plain_definitions_cannot_link() {
        let value = Definition::from(ValueDefinition::new(1)).named("a");
        let previous = Definition::from(ValueDefinition::new(2)).named("a");
        assert!(value.link(previous).is_err());
    }
}
