//! Shorthand constructors for definitions
//!
//! ```rust
//! use autowire_di::helpers::{add, create, env_or, get, string, value};
//!
//! let definitions = vec![
//!     ("db.host", env_or("DB_HOST", "localhost")),
//!     ("db.url", string("postgres://{db.host}/app")),
//!     ("log.level", value("info")),
//!     ("plugins", add(vec![value("audit").into()])),
//!     (
//!         "App\\Mailer",
//!         create(None)
//!             .constructor_parameter("host", get("smtp.host"))
//!             .method("setPort", vec![587.into()])
//!             .into(),
//!     ),
//! ];
//! assert_eq!(definitions.len(), 5);
//! ```

use super::{
    Argument, ArrayDefinition, ArrayDefinitionExtension, DecoratorDefinition, Definition,
    EnvironmentVariableDefinition, FactoryDefinition, MethodInjection, ObjectDefinition,
    PropertyInjection, Reference, StringDefinition, ValueDefinition,
};
use crate::Value;
use crate::invoker::{CallableRef, ParameterKey, Parameters};

/// A literal value
pub fn value(value: impl Into<Value>) -> Definition {
    ValueDefinition::new(value).into()
}

/// An alias to another entry
pub fn get(entry: impl Into<String>) -> Definition {
    Reference::new(entry).into()
}

/// A required environment variable
pub fn env(variable: impl Into<String>) -> Definition {
    EnvironmentVariableDefinition::new(variable).into()
}

/// An optional environment variable with a fallback literal or definition
pub fn env_or(variable: impl Into<String>, default: impl Into<Argument>) -> Definition {
    EnvironmentVariableDefinition::optional(variable, default).into()
}

/// A string template with `{entry}` placeholders
pub fn string(template: impl Into<String>) -> Definition {
    StringDefinition::new(template).into()
}

/// An array of literals or definitions
pub fn array(values: Vec<Argument>) -> Definition {
    ArrayDefinition::new(values).into()
}

/// Values appended to the array already defined under the same name
pub fn add(values: Vec<Argument>) -> Definition {
    ArrayDefinitionExtension::new(values).into()
}

/// An object of `class`, or of the class named like the entry when `None`
pub fn create(class: Option<&str>) -> ObjectDefinitionHelper {
    ObjectDefinitionHelper {
        definition: ObjectDefinition::new(class.map(str::to_string)),
    }
}

/// Like [`create`], and autocall methods of the class run as well
pub fn autowire(class: Option<&str>) -> ObjectDefinitionHelper {
    let mut helper = create(class);
    helper.definition.set_autowired(true);
    helper
}

/// A value produced by calling `callable`
pub fn factory(callable: impl Into<CallableRef>) -> FactoryDefinitionHelper {
    FactoryDefinitionHelper {
        definition: FactoryDefinition::new(callable),
        decorate: false,
    }
}

/// Replace the previous definition of the entry with `callable(previous, ...)`
pub fn decorate(callable: impl Into<CallableRef>) -> FactoryDefinitionHelper {
    FactoryDefinitionHelper {
        definition: FactoryDefinition::new(callable),
        decorate: true,
    }
}

/// Builder returned by [`create`] and [`autowire`].
#[derive(Debug, Clone)]
pub struct ObjectDefinitionHelper {
    definition: ObjectDefinition,
}

impl ObjectDefinitionHelper {
    /// Build through a proxy on first use
    pub fn lazy(mut self) -> Self {
        self.definition.set_lazy(true);
        self
    }

    /// Positional constructor parameters
    pub fn constructor(mut self, values: Vec<Argument>) -> Self {
        self.definition
            .set_constructor_injection(MethodInjection::constructor(Parameters::positional(values)));
        self
    }

    /// One constructor parameter, by position or name
    pub fn constructor_parameter(
        mut self,
        key: impl Into<ParameterKey>,
        value: impl Into<Argument>,
    ) -> Self {
        self.definition.set_constructor_parameter(key.into(), value.into());
        self
    }

    pub fn property(mut self, property: &str, value: impl Into<Argument>) -> Self {
        self.definition
            .add_property_injection(PropertyInjection::new(property, value));
        self
    }

    /// Property declared by an ancestor `class`
    pub fn property_of(mut self, class: &str, property: &str, value: impl Into<Argument>) -> Self {
        self.definition
            .add_property_injection(PropertyInjection::new(property, value).declared_by(class));
        self
    }

    /// Call `method` with positional parameters, merging with an earlier call to it
    pub fn method(mut self, method: &str, values: Vec<Argument>) -> Self {
        self.definition
            .add_method_injection(MethodInjection::new(method, Parameters::positional(values)));
        self
    }

    /// Call `method` once more, even if already called
    pub fn method_call(mut self, method: &str, values: Vec<Argument>) -> Self {
        self.definition
            .push_method_call(MethodInjection::new(method, Parameters::positional(values)));
        self
    }

    /// One parameter of a method call, by position or name
    pub fn method_parameter(
        mut self,
        method: &str,
        key: impl Into<ParameterKey>,
        value: impl Into<Argument>,
    ) -> Self {
        self.definition.add_method_injection(MethodInjection::new(
            method,
            Parameters::new().with(key, value),
        ));
        self
    }

    #[inline]
    pub fn into_definition(self) -> ObjectDefinition {
        self.definition
    }
}

impl From<ObjectDefinitionHelper> for Definition {
    fn from(helper: ObjectDefinitionHelper) -> Self {
        Definition::Object(helper.definition)
    }
}

impl From<ObjectDefinitionHelper> for Argument {
    fn from(helper: ObjectDefinitionHelper) -> Self {
        Argument::from(Definition::from(helper))
    }
}

/// Builder returned by [`factory`] and [`decorate`].
#[derive(Debug, Clone)]
pub struct FactoryDefinitionHelper {
    definition: FactoryDefinition,
    decorate: bool,
}

impl FactoryDefinitionHelper {
    /// Explicit factory parameter, by position or name
    pub fn parameter(mut self, key: impl Into<ParameterKey>, value: impl Into<Argument>) -> Self {
        self.definition
            .parameters_mut()
            .insert(key.into(), value.into());
        self
    }
}

impl From<FactoryDefinitionHelper> for Definition {
    fn from(helper: FactoryDefinitionHelper) -> Self {
        if helper.decorate {
            let mut decorator = DecoratorDefinition::new(helper.definition.callable().clone());
            *decorator.factory_mut().parameters_mut() = helper.definition.parameters().clone();
            Definition::Decorator(decorator)
        } else {
            Definition::Factory(helper.definition)
        }
    }
}

impl From<FactoryDefinitionHelper> for Argument {
    fn from(helper: FactoryDefinitionHelper) -> Self {
        Argument::from(Definition::from(helper))
    }
}
