//! Object definitions
//!
//! An [`ObjectDefinition`] describes how to construct an instance of a
//! registered class: constructor parameters, property injections and method
//! calls. Class existence facts are memoized per definition and reset
//! whenever the class name changes, including wildcard substitution.

use super::Argument;
use crate::class::{ClassFacts, ClassRegistry};
use crate::invoker::{ParameterKey, Parameters};
use once_cell::sync::OnceCell;

/// A value assigned to a property after construction.
#[derive(Debug, Clone)]
pub struct PropertyInjection {
    property: String,
    value: Argument,
    class: Option<String>,
}

impl PropertyInjection {
    pub fn new(property: impl Into<String>, value: impl Into<Argument>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            class: None,
        }
    }

    /// Target the property declared by `class` rather than the object's own
    pub fn declared_by(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[inline]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    pub fn value(&self) -> &Argument {
        &self.value
    }

    #[inline]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

/// A method call (or the constructor call) with explicit parameters.
#[derive(Debug, Clone)]
pub struct MethodInjection {
    method: String,
    parameters: Parameters,
}

impl MethodInjection {
    pub fn new(method: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            method: method.into(),
            parameters,
        }
    }

    /// Constructor injection
    pub fn constructor(parameters: Parameters) -> Self {
        Self::new("__construct", parameters)
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Add parameters from `other`; its values win on key conflicts
    pub fn merge(&mut self, other: &MethodInjection) {
        self.parameters.merge(&other.parameters);
    }
}

/// Definition of an object built from a registered class.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    name: String,
    class_name: Option<String>,
    lazy: bool,
    autowire: bool,
    constructor: Option<MethodInjection>,
    properties: Vec<PropertyInjection>,
    methods: Vec<MethodInjection>,
    facts: OnceCell<ClassFacts>,
}

impl ObjectDefinition {
    /// Definition of `class`; the entry name is assigned at registration
    pub fn new(class_name: Option<String>) -> Self {
        Self {
            name: String::new(),
            class_name,
            lazy: false,
            autowire: false,
            constructor: None,
            properties: Vec::new(),
            methods: Vec::new(),
            facts: OnceCell::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        if self.class_name.is_none() {
            self.facts = OnceCell::new();
        }
    }

    /// Class to build: the explicit class name, or the entry name
    pub fn class_name(&self) -> &str {
        self.class_name.as_deref().unwrap_or(&self.name)
    }

    /// Change the class and forget cached class facts
    pub fn set_class_name(&mut self, class_name: Option<String>) {
        self.class_name = class_name;
        self.facts = OnceCell::new();
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn set_lazy(&mut self, lazy: bool) {
        self.lazy = lazy;
    }

    /// Whether autocall methods of the class run after explicit injections
    #[inline]
    pub fn is_autowired(&self) -> bool {
        self.autowire
    }

    pub fn set_autowired(&mut self, autowire: bool) {
        self.autowire = autowire;
    }

    #[inline]
    pub fn constructor_injection(&self) -> Option<&MethodInjection> {
        self.constructor.as_ref()
    }

    /// Set constructor parameters, merging with any already defined
    pub fn set_constructor_injection(&mut self, injection: MethodInjection) {
        match &mut self.constructor {
            Some(existing) => existing.merge(&injection),
            None => self.constructor = Some(injection),
        }
    }

    /// Set one constructor parameter
    pub fn set_constructor_parameter(&mut self, key: ParameterKey, value: Argument) {
        self.constructor
            .get_or_insert_with(|| MethodInjection::constructor(Parameters::new()))
            .parameters
            .insert(key, value);
    }

    #[inline]
    pub fn property_injections(&self) -> &[PropertyInjection] {
        &self.properties
    }

    /// Add a property injection, replacing one for the same property and declaring class
    pub fn add_property_injection(&mut self, injection: PropertyInjection) {
        match self
            .properties
            .iter_mut()
            .find(|p| p.property == injection.property && p.class == injection.class)
        {
            Some(existing) => *existing = injection,
            None => self.properties.push(injection),
        }
    }

    /// Method calls in declaration order
    #[inline]
    pub fn method_injections(&self) -> &[MethodInjection] {
        &self.methods
    }

    /// Add parameters to the first call of `injection.method()`, or add the call
    pub fn add_method_injection(&mut self, injection: MethodInjection) {
        match self.methods.iter_mut().find(|m| m.method == injection.method) {
            Some(existing) => existing.merge(&injection),
            None => self.methods.push(injection),
        }
    }

    /// Add another call to a method even if it is already called
    pub fn push_method_call(&mut self, injection: MethodInjection) {
        self.methods.push(injection);
    }

    /// Whether the definition names `method` explicitly
    pub fn calls_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.method == method)
    }

    /// Existence and instantiability of the class, computed once
    pub fn class_facts(&self, registry: &ClassRegistry) -> ClassFacts {
        *self.facts.get_or_init(|| registry.facts(self.class_name()))
    }

    /// Replace each `*` in the class name with the next matched segment
    pub fn replace_wildcards(&mut self, segments: &[String]) {
        let Some(class) = self.class_name.as_deref() else {
            return;
        };
        if !class.contains('*') {
            return;
        }

        let mut segments = segments.iter();
        let mut replaced = String::with_capacity(class.len());
        for ch in class.chars() {
            if ch == '*' {
                if let Some(segment) = segments.next() {
                    replaced.push_str(segment);
                    continue;
                }
            }
            replaced.push(ch);
        }
        self.set_class_name(Some(replaced));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;

    struct Billing;
    struct Shipping;

    fn registry() -> ClassRegistry {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<Billing>::new("App\\Billing\\Service")
                .constructor(vec![], |_| Ok(Billing))
                .build(),
        );
        registry.register(
            ClassBuilder::<Shipping>::new("App\\Shipping\\Service")
                .constructor(vec![], |_| Ok(Shipping))
                .build(),
        );
        registry
    }

    #[test]
    fn test_class_name_defaults_to_entry_name() {
        let mut definition = ObjectDefinition::new(None);
        definition.set_name("App\\Billing\\Service".to_string());
        assert_eq!(definition.class_name(), "App\\Billing\\Service");
        assert!(definition.class_facts(&registry()).instantiable);
    }

    #[test]
    fn test_wildcard_substitution_resets_facts() {
        let registry = registry();
        let template = ObjectDefinition::new(Some("App\\*\\Service".to_string()));

        // Facts for the pattern itself: no such class
        assert!(!template.class_facts(&registry).exists);

        let mut billing = template.clone();
        billing.replace_wildcards(&["Billing".to_string()]);
        assert_eq!(billing.class_name(), "App\\Billing\\Service");
        assert!(billing.class_facts(&registry).instantiable);

        let mut shipping = template.clone();
        shipping.replace_wildcards(&["Shipping".to_string()]);
        assert_eq!(shipping.class_name(), "App\\Shipping\\Service");
        assert!(shipping.class_facts(&registry).exists);

        let mut missing = template;
        missing.replace_wildcards(&["Missing".to_string()]);
        assert!(!missing.class_facts(&registry).exists);
    }

    #[test]
    fn test_extra_stars_kept_when_segments_run_out() {
        let mut definition = ObjectDefinition::new(Some("*\\*".to_string()));
        definition.replace_wildcards(&["App".to_string()]);
        assert_eq!(definition.class_name(), "App\\*");
    }

    #[test]
    fn test_method_injection_merges_into_first_call() {
        let mut definition = ObjectDefinition::new(Some("Mailer".to_string()));
        definition.add_method_injection(MethodInjection::new(
            "setHost",
            Parameters::new().with(0, "smtp.local"),
        ));
        definition.add_method_injection(MethodInjection::new(
            "setHost",
            Parameters::new().with(1, 25),
        ));
        definition.push_method_call(MethodInjection::new("addRecipient", Parameters::new()));
        definition.push_method_call(MethodInjection::new("addRecipient", Parameters::new()));

        let methods = definition.method_injections();
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0].parameters().len(), 2);
        assert!(definition.calls_method("addRecipient"));
    }

    #[test]
    fn test_property_injection_replaced_per_declaring_class() {
        let mut definition = ObjectDefinition::new(Some("Child".to_string()));
        definition.add_property_injection(PropertyInjection::new("level", 1));
        definition.add_property_injection(PropertyInjection::new("level", 2).declared_by("Parent"));
        definition.add_property_injection(PropertyInjection::new("level", 3));

        let properties = definition.property_injections();
        assert_eq!(properties.len(), 2);
        assert!(matches!(properties[0].value(), Argument::Value(v) if v.as_int() == Some(3)));
        assert_eq!(properties[1].class(), Some("Parent"));
    }
}
