//! Object construction and injection

use super::DefinitionResolver;
use crate::class::ClassMeta;
use crate::container::ServiceLocator;
use crate::definition::{InstanceDefinition, ObjectDefinition};
use crate::invoker::{Parameters, ResolutionContext};
use crate::{DiError, ObjectRef, Result, Value};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Name used when wrapping errors: the entry, or the class for anonymous definitions
fn entry_of(definition: &ObjectDefinition) -> &str {
    match definition.name() {
        "" => definition.class_name(),
        name => name,
    }
}

pub(super) fn resolve_object(
    resolver: &DefinitionResolver,
    definition: &ObjectDefinition,
    locator: &dyn ServiceLocator,
    overrides: &Parameters,
) -> Result<Value> {
    let entry = entry_of(definition);
    let class = definition.class_name();
    let facts = definition.class_facts(resolver.registry());

    if !facts.exists {
        return Err(DiError::invalid_definition(
            entry,
            format!("Entry \"{entry}\" cannot be resolved: the class {class} doesn't exist"),
        ));
    }
    if !facts.instantiable {
        return Err(DiError::invalid_definition(
            entry,
            format!("Entry \"{entry}\" cannot be resolved: the class {class} is not instantiable"),
        ));
    }

    if definition.is_lazy() && resolver.lazy_proxies() {
        if let Some(handle) = locator.weak_handle() {
            #[cfg(feature = "logging")]
            debug!(target: "autowire_di", entry, class, "Creating lazy proxy");

            let resolver = resolver.clone();
            let definition = definition.clone();
            let overrides = overrides.clone();
            return Ok(Value::Object(ObjectRef::lazy(
                class,
                Arc::new(move || {
                    let locator = handle.upgrade().ok_or_else(|| {
                        DiError::Internal(format!(
                            "container dropped before lazy entry \"{}\" was initialized",
                            entry_of(&definition)
                        ))
                    })?;
                    build_object(&resolver, &definition, locator.as_ref(), &overrides)
                }),
            )));
        }
    }

    build_object(resolver, definition, locator, overrides).map(Value::Object)
}

fn build_object(
    resolver: &DefinitionResolver,
    definition: &ObjectDefinition,
    locator: &dyn ServiceLocator,
    overrides: &Parameters,
) -> Result<ObjectRef> {
    let entry = entry_of(definition);
    let meta = class_meta(resolver, definition)?;
    let constructor = meta.constructor().ok_or_else(|| {
        DiError::invalid_definition(entry, format!("{} is not instantiable", meta.name()))
    })?;

    let mut parameters = definition
        .constructor_injection()
        .map(|injection| injection.parameters().clone())
        .unwrap_or_default();
    parameters.merge(overrides);

    let ctx = ResolutionContext::new(resolver, locator);
    let object = resolver
        .parameters()
        .resolve(&ctx, constructor.signature(), &parameters)
        .and_then(|args| meta.instantiate(args))
        .map_err(|e| DiError::dependency(entry, e))?;

    inject(resolver, definition, &meta, &object, locator).map_err(|e| DiError::dependency(entry, e))?;

    #[cfg(feature = "logging")]
    debug!(target: "autowire_di", entry, class = meta.name(), "Object created");

    Ok(object)
}

/// Apply injections to an object built outside the container; the object keeps its identity
pub(super) fn resolve_instance(
    resolver: &DefinitionResolver,
    definition: &InstanceDefinition,
    locator: &dyn ServiceLocator,
) -> Result<Value> {
    let instance = definition.instance();
    let object = definition.object_definition();

    match resolver.registry().class(instance.class()) {
        Some(meta) => inject(resolver, object, &meta, instance, locator)
            .map_err(|e| DiError::dependency(instance.class(), e))?,
        None if object.property_injections().is_empty() && object.method_injections().is_empty() => {}
        None => {
            return Err(DiError::invalid_definition(
                instance.class(),
                format!("cannot inject into {}: class is not registered", instance.class()),
            ));
        }
    }

    Ok(Value::Object(instance.clone()))
}

fn class_meta(resolver: &DefinitionResolver, definition: &ObjectDefinition) -> Result<Arc<ClassMeta>> {
    resolver.registry().class(definition.class_name()).ok_or_else(|| {
        DiError::invalid_definition(
            entry_of(definition),
            format!("the class {} doesn't exist", definition.class_name()),
        )
    })
}

/// Property injections, then explicit method calls, then autocall methods
fn inject(
    resolver: &DefinitionResolver,
    definition: &ObjectDefinition,
    meta: &ClassMeta,
    object: &ObjectRef,
    locator: &dyn ServiceLocator,
) -> Result<()> {
    let registry = resolver.registry();

    for injection in definition.property_injections() {
        if let Some(declaring) = injection.class() {
            if declaring != meta.name() && !registry.is_a(meta.name(), declaring) {
                return Err(DiError::invalid_definition(
                    entry_of(definition),
                    format!("{} is not a subclass of {}", meta.name(), declaring),
                ));
            }
        }
        let property = meta
            .property(injection.property(), injection.class())
            .ok_or_else(|| {
                DiError::invalid_definition(
                    entry_of(definition),
                    format!("unknown property {}::{}", meta.name(), injection.property()),
                )
            })?;
        let value = resolver.resolve_argument(injection.value(), locator)?;
        property.set(object, value)?;
    }

    let ctx = ResolutionContext::new(resolver, locator);

    for injection in definition.method_injections() {
        let method = meta.method(injection.method()).ok_or_else(|| {
            DiError::invalid_definition(
                entry_of(definition),
                format!("unknown method {}::{}", meta.name(), injection.method()),
            )
        })?;
        let args = resolver
            .parameters()
            .resolve(&ctx, method.signature(), injection.parameters())?;
        method.invoke(object, args)?;
    }

    if definition.is_autowired() {
        for (name, method) in meta.autocall_methods() {
            if definition.calls_method(name) {
                continue;
            }
            let args = resolver
                .parameters()
                .resolve(&ctx, method.signature(), &Parameters::new())?;
            method.invoke(object, args)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassRegistry};
    use crate::definition::Definition;
    use crate::definition::helpers::create;
    use crate::signature::Parameter;

    struct NoLocator;

    impl ServiceLocator for NoLocator {
        fn has(&self, _name: &str) -> bool {
            false
        }

        fn get(&self, name: &str) -> Result<Value> {
            Err(DiError::not_found(name))
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    fn resolver() -> DefinitionResolver {
        let registry = ClassRegistry::new();
        registry.register(
            ClassBuilder::<Recorder>::new("Recorder")
                .extends("Base")
                .constructor(vec![], |_| Ok(Recorder::default()))
                .property("p", |r: &mut Recorder, v| {
                    r.log.push(format!("p={}", v.as_int().unwrap_or_default()));
                    Ok(())
                })
                .method("a", vec![Parameter::new("x")], |r: &mut Recorder, args| {
                    r.log.push(format!("a{}", args.int(0)?));
                    Ok(Value::Null)
                })
                .method("b", vec![], |r: &mut Recorder, _| {
                    r.log.push("b".into());
                    Ok(Value::Null)
                })
                .build(),
        );
        DefinitionResolver::new(Arc::new(registry))
    }

    fn log_of(value: &Value) -> Vec<String> {
        value
            .as_object()
            .unwrap()
            .read::<Recorder, _>(|r| r.log.clone())
            .unwrap()
    }

    #[test]
    fn test_injections_run_in_declaration_order() {
        let definition = Definition::from(
            create(Some("Recorder"))
                .property("p", 1)
                .method("a", vec![1.into()])
                .method("b", vec![])
                .method_call("a", vec![2.into()]),
        )
        .named("recorder");

        let value = resolver().resolve(&definition, &NoLocator).unwrap();
        assert_eq!(log_of(&value), vec!["p=1", "a1", "b", "a2"]);
    }

    #[test]
    fn test_property_of_ancestor_accepted() {
        let definition = Definition::from(create(Some("Recorder")).property_of("Recorder", "p", 3))
            .named("recorder");

        let value = resolver().resolve(&definition, &NoLocator).unwrap();
        assert_eq!(log_of(&value), vec!["p=3"]);
    }

    #[test]
    fn test_property_of_unrelated_class_rejected() {
        let definition = Definition::from(create(Some("Recorder")).property_of("Unrelated", "p", 1))
            .named("recorder");

        let err = resolver().resolve(&definition, &NoLocator).unwrap_err();
        assert_eq!(err.entry_chain(), vec!["recorder"]);
        match err.root_cause() {
            DiError::InvalidDefinition { reason, .. } => {
                assert!(reason.contains("not a subclass of Unrelated"))
            }
            other => panic!("expected InvalidDefinition, got {other:?}"),
        }
    }
}
