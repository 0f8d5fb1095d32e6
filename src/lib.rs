//! # Autowire DI - Definition-Driven Dependency Injection for Rust
//!
//! A container that builds entries from declarative definitions: plain
//! values, environment variables, string templates, arrays, objects with
//! constructor/property/method injection, factories and decorators.
//!
//! ## Features
//!
//! - **Definitions** - Describe how an entry is built, resolve it on first use
//! - **Autowiring** - Registered classes resolve without any definition
//! - **Invoker** - Call any function or method; parameters are guessed from
//!   explicit values, the container and defaults
//! - **Layered sources** - Later sources override or extend earlier ones
//!   (array extensions, decorators)
//! - **Wildcards** - One definition for a whole family of entry names
//! - **Lock-free** - Resolved entries and class metadata live in `DashMap`s
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use autowire_di::{ClassBuilder, ClassRegistry, Container, Parameter};
//! use autowire_di::helpers::{create, get, value};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let registry = ClassRegistry::new();
//! registry.register(
//!     ClassBuilder::<Database>::new("Database")
//!         .constructor(vec![Parameter::new("url")], |args| {
//!             Ok(Database { url: args.string(0)? })
//!         })
//!         .build(),
//! );
//!
//! let container = Container::with_registry(Arc::new(registry));
//! container.set("db.url", value("postgres://localhost")).unwrap();
//! container
//!     .set("Database", create(None).constructor(vec![get("db.url").into()]))
//!     .unwrap();
//!
//! let db = container.get("Database").unwrap();
//! let url = db.as_object().unwrap().read::<Database, _>(|d| d.url.clone()).unwrap();
//! assert_eq!(url, "postgres://localhost");
//! ```
//!
//! ## Calling Functions
//!
//! ```rust
//! use autowire_di::{Container, Function, Parameter, Parameters, Signature, Value};
//!
//! let container = Container::new();
//! container.set_value("greeting", "hello").unwrap();
//!
//! let greet = Function::new(
//!     Signature::new(
//!         "greet",
//!         vec![Parameter::new("greeting"), Parameter::new("name").default_value("world")],
//!     ),
//!     |args| Ok(Value::from(format!("{} {}", args.string(0)?, args.string(1)?))),
//! );
//!
//! let result = container.call(greet, &Parameters::new()).unwrap();
//! assert_eq!(result.as_str(), Some("hello world"));
//! ```
//!
//! ## Logging
//!
//! With the default `logging` feature every registration, resolution and
//! invocation emits a `tracing` event under the `autowire_di` target. Enable
//! `logging-json` or `logging-pretty` to get a ready-made subscriber in
//! [`logging`].

mod builder;
mod class;
mod container;
mod definition;
mod error;
mod invoker;
#[cfg(feature = "logging")]
pub mod logging;
mod resolver;
mod signature;
mod source;
mod storage;
mod value;

pub use builder::*;
pub use class::*;
pub use container::*;
pub use definition::helpers;
pub use definition::{
    Argument, ArrayDefinition, ArrayDefinitionExtension, DecoratorDefinition, Definition,
    EnvironmentVariableDefinition, FactoryDefinition, InstanceDefinition, MethodInjection,
    ObjectDefinition, PropertyInjection, Reference, StringDefinition, ValueDefinition,
};
pub use error::*;
pub use invoker::*;
pub use resolver::{DefinitionResolver, EnvReader};
pub use signature::*;
pub use source::*;
pub use storage::EntryStorage;
pub use value::{AnyObject, Arguments, Function, NativeFn, ObjectRef, Value};

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::helpers::*;
    pub use crate::{
        ClassBuilder, ClassRegistry, Container, ContainerBuilder, DefinitionArray, DiError,
        Function, ObjectRef, Parameter, Parameters, Result, Signature, Value,
    };
    pub use std::sync::Arc;
}
