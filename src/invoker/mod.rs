//! Invoking callables with container-resolved parameters

mod callable;
mod parameter;

pub use callable::*;
pub use parameter::*;

use crate::container::ServiceLocator;
use crate::resolver::DefinitionResolver;
use crate::{Result, Value};

#[cfg(feature = "logging")]
use tracing::debug;

/// Calls functions, methods and invokable objects, filling their parameters
/// through the resolver chain.
#[derive(Clone, Debug)]
pub struct Invoker {
    resolver: DefinitionResolver,
}

impl Invoker {
    pub fn new(resolver: DefinitionResolver) -> Self {
        Self { resolver }
    }

    /// Call `callable` with explicit `parameters`; everything else is guessed
    pub fn call(
        &self,
        locator: &dyn ServiceLocator,
        callable: impl Into<CallableRef>,
        parameters: &Parameters,
    ) -> Result<Value> {
        let callable = callable.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            callable = %callable.describe(),
            explicit = parameters.len(),
            "Invoking callable"
        );

        let target = CallableResolver::new(self.resolver.registry()).resolve(&callable, locator)?;
        let ctx = ResolutionContext::new(&self.resolver, locator);
        self.invoke(&ctx, &target, parameters)
    }

    /// Fill the signature of an already resolved target and run it
    pub fn invoke(
        &self,
        ctx: &ResolutionContext<'_>,
        target: &Invocable,
        parameters: &Parameters,
    ) -> Result<Value> {
        let args = self
            .resolver
            .parameters()
            .resolve(ctx, target.signature(), parameters)?;
        target.invoke(args)
    }
}
