use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument};

use crate::application::error::PartialError;

use super::{FragmentRequest, PartialDeps, Produced, ProducerRegistry};

/// Entry point for `/partials`: looks up the producer for a component and runs it.
#[derive(Clone)]
pub struct PartialResolver {
    registry: Arc<ProducerRegistry>,
    deps: PartialDeps,
}

impl PartialResolver {
    pub fn new(registry: Arc<ProducerRegistry>, deps: PartialDeps) -> Self {
        Self { registry, deps }
    }

    pub fn registry(&self) -> &ProducerRegistry {
        &self.registry
    }

    /// Resolve `component` against the registry. Producer errors propagate
    /// unchanged; an unknown key fails before anything is constructed.
    #[instrument(skip(self, request), fields(component = %component))]
    pub async fn resolve(
        &self,
        component: &str,
        request: FragmentRequest,
    ) -> Result<Produced, PartialError> {
        let Some(factory) = self.registry.get(component) else {
            counter!(
                "stacks_partials_resolved_total",
                "component" => "unknown",
                "outcome" => "unresolved"
            )
            .increment(1);
            return Err(PartialError::UnresolvedComponent(component.to_string()));
        };

        let producer = factory(&self.deps, request);
        let result = producer.generate().await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!(
            "stacks_partials_resolved_total",
            "component" => component.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        debug!(outcome, "fragment resolved");

        result
    }
}
