//! Pipeline integration: a step that persists a previously bound instance
//! through the cache engine.

use crate::{engine::CacheEngine, store::Store, types::EntitySpec};
use klotho::{protocol, Bindings, PipelineError, Step, StepOutput};
use std::sync::Arc;

/// A [`Step`] that takes the instance from a named binding, writes it
/// through the engine and yields the written instance as its bare value.
///
/// Usable in both execution modes: the write itself is synchronous relative
/// to the single logical writer, so the tree arm runs it inline and the
/// async arm wraps it in a ready computation.
pub struct CacheWriteStep<S: Store> {
    engine: Arc<CacheEngine<S>>,
    spec: EntitySpec,
    source: String
}

impl<S: Store> CacheWriteStep<S> {
    /// `source` names the binding slot holding the instance to persist.
    pub fn new<N: Into<String>>(
        engine: Arc<CacheEngine<S>>,
        spec: EntitySpec,
        source: N
    ) -> Self {
        Self {
            engine,
            spec,
            source: source.into()
        }
    }

    fn write(&self, bindings: &Bindings) -> Result<serde_json::Value, PipelineError> {
        let instance = bindings.data(&self.source).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "no binding named {:?} to write to the cache",
                self.source
            ))
        })?;
        let outcome = self
            .engine
            .write(&self.spec, instance)
            .map_err(PipelineError::step)?;
        Ok(outcome.into_value())
    }
}

impl<S: Store + 'static> Step for CacheWriteStep<S> {
    fn run(&self, bindings: &Bindings) -> StepOutput {
        let written = self.write(bindings);
        if protocol::has_continuation(bindings) {
            StepOutput::Tree(Box::new(move |continue_with| {
                written.and_then(continue_with).map(Some)
            }))
        } else {
            StepOutput::Async(Box::pin(async move { written }))
        }
    }
}
