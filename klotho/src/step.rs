use crate::{
    bindings::{Bindings, Rendered},
    error::PipelineError,
    protocol
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::{future::Future, sync::Arc};

/// The asynchronous arm of a step result: a computation of the step's bare
/// output value.
pub type AsyncOutput = BoxFuture<'static, Result<Value, PipelineError>>;

/// Receives the step's bare output value exactly once and produces the
/// rendered subtree below it.
pub type ValueContinuation = Box<dyn FnOnce(Value) -> Result<Rendered, PipelineError> + Send>;

/// The continuation-passing arm of a step result. The builder either calls
/// its continuation with the produced value or returns a placeholder without
/// calling it; returning `None` is a caller bug and fails the pipeline fast.
pub type TreeBuilder =
    Box<dyn FnOnce(ValueContinuation) -> Result<Option<Rendered>, PipelineError> + Send>;

/// A step's output, discriminated explicitly instead of by structural
/// sniffing. The tag is fixed when the step runs and must agree with the
/// pipeline's execution mode.
pub enum StepOutput {
    Async(AsyncOutput),
    Tree(TreeBuilder)
}

impl StepOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutput::Async(_) => "async",
            StepOutput::Tree(_) => "tree"
        }
    }
}

/// A unit of pipeline work. Receives the bindings accumulated by all prior
/// steps and produces a bare value through one of the two output arms.
///
/// External collaborators (query execution, mutation execution, cache
/// writes) conform to this to participate in a pipeline.
pub trait Step: Send + Sync {
    fn run(&self, bindings: &Bindings) -> StepOutput;
}

struct AsyncFnStep<F>(F);

impl<F, Fut> Step for AsyncFnStep<F>
where
    F: Fn(Bindings) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, PipelineError>> + Send + 'static
{
    fn run(&self, bindings: &Bindings) -> StepOutput {
        StepOutput::Async(Box::pin((self.0)(bindings.clone())))
    }
}

struct TreeFnStep<F>(F);

impl<F> Step for TreeFnStep<F>
where
    F: Fn(Bindings) -> TreeBuilder + Send + Sync
{
    fn run(&self, bindings: &Bindings) -> StepOutput {
        StepOutput::Tree((self.0)(bindings.clone()))
    }
}

struct ValueFnStep<F>(F);

impl<F> Step for ValueFnStep<F>
where
    F: Fn(&Bindings) -> Result<Value, PipelineError> + Send + Sync + 'static
{
    fn run(&self, bindings: &Bindings) -> StepOutput {
        if protocol::has_continuation(bindings) {
            let value = (self.0)(bindings);
            StepOutput::Tree(Box::new(move |continue_with| value.and_then(continue_with).map(Some)))
        } else {
            let value = (self.0)(bindings);
            StepOutput::Async(Box::pin(async move { value }))
        }
    }
}

/// A step backed by an async closure. Only usable in async mode.
pub fn from_async<F, Fut>(f: F) -> Arc<dyn Step>
where
    F: Fn(Bindings) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, PipelineError>> + Send + 'static
{
    Arc::new(AsyncFnStep(f))
}

/// A step backed by a tree-builder factory. Only usable in tree mode.
pub fn from_tree<F>(f: F) -> Arc<dyn Step>
where
    F: Fn(Bindings) -> TreeBuilder + Send + Sync + 'static
{
    Arc::new(TreeFnStep(f))
}

/// A pure step usable in either mode: the closure computes the bare value
/// synchronously and the output arm is chosen to match the caller's mode.
pub fn from_value<F>(f: F) -> Arc<dyn Step>
where
    F: Fn(&Bindings) -> Result<Value, PipelineError> + Send + Sync + 'static
{
    Arc::new(ValueFnStep(f))
}

/// A tree-mode step that renders a fixed placeholder instead of producing a
/// value. The explicit representation of "waiting for data".
pub fn placeholder<M: Into<String>>(message: M) -> Arc<dyn Step> {
    let message = message.into();
    from_tree(move |_bindings| {
        let message = message.clone();
        Box::new(move |_continue_with| Ok(Some(Rendered::Placeholder(message))))
    })
}
