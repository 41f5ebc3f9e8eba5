//! Composes an ordered list of named steps into one callable that behaves
//! correctly whether the underlying steps are asynchronous computations or
//! continuation-passing tree builders.

use crate::{
    accumulator::{self, BoundOutput, BoundStep},
    bindings::{Bindings, Continuation, Rendered},
    error::{Mode, PipelineError},
    protocol,
    step::Step
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// An ordered, named step list. Validated once by [`Pipeline::compose`];
/// afterwards the composed pipeline can be invoked any number of times.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<BoundStep>
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step whose output is merged under `name`.
    pub fn then<N: Into<String>>(mut self, name: N, step: Arc<dyn Step>) -> Self {
        self.steps.push(accumulator::bind(name, step));
        self
    }

    /// Append a step whose output is appended to the sequence under `name`.
    pub fn then_concat<N: Into<String>>(mut self, name: N, step: Arc<dyn Step>) -> Self {
        self.steps.push(accumulator::bind_concat(name, step));
        self
    }

    /// Validate the step list and produce the composed pipeline.
    pub fn compose(self) -> Result<Composed, PipelineError> {
        let mut seen: Vec<(&str, bool)> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let name = step.name();
            if name.is_empty() {
                return Err(PipelineError::Configuration(
                    "step names must not be empty".to_string()
                ));
            }
            if name == protocol::RENDER_KEY || name == protocol::CHILDREN_KEY {
                return Err(PipelineError::Configuration(format!(
                    "step name {:?} would clobber a continuation slot",
                    name
                )));
            }
            // Concat steps share a logical slot on purpose, but only with
            // each other; a plain binding in the same slot would be clobbered.
            if let Some(&(_, prior_concat)) = seen.iter().find(|(seen_name, _)| *seen_name == name)
            {
                if !(prior_concat && step.is_concat()) {
                    return Err(PipelineError::Configuration(format!(
                        "duplicate step name {:?}",
                        name
                    )));
                }
            }
            seen.push((name, step.is_concat()));
        }
        Ok(Composed {
            steps: Arc::new(self.steps)
        })
    }
}

/// The composed pipeline's tree-mode result: still needs the true
/// continuation before anything renders.
pub type ComposedTreeBuilder = Box<dyn FnOnce(Continuation) -> Result<Rendered, PipelineError> + Send>;

/// The uniform result of invoking a composed pipeline with bindings.
pub enum PipelineRun {
    Async(BoxFuture<'static, Result<Bindings, PipelineError>>),
    Tree(ComposedTreeBuilder)
}

type Chain = Arc<dyn Fn(Bindings) -> Result<Rendered, PipelineError> + Send + Sync>;

#[derive(Clone)]
pub struct Composed {
    steps: Arc<Vec<BoundStep>>
}

impl Composed {
    /// Invoke the pipeline. The incoming bindings are inspected exactly once
    /// to fix the execution mode for the entire run: bindings carrying a
    /// continuation select tree mode, everything else selects async mode.
    pub fn call(&self, bindings: Bindings) -> PipelineRun {
        if protocol::has_continuation(&bindings) {
            PipelineRun::Tree(self.tree_chain(bindings))
        } else {
            PipelineRun::Async(self.async_chain(bindings))
        }
    }

    /// Run to completion in async mode.
    pub async fn run(&self, bindings: Bindings) -> Result<Bindings, PipelineError> {
        match self.call(bindings) {
            PipelineRun::Async(fut) => fut.await,
            PipelineRun::Tree(_) => Err(PipelineError::Configuration(
                "bindings carry a continuation; use render() for tree mode".to_string()
            ))
        }
    }

    /// Build in tree mode and immediately invoke the continuation found in
    /// the bindings as the true continuation.
    pub fn render(&self, bindings: Bindings) -> Result<Rendered, PipelineError> {
        let continuation = protocol::continuation_of(&bindings)
            .cloned()
            .ok_or_else(|| {
                PipelineError::Configuration(
                    "render() requires a continuation-designating key in the bindings".to_string()
                )
            })?;
        match self.call(bindings) {
            PipelineRun::Tree(builder) => builder(continuation),
            PipelineRun::Async(_) => unreachable!("continuation presence selects tree mode")
        }
    }

    /// Strict left-to-right sequential chaining. Step N+1 sees the record
    /// produced by steps 1..N; no parallelism, no reordering.
    fn async_chain(&self, bindings: Bindings) -> BoxFuture<'static, Result<Bindings, PipelineError>> {
        let steps = self.steps.clone();
        Box::pin(async move {
            let mut bindings = bindings;
            for step in steps.iter() {
                match step.run(&bindings) {
                    BoundOutput::Async(fut) => bindings = fut.await?,
                    BoundOutput::Tree(_) => {
                        return Err(PipelineError::ModeAmbiguity {
                            step: step.name().to_owned(),
                            mode: Mode::Async,
                            produced: "tree"
                        })
                    }
                }
            }
            Ok(bindings)
        })
    }

    /// Right-to-left fold into a linked chain of builders. The innermost
    /// link invokes the true continuation with the fully accumulated record;
    /// each earlier declared step structurally wraps the chain built so far,
    /// so the first declared step ends up outermost and runs first.
    fn tree_chain(&self, bindings: Bindings) -> ComposedTreeBuilder {
        let steps = self.steps.clone();
        Box::new(move |continuation: Continuation| {
            let mut chain: Chain = Arc::new(move |bindings: Bindings| continuation.call(&bindings));
            for step in steps.iter().rev() {
                let step = step.clone();
                let inner = chain;
                chain = Arc::new(move |bindings: Bindings| match step.run(&bindings) {
                    BoundOutput::Tree(builder) => {
                        let inner = inner.clone();
                        let rendered = builder(Continuation::fallible(move |merged| {
                            (inner.as_ref())(merged.clone())
                        }))?;
                        rendered.ok_or_else(|| PipelineError::EmptyRender(step.name().to_owned()))
                    }
                    BoundOutput::Async(_) => Err(PipelineError::ModeAmbiguity {
                        step: step.name().to_owned(),
                        mode: Mode::Tree,
                        produced: "async"
                    })
                });
            }
            (chain.as_ref())(bindings)
        })
    }
}
