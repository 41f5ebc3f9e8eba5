use std::fmt;
use thiserror::Error;

/// The execution mode a composed pipeline runs in. Fixed once per invocation
/// by inspecting the incoming bindings; never mixed mid-pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Async,
    Tree
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Async => write!(f, "async"),
            Mode::Tree => write!(f, "tree")
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The step list or its inputs are malformed. Never retried.
    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A step produced an output arm that contradicts the mode fixed for the
    /// whole pipeline. Indicates a caller bug in the step contract.
    #[error("step {step:?} produced a {produced} result while running in {mode} mode")]
    ModeAmbiguity {
        step: String,
        mode: Mode,
        produced: &'static str
    },

    /// A tree build yielded no rendered value. An omitted render usually
    /// means a forgotten continuation call, which would otherwise hang the
    /// chain silently, so this fails fast.
    #[error("tree step {0:?} produced no rendered value; was the continuation called?")]
    EmptyRender(String),

    /// A failure from inside a step, passed through unchanged.
    #[error(transparent)]
    Step(Box<dyn std::error::Error + Send + Sync>)
}

impl PipelineError {
    /// Wrap an underlying step failure without altering it.
    pub fn step<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        PipelineError::Step(Box::new(e))
    }
}
