//! Wraps a single step so its bare output is merged, under a given name,
//! into the growing binding record.

use crate::{
    bindings::{BindingValue, Bindings, Continuation, Rendered},
    error::PipelineError,
    step::{Step, StepOutput}
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A tree builder whose continuation receives the merged binding record
/// instead of the step's bare value.
pub type BoundTreeBuilder =
    Box<dyn FnOnce(Continuation) -> Result<Option<Rendered>, PipelineError> + Send>;

pub enum BoundOutput {
    Async(BoxFuture<'static, Result<Bindings, PipelineError>>),
    Tree(BoundTreeBuilder)
}

/// A named step whose output merges `{name: value}` into the incoming
/// bindings. Failures and placeholders from the underlying step pass through
/// unchanged; the accumulator never attempts to recover.
#[derive(Clone)]
pub struct BoundStep {
    name: String,
    step: Arc<dyn Step>,
    concat: bool
}

/// Merge the step's output under `name`, replacing any prior slot.
pub fn bind<N: Into<String>>(name: N, step: Arc<dyn Step>) -> BoundStep {
    BoundStep {
        name: name.into(),
        step,
        concat: false
    }
}

/// Merge the step's output under `name`, appending when the slot already
/// holds a sequence. Used when several steps in sequence fill the same
/// logical slot, e.g. repeated mutation calls.
pub fn bind_concat<N: Into<String>>(name: N, step: Arc<dyn Step>) -> BoundStep {
    BoundStep {
        name: name.into(),
        step,
        concat: true
    }
}

impl BoundStep {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_concat(&self) -> bool {
        self.concat
    }

    pub fn run(&self, bindings: &Bindings) -> BoundOutput {
        let incoming = bindings.clone();
        let name = self.name.clone();
        let concat = self.concat;

        match self.step.run(bindings) {
            StepOutput::Async(fut) => BoundOutput::Async(Box::pin(async move {
                let value = fut.await?;
                tracing::trace!(step = %name, "async step resolved");
                Ok(merge(&incoming, &name, value, concat))
            })),
            StepOutput::Tree(builder) => BoundOutput::Tree(Box::new(move |continue_with| {
                builder(Box::new(move |value| {
                    let merged = merge(&incoming, &name, value, concat);
                    continue_with.call(&merged)
                }))
            }))
        }
    }
}

fn merge(bindings: &Bindings, name: &str, value: serde_json::Value, concat: bool) -> Bindings {
    if concat {
        bindings.merged_concat(name, value)
    } else {
        bindings.merged(name, BindingValue::Data(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{self, TreeBuilder};
    use serde_json::json;

    #[tokio::test]
    async fn merges_the_bare_value_under_the_given_name() {
        let step = step::from_async(|_bindings| async { Ok(json!(42)) });
        let bound = bind("answer", step);
        let incoming = Bindings::new().insert("prior", json!("kept"));

        let result = match bound.run(&incoming) {
            BoundOutput::Async(fut) => fut.await.unwrap(),
            BoundOutput::Tree(_) => panic!("async step must produce an async output")
        };

        // keys(B) ∪ {n}, with result[n] equal to the raw output
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["prior", "answer"]);
        assert_eq!(result.data("answer"), Some(&json!(42)));
        assert_eq!(result.data("prior"), Some(&json!("kept")));
    }

    #[tokio::test]
    async fn failures_pass_through_unchanged() {
        let step = step::from_async(|_bindings| async {
            Err(PipelineError::Configuration("boom".to_string()))
        });
        let bound = bind("x", step);

        let result = match bound.run(&Bindings::new()) {
            BoundOutput::Async(fut) => fut.await,
            BoundOutput::Tree(_) => unreachable!()
        };
        assert!(matches!(result, Err(PipelineError::Configuration(msg)) if msg == "boom"));
    }

    #[test]
    fn tree_continuation_sees_the_merged_record() {
        let step = step::from_tree(|_bindings| -> TreeBuilder {
            Box::new(|continue_with| continue_with(json!("value")).map(Some))
        });
        let bound = bind("slot", step);
        let incoming = Bindings::new().insert("prior", json!(1));

        let rendered = match bound.run(&incoming) {
            BoundOutput::Tree(builder) => builder(Continuation::new(|bindings| {
                Rendered::Bindings(bindings.clone())
            }))
            .unwrap()
            .unwrap(),
            BoundOutput::Async(_) => panic!("tree step must produce a tree output")
        };

        let bindings = rendered.as_bindings().unwrap();
        assert_eq!(bindings.data("prior"), Some(&json!(1)));
        assert_eq!(bindings.data("slot"), Some(&json!("value")));
    }

    #[test]
    fn placeholders_pass_through_unchanged() {
        let step = step::placeholder("loading");
        let bound = bind("slot", step);

        let rendered = match bound.run(&Bindings::new()) {
            BoundOutput::Tree(builder) => builder(Continuation::new(|bindings| {
                Rendered::Bindings(bindings.clone())
            }))
            .unwrap()
            .unwrap(),
            BoundOutput::Async(_) => unreachable!()
        };
        assert_eq!(rendered, Rendered::Placeholder("loading".to_string()));
    }

    #[tokio::test]
    async fn concat_appends_instead_of_replacing() {
        let step = step::from_async(|_bindings| async { Ok(json!(2)) });
        let bound = bind_concat("results", step);
        let incoming = Bindings::new().insert("results", json!([1]));

        let result = match bound.run(&incoming) {
            BoundOutput::Async(fut) => fut.await.unwrap(),
            BoundOutput::Tree(_) => unreachable!()
        };
        assert_eq!(result.data("results"), Some(&json!([1, 2])));
    }
}
