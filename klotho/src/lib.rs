//! Effect-polymorphic pipeline composition.
//!
//! A pipeline is an ordered list of named steps. The exact same declarative
//! list can run in two ways:
//!
//! * **async mode** - each step is an asynchronous computation; steps are
//!   chained strictly left to right, each one seeing the binding record
//!   accumulated by all steps before it.
//! * **tree mode** - each step is a continuation-passing tree builder; the
//!   composed pipeline nests the builders so the first declared step wraps
//!   all later ones, and the caller's continuation receives the fully
//!   accumulated record at the innermost position.
//!
//! The mode is chosen once per invocation by inspecting the incoming
//! bindings: a record carrying a continuation under `render` (or `children`
//! as a fallback) selects tree mode, anything else selects async mode.
//! Modes are never mixed mid-pipeline.
//!
//! # Getting started
//!
//! ```
//! use klotho::{Pipeline, Bindings, step};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new()
//!     .then("x", step::from_value(|_| Ok(json!(1))))
//!     .then("y", step::from_value(|bindings| {
//!         let x = bindings.data("x").and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(json!(x + 1))
//!     }))
//!     .compose()
//!     .unwrap();
//!
//! let result = futures::executor::block_on(pipeline.run(Bindings::new())).unwrap();
//! assert_eq!(result.data("x"), Some(&json!(1)));
//! assert_eq!(result.data("y"), Some(&json!(2)));
//! ```
//!
//! In tree mode the same pipeline is built into a nested structure and
//! rendered by supplying the continuation immediately after composing:
//!
//! ```
//! # use klotho::{Pipeline, Bindings, Continuation, Rendered, step};
//! # use serde_json::json;
//! # let pipeline = Pipeline::new()
//! #     .then("x", step::from_value(|_| Ok(json!(1))))
//! #     .compose()
//! #     .unwrap();
//! let identity = Continuation::new(|bindings| Rendered::Bindings(bindings.clone()));
//! let rendered = pipeline.render(Bindings::with_render(identity)).unwrap();
//! let bindings = rendered.as_bindings().unwrap();
//! assert_eq!(bindings.data("x"), Some(&json!(1)));
//! ```
//!
//! # Steps
//!
//! Anything implementing [`Step`] can participate: query execution, mutation
//! execution, cache writes. A step receives the current bindings and
//! produces a *bare* value; the pipeline merges that value into the record
//! under the step's declared name. See [`step`] for the closure adapters.

pub mod accumulator;
mod bindings;
pub mod composer;
mod error;
pub mod protocol;
pub mod step;

pub use bindings::{BindingValue, Bindings, Continuation, Rendered};
pub use composer::{Composed, Pipeline, PipelineRun};
pub use error::{Mode, PipelineError};
pub use step::{Step, StepOutput};
