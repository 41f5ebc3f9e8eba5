//! A normalized, identity-aware write-through cache engine for [klotho]
//! pipelines.
//!
//! The engine performs *partial* writes: an entity's identity is computed
//! from its spec (`Typename:id`, or the bare type name for singletons), the
//! output selection is narrowed to the fields the caller actually populated,
//! and only those fields are written at the identity, leaving everything
//! else already cached untouched. Every write is verified by reading the
//! same selection back.
//!
//! Cache-only sub-objects are tagged with a synthetic per-path type name so
//! the store's per-type merge policy can treat locally owned data
//! differently from remote data. Arrays are merged element-wise using
//! configurable identity paths instead of being replaced wholesale.
//!
//! # Example
//!
//! ```
//! use klotho_normalized_cache::{
//!     CacheEngine, CacheOptions, EntitySpec, InMemoryStore, scalar
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let engine = CacheEngine::new(store, CacheOptions::default()).unwrap();
//!
//! let spec = EntitySpec::new("Todo", vec![scalar("id"), scalar("title")]);
//! let written = engine
//!     .write(&spec, &json!({"id": "1", "title": "ship it"}))
//!     .unwrap();
//! assert!(written.was_written());
//! ```
//!
//! Steps that touch the cache participate in a pipeline through
//! [`CacheWriteStep`], which reads the instance to persist from a named
//! binding and yields the written instance.

mod cache_only;
pub mod engine;
mod error;
pub mod identity;
mod merge;
mod step;
pub mod store;
mod types;

pub use cache_only::tag_cache_only_fields;
pub use engine::{CacheEngine, WriteOutcome};
pub use error::CacheError;
pub use identity::{identity_of, resolve_id, EntityIdentity, DEFAULT_ID_FIELD};
pub use step::CacheWriteStep;
pub use store::{InMemoryStore, Store, StoreError};
pub use types::{object, scalar, CacheOptions, EntitySpec, FieldSelector, IdPathLookup, IdPaths};
