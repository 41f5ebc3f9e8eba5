//! The store capability consumed by the cache engine, plus an in-memory
//! reference implementation.

mod memory;

pub use memory::InMemoryStore;

use crate::{identity::EntityIdentity, types::FieldSelector};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A read found no data for the selection at the identity. A miss is
    /// signaled by this error, never by a null value; callers must catch.
    #[error("no cached data at {identity} for field {field:?}")]
    Missing { identity: String, field: String },

    /// Fragment writes only accept object-shaped values.
    #[error("cannot write a non-object value at {identity}")]
    NotAnObject { identity: String }
}

/// Field-level fragment access to the underlying cache.
///
/// `write_fragment` is a partial write: only the selected fields present on
/// the value are touched, everything else already cached at the identity is
/// preserved.
pub trait Store: Send + Sync {
    fn read_fragment(
        &self,
        selection: &[FieldSelector],
        identity: &EntityIdentity
    ) -> Result<Value, StoreError>;

    fn write_fragment(
        &self,
        selection: &[FieldSelector],
        identity: &EntityIdentity,
        value: &Value
    ) -> Result<(), StoreError>;
}
