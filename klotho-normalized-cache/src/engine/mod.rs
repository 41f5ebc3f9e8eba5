//! The cache write engine: identity computation, selection narrowing,
//! cache-only tagging, identity-aware merging and verified partial writes.

use crate::{
    cache_only::tag_cache_only_fields,
    error::CacheError,
    identity::{identity_of, EntityIdentity},
    merge::merge_under,
    store::{Store, StoreError},
    types::{selection_names, CacheOptions, EntitySpec, FieldSelector}
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;


/// The result of a [`CacheEngine::write`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome {
    /// The instance (possibly merged and tagged) that was written.
    Written(Value),
    /// The `require_cache_only` guard tripped; the input was returned
    /// unchanged and nothing was persisted. An optimization, not an error.
    Skipped(Value)
}

impl WriteOutcome {
    pub fn into_value(self) -> Value {
        match self {
            WriteOutcome::Written(value) => value,
            WriteOutcome::Skipped(value) => value
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

/// Performs partial, identity-aware writes into the underlying store.
///
/// Each write call is one atomic critical section relative to the single
/// logical writer: read, merge, write and verify happen without yielding in
/// between.
pub struct CacheEngine<S: Store> {
    store: Arc<S>,
    options: CacheOptions
}

impl<S: Store> CacheEngine<S> {
    /// Build an engine over `store` and seed every singleton spec with an
    /// all-null instance so observers attached to the cache fire on every
    /// subsequent update. Without the seed, "no data yet" would be
    /// indistinguishable from "intentionally empty".
    pub fn new(store: Arc<S>, options: CacheOptions) -> Result<Self, CacheError> {
        for spec in options.entities.iter().filter(|spec| spec.singleton) {
            validate(spec)?;
            let identity = EntityIdentity::Singleton(spec.name.clone());
            let null_instance = null_instance_of(&spec.selection);
            store.write_fragment(&spec.selection, &identity, &null_instance)?;
            debug!(entity = %identity, "seeded singleton identity");
        }
        Ok(Self { store, options })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Write `instance` at its computed identity and verify the write by
    /// reading it back. Returns the value actually used for the write.
    pub fn write(&self, spec: &EntitySpec, instance: &Value) -> Result<WriteOutcome, CacheError> {
        validate(spec)?;
        let fields = instance.as_object().ok_or_else(|| {
            CacheError::Configuration(format!(
                "instance of {:?} must be an object",
                spec.name
            ))
        })?;

        let identity = identity_of(spec, instance)?;

        // Only write fields the caller actually populated, and never write
        // remote-only fields locally.
        let narrowed: Vec<FieldSelector> = spec
            .selection
            .iter()
            .filter(|selector| fields.contains_key(selector.name()))
            .filter(|selector| !spec.remote_only.iter().any(|f| f == selector.name()))
            .cloned()
            .collect();

        if spec.require_cache_only && !has_cache_only_field(spec, &narrowed) {
            debug!(
                entity = %identity,
                "skipping write: selection carries no cache-only field"
            );
            return Ok(WriteOutcome::Skipped(instance.clone()));
        }

        let merged = if spec.merge_existing_first {
            match self.cached_fields(&narrowed, &identity)? {
                Some(existing) => merge_under(&existing, instance, &spec.id_paths),
                None => instance.clone()
            }
        } else {
            instance.clone()
        };

        let tagged = tag_cache_only_fields(&spec.name, &spec.cache_only, &merged);

        self.store.write_fragment(&narrowed, &identity, &tagged)?;

        self.store
            .read_fragment(&narrowed, &identity)
            .map_err(|source| CacheError::WriteVerification {
                identity: identity.to_string(),
                selection: selection_names(&narrowed),
                source
            })?;

        debug!(entity = %identity, fields = %selection_names(&narrowed), "wrote fragment");
        Ok(WriteOutcome::Written(tagged))
    }

    /// Read whichever of the selected fields are already cached at
    /// `identity`. Read field by field: a write that introduces a previously
    /// uncached field must still merge against its cached siblings, so one
    /// missing field never discards the rest of the fragment.
    fn cached_fields(
        &self,
        selection: &[FieldSelector],
        identity: &EntityIdentity
    ) -> Result<Option<Value>, CacheError> {
        let mut fields = serde_json::Map::new();
        for selector in selection {
            match self
                .store
                .read_fragment(std::slice::from_ref(selector), identity)
            {
                Ok(Value::Object(read)) => fields.extend(read),
                Ok(_) => {}
                Err(StoreError::Missing { .. }) => {}
                Err(e) => return Err(e.into())
            }
        }
        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Value::Object(fields)))
        }
    }
}

fn validate(spec: &EntitySpec) -> Result<(), CacheError> {
    if spec.name.is_empty() {
        return Err(CacheError::Configuration(
            "entity spec has no name".to_string()
        ));
    }
    if spec.selection.is_empty() {
        return Err(CacheError::Configuration(format!(
            "entity spec {:?} has an empty selection",
            spec.name
        )));
    }
    Ok(())
}

/// True if any narrowed selector is the first segment of a cache-only path.
fn has_cache_only_field(spec: &EntitySpec, narrowed: &[FieldSelector]) -> bool {
    narrowed.iter().any(|selector| {
        spec.cache_only
            .iter()
            .any(|path| path.split('.').next() == Some(selector.name()))
    })
}

fn null_instance_of(selection: &[FieldSelector]) -> Value {
    let fields = selection
        .iter()
        .map(|selector| (selector.name().to_string(), Value::Null))
        .collect();
    Value::Object(fields)
}
