use crate::{
    identity::EntityIdentity,
    store::{Store, StoreError},
    types::FieldSelector
};
use fnv::FnvBuildHasher;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

type FieldMap = HashMap<String, Value, FnvBuildHasher>;
type EntityMap = HashMap<String, FieldMap, FnvBuildHasher>;

/// An entity-keyed field table guarded by a single lock. Process-scoped; it
/// lives until explicitly cleared.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<EntityMap>
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain-map copy of the raw tables, for assertions and debugging.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, Value>> {
        self.records
            .read()
            .iter()
            .map(|(entity, fields)| {
                (
                    entity.clone(),
                    fields
                        .iter()
                        .map(|(field, value)| (field.clone(), value.clone()))
                        .collect()
                )
            })
            .collect()
    }

    /// Replace the tables wholesale, e.g. from a snapshot taken earlier.
    pub fn hydrate(&self, state: HashMap<String, HashMap<String, Value>>) {
        let mut records = self.records.write();
        records.clear();
        for (entity, fields) in state {
            records.insert(entity, fields.into_iter().collect());
        }
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl Store for InMemoryStore {
    fn read_fragment(
        &self,
        selection: &[FieldSelector],
        identity: &EntityIdentity
    ) -> Result<Value, StoreError> {
        let records = self.records.read();
        let entity = records.get(&identity.cache_key()).ok_or_else(|| {
            StoreError::Missing {
                identity: identity.to_string(),
                field: "*".to_string()
            }
        })?;

        let mut out = serde_json::Map::with_capacity(selection.len());
        for selector in selection {
            let name = selector.name();
            let value = entity.get(name).ok_or_else(|| StoreError::Missing {
                identity: identity.to_string(),
                field: name.to_string()
            })?;
            out.insert(name.to_string(), value.clone());
        }
        Ok(Value::Object(out))
    }

    fn write_fragment(
        &self,
        selection: &[FieldSelector],
        identity: &EntityIdentity,
        value: &Value
    ) -> Result<(), StoreError> {
        let fields = value.as_object().ok_or_else(|| StoreError::NotAnObject {
            identity: identity.to_string()
        })?;

        let mut records = self.records.write();
        let entity = records.entry(identity.cache_key()).or_default();
        for selector in selection {
            let name = selector.name();
            if let Some(field_value) = fields.get(name) {
                entity.insert(name.to_string(), field_value.clone());
            }
        }
        Ok(())
    }
}
