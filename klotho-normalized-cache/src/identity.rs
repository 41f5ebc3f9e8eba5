//! Entity identities and the identity path resolver.

use crate::{
    error::CacheError,
    types::{EntitySpec, IdPathLookup}
};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_ID_FIELD: &str = "id";

/// The key under which a cached object is addressed: `(typename, id)` for
/// normal entities, the type name alone for singletons.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityIdentity {
    Singleton(String),
    Keyed { typename: String, id: String }
}

impl EntityIdentity {
    pub fn typename(&self) -> &str {
        match self {
            EntityIdentity::Singleton(typename) => typename,
            EntityIdentity::Keyed { typename, .. } => typename
        }
    }

    /// The key the underlying store indexes this identity by.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityIdentity::Singleton(typename) => write!(f, "{}", typename),
            EntityIdentity::Keyed { typename, id } => write!(f, "{}:{}", typename, id)
        }
    }
}

/// Compute the identity the given instance is cached under.
///
/// Keyed identities render as `Typename:idValue`. When the id field is not
/// literally `id`, the value is the JSON object `{"<idField>":"<value>"}` to
/// mirror how the underlying cache indexes non-primary-key lookups.
pub fn identity_of(spec: &EntitySpec, instance: &Value) -> Result<EntityIdentity, CacheError> {
    if spec.singleton {
        return Ok(EntityIdentity::Singleton(spec.name.clone()));
    }

    let id_field = spec.id_field.as_deref().unwrap_or(DEFAULT_ID_FIELD);
    let id_value = instance
        .get(id_field)
        .filter(|value| !value.is_null())
        .ok_or_else(|| {
            CacheError::Configuration(format!(
                "instance of {:?} has no value at id field {:?}",
                spec.name, id_field
            ))
        })?;

    let id = if id_field == DEFAULT_ID_FIELD {
        scalar_to_string(id_value)
    } else {
        Value::Object(
            std::iter::once((id_field.to_owned(), id_value.clone())).collect()
        )
        .to_string()
    };

    Ok(EntityIdentity::Keyed {
        typename: spec.name.clone(),
        id
    })
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string()
    }
}

/// Find the first identity path that resolves to a non-null value on `item`.
///
/// Looks up the paths configured for `field_name`, defaulting to the single
/// path `id`. Returns `None` when no path resolves, which callers interpret
/// as "cannot merge this array element, fall back to the authoritative side"
/// rather than an error.
pub fn resolve_id<'a>(
    id_paths: &IdPathLookup,
    field_name: &str,
    item: &'a Value
) -> Option<&'a Value> {
    let resolved = match id_paths.get(field_name) {
        Some(paths) => paths
            .iter()
            .find_map(|path| resolve_path(item, path)),
        None => resolve_path(item, DEFAULT_ID_FIELD)
    };

    if resolved.is_none() {
        tracing::warn!(
            field = field_name,
            "no identity path resolved for array element; favoring the incoming side"
        );
    }
    resolved
}

/// Walk a dotted path through objects (and array indexes) to a non-null value.
pub(crate) fn resolve_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{scalar, IdPaths};
    use serde_json::json;
    use std::collections::HashMap;

    fn user_spec() -> EntitySpec {
        EntitySpec::new("User", vec![scalar("id"), scalar("name")])
    }

    #[test]
    fn keyed_identity_renders_typename_colon_id() {
        let identity = identity_of(&user_spec(), &json!({"id": "7", "name": "a"})).unwrap();
        assert_eq!(identity.cache_key(), "User:7");
    }

    #[test]
    fn non_default_id_field_renders_as_a_json_object() {
        let spec = user_spec().id_field("email");
        let identity = identity_of(&spec, &json!({"email": "a@b.c"})).unwrap();
        assert_eq!(identity.cache_key(), r#"User:{"email":"a@b.c"}"#);
    }

    #[test]
    fn singleton_identity_is_the_bare_typename() {
        let spec = EntitySpec::new("AuthState", vec![scalar("token")]).singleton();
        let identity = identity_of(&spec, &json!({"token": "t"})).unwrap();
        assert_eq!(identity.cache_key(), "AuthState");
    }

    #[test]
    fn missing_id_is_a_configuration_error() {
        let result = identity_of(&user_spec(), &json!({"name": "a"}));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn resolve_id_defaults_to_the_id_path() {
        let lookup = HashMap::new();
        let item = json!({"id": 3, "a": 1});
        assert_eq!(resolve_id(&lookup, "items", &item), Some(&json!(3)));
    }

    #[test]
    fn resolve_id_tries_paths_in_order() {
        let mut lookup = HashMap::new();
        lookup.insert(
            "items".to_string(),
            IdPaths::Many(vec!["key".to_string(), "meta.uuid".to_string()])
        );

        let by_first = json!({"key": "k1"});
        assert_eq!(resolve_id(&lookup, "items", &by_first), Some(&json!("k1")));

        let by_second = json!({"key": null, "meta": {"uuid": "u1"}});
        assert_eq!(resolve_id(&lookup, "items", &by_second), Some(&json!("u1")));

        let by_none = json!({"meta": {}});
        assert_eq!(resolve_id(&lookup, "items", &by_none), None);
    }

    #[test]
    fn single_path_is_coerced_to_a_list() {
        let mut lookup = HashMap::new();
        lookup.insert("items".to_string(), IdPaths::One("slug".to_string()));
        let item = json!({"slug": "s"});
        assert_eq!(resolve_id(&lookup, "items", &item), Some(&json!("s")));
    }
}
