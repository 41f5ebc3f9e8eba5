//! Identity-aware deep merging of a cached value under an incoming instance.

use crate::{identity::resolve_id, types::IdPathLookup};
use serde_json::Value;
use std::collections::HashSet;

/// Deep-merge `existing` under `incoming`: any key present on the incoming
/// side wins, nested objects merge recursively, and arrays are matched by
/// element identity so a list is not replaced wholesale when only one
/// element changed.
pub(crate) fn merge_under(
    existing: &Value,
    incoming: &Value,
    id_paths: &IdPathLookup
) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut out = old.clone();
            for (key, new_value) in new {
                let merged = match old.get(key) {
                    Some(old_value) => merge_field(key, old_value, new_value, id_paths),
                    None => new_value.clone()
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (_, incoming) => incoming.clone()
    }
}

fn merge_field(field: &str, old: &Value, new: &Value, id_paths: &IdPathLookup) -> Value {
    match (old, new) {
        (Value::Array(old_items), Value::Array(new_items)) => {
            merge_arrays(field, old_items, new_items, id_paths)
        }
        (Value::Object(_), Value::Object(_)) => merge_under(old, new, id_paths),
        _ => new.clone()
    }
}

/// Union two arrays by element identity. Incoming elements come first,
/// deep-merged with their identity match from the existing side; existing
/// elements whose identity never appears in the incoming list are kept.
/// Elements with no resolvable identity cannot be matched, so the incoming
/// side is authoritative for them.
fn merge_arrays(
    field: &str,
    old_items: &[Value],
    new_items: &[Value],
    id_paths: &IdPathLookup
) -> Value {
    // Identities resolve once per element, up front; the missing-identity
    // warning fires at most once per element, not once per pairing.
    let old_ids: Vec<Option<&Value>> = old_items
        .iter()
        .map(|old_item| resolve_id(id_paths, field, old_item))
        .collect();

    let mut out = Vec::with_capacity(new_items.len());
    let mut matched: HashSet<usize> = HashSet::new();

    for new_item in new_items {
        let matching = resolve_id(id_paths, field, new_item)
            .and_then(|new_id| old_ids.iter().position(|old_id| *old_id == Some(new_id)));
        match matching {
            Some(index) => {
                matched.insert(index);
                out.push(merge_under(&old_items[index], new_item, id_paths));
            }
            None => out.push(new_item.clone())
        }
    }

    for (index, old_item) in old_items.iter().enumerate() {
        if matched.contains(&index) {
            continue;
        }
        if old_ids[index].is_some() {
            out.push(old_item.clone());
        }
    }

    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdPaths;
    use serde_json::json;
    use std::collections::HashMap;

    fn items_by_id() -> IdPathLookup {
        let mut lookup = HashMap::new();
        lookup.insert("items".to_string(), IdPaths::One("id".to_string()));
        lookup
    }

    #[test]
    fn incoming_keys_win_and_missing_keys_are_kept() {
        let existing = json!({"a": 1, "b": 2});
        let incoming = json!({"b": 3, "c": 4});
        let merged = merge_under(&existing, &incoming, &HashMap::new());
        assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn array_elements_merge_by_identity() {
        let existing = json!({"items": [{"id": 1, "a": 1}, {"id": 2, "a": 2}]});
        let incoming = json!({"items": [{"id": 1, "b": 2}]});
        let merged = merge_under(&existing, &incoming, &items_by_id());
        assert_eq!(
            merged,
            json!({"items": [{"id": 1, "a": 1, "b": 2}, {"id": 2, "a": 2}]})
        );
    }

    #[test]
    fn unidentified_elements_fall_back_to_the_incoming_side() {
        let existing = json!({"items": [{"a": 1}]});
        let incoming = json!({"items": [{"b": 2}]});
        let merged = merge_under(&existing, &incoming, &items_by_id());
        assert_eq!(merged, json!({"items": [{"b": 2}]}));
    }

    #[test]
    fn unidentified_existing_elements_do_not_block_matching() {
        let existing = json!({"items": [{"a": 1}, {"id": 2, "a": 2}]});
        let incoming = json!({"items": [{"id": 2, "b": 3}, {"id": 4}]});
        let merged = merge_under(&existing, &incoming, &items_by_id());
        assert_eq!(
            merged,
            json!({"items": [{"id": 2, "a": 2, "b": 3}, {"id": 4}]})
        );
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let existing = json!({"profile": {"name": "a", "age": 1}});
        let incoming = json!({"profile": {"age": 2}});
        let merged = merge_under(&existing, &incoming, &HashMap::new());
        assert_eq!(merged, json!({"profile": {"name": "a", "age": 2}}));
    }

    #[test]
    fn scalar_conflicts_take_the_incoming_value() {
        let existing = json!({"a": {"deep": true}});
        let incoming = json!({"a": 1});
        let merged = merge_under(&existing, &incoming, &HashMap::new());
        assert_eq!(merged, json!({"a": 1}));
    }
}
