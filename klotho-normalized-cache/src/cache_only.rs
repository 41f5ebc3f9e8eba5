//! Synthetic typing of cache-only sub-objects.
//!
//! The underlying store applies its merge policy per type. Tagging each
//! configured cache-only sub-object with its own synthetic type name lets
//! that policy distinguish locally owned data from remote data without this
//! crate controlling the policy itself.

use serde_json::Value;

const WILDCARD: &str = "*";

/// Tag every configured cache-only path whose resolved value on `instance`
/// is a non-null object with a synthetic `__typename`, without mutating
/// sibling fields.
///
/// The tag is `CacheOnlyType<Typename><PathSegments>`, derived
/// deterministically with wildcard segments skipped in the name. A wildcard
/// segment matches every key of an object and every element of an array.
pub fn tag_cache_only_fields(entity_name: &str, paths: &[String], instance: &Value) -> Value {
    let mut tagged = instance.clone();
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        let type_name = synthetic_type_name(entity_name, &segments);
        tag_path(&mut tagged, &segments, &type_name);
    }
    tagged
}

pub(crate) fn synthetic_type_name(entity_name: &str, segments: &[&str]) -> String {
    let mut name = String::from("CacheOnlyType");
    name.push_str(entity_name);
    for segment in segments {
        if *segment == WILDCARD {
            continue;
        }
        name.push_str(&pascal(segment));
    }
    name
}

fn pascal(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new()
    }
}

fn tag_path(value: &mut Value, segments: &[&str], type_name: &str) {
    // Arrays are traversed transparently so `items.details` reaches the
    // details of every element.
    if let Value::Array(items) = value {
        for item in items {
            tag_path(item, segments, type_name);
        }
        return;
    }

    match segments.split_first() {
        None => {
            if let Value::Object(map) = value {
                map.insert("__typename".to_string(), Value::String(type_name.to_string()));
            }
        }
        Some((&segment, rest)) => {
            if let Value::Object(map) = value {
                if segment == WILDCARD {
                    for (_, child) in map.iter_mut() {
                        tag_path(child, rest, type_name);
                    }
                } else if let Some(child) = map.get_mut(segment) {
                    tag_path(child, rest, type_name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_the_sub_object_at_a_simple_path() {
        let instance = json!({"id": "1", "draft": {"body": "wip"}});
        let tagged = tag_cache_only_fields("Post", &["draft".to_string()], &instance);

        assert_eq!(
            tagged,
            json!({
                "id": "1",
                "draft": {"body": "wip", "__typename": "CacheOnlyTypePostDraft"}
            })
        );
    }

    #[test]
    fn wildcards_match_every_child_and_are_skipped_in_the_name() {
        let instance = json!({
            "settings": {
                "a": {"on": true},
                "b": {"on": false}
            }
        });
        let tagged =
            tag_cache_only_fields("User", &["settings.*".to_string()], &instance);

        let settings = &tagged["settings"];
        assert_eq!(settings["a"]["__typename"], "CacheOnlyTypeUserSettings");
        assert_eq!(settings["b"]["__typename"], "CacheOnlyTypeUserSettings");
    }

    #[test]
    fn arrays_are_traversed_transparently() {
        let instance = json!({"items": [{"note": {}}, {"note": {}}]});
        let tagged =
            tag_cache_only_fields("Order", &["items.note".to_string()], &instance);

        for item in tagged["items"].as_array().unwrap() {
            assert_eq!(item["note"]["__typename"], "CacheOnlyTypeOrderItemsNote");
        }
    }

    #[test]
    fn null_and_scalar_values_are_left_untouched() {
        let instance = json!({"draft": null, "title": "t"});
        let tagged = tag_cache_only_fields(
            "Post",
            &["draft".to_string(), "title".to_string()],
            &instance
        );
        assert_eq!(tagged, instance);
    }

    #[test]
    fn missing_paths_do_not_invent_fields() {
        let instance = json!({"id": "1"});
        let tagged = tag_cache_only_fields("Post", &["draft".to_string()], &instance);
        assert_eq!(tagged, instance);
    }
}
