//! Conventions for detecting and extracting continuation-passing callers.
//!
//! A caller opts into tree mode by placing a continuation into its bindings
//! under one of two designating keys, checked in fixed priority order: the
//! explicit render slot first, the generic child slot second. Exactly one
//! continuation is honored per invocation.
//!
//! The designating key is retained in the bindings handed onward; stripping
//! it would make the record handed to the continuation differ from the one
//! the steps saw.

use crate::bindings::{BindingValue, Bindings, Continuation, Rendered};

/// The preferred continuation-designating key.
pub const RENDER_KEY: &str = "render";
/// The fallback continuation-designating key.
pub const CHILDREN_KEY: &str = "children";

/// True if the bindings carry a recognized continuation.
pub fn has_continuation(bindings: &Bindings) -> bool {
    continuation_of(bindings).is_some()
}

/// The continuation at whichever designating key matches first. The render
/// slot takes precedence when both are present.
pub fn continuation_of(bindings: &Bindings) -> Option<&Continuation> {
    bindings
        .get(RENDER_KEY)
        .and_then(BindingValue::as_continuation)
        .or_else(|| {
            bindings
                .get(CHILDREN_KEY)
                .and_then(BindingValue::as_continuation)
        })
}

/// Attach a human-readable label to a rendered node for diagnostics.
/// Labeling an already labeled node composes as `Parent(Child)`.
pub fn name_node<L: Into<String>>(label: L, node: Rendered) -> Rendered {
    let label = label.into();
    match node {
        Rendered::Labeled(child, inner) => {
            Rendered::Labeled(format!("{}({})", label, child), inner)
        }
        other => Rendered::Labeled(label, Box::new(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> Continuation {
        Continuation::new(|bindings| Rendered::Bindings(bindings.clone()))
    }

    #[test]
    fn render_takes_precedence_over_children() {
        let render = identity();
        let children = identity();
        let bindings = Bindings::new()
            .insert(CHILDREN_KEY, children)
            .insert(RENDER_KEY, render.clone());

        assert!(has_continuation(&bindings));
        assert!(continuation_of(&bindings).unwrap().ptr_eq(&render));
    }

    #[test]
    fn data_under_a_designating_key_is_not_a_continuation() {
        let bindings = Bindings::new().insert(RENDER_KEY, json!("not callable"));
        assert!(!has_continuation(&bindings));

        let with_fallback = bindings.insert(CHILDREN_KEY, identity());
        assert!(has_continuation(&with_fallback));
    }

    #[test]
    fn labels_compose_parent_of_child() {
        let node = name_node("Child", Rendered::Value(json!(1)));
        let node = name_node("Parent", node);
        assert_eq!(node.label(), Some("Parent(Child)"));
        assert_eq!(node.unlabeled(), &Rendered::Value(json!(1)));
    }
}
