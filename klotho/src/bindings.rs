use crate::error::PipelineError;
use indexmap::IndexMap;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// What to do once all steps have produced their values.
///
/// A continuation receives the fully accumulated [`Bindings`] and turns them
/// into a rendered value. Continuations are cheap to clone and compare by
/// pointer identity, so the same continuation can live both inside a binding
/// record and in the hands of the caller.
#[derive(Clone)]
pub struct Continuation(Arc<dyn Fn(&Bindings) -> Result<Rendered, PipelineError> + Send + Sync>);

impl Continuation {
    /// Wrap an infallible render function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Bindings) -> Rendered + Send + Sync + 'static
    {
        Continuation(Arc::new(move |bindings| Ok(f(bindings))))
    }

    /// Wrap a render function that may fail. Used internally to thread step
    /// failures through synthesized continuations.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&Bindings) -> Result<Rendered, PipelineError> + Send + Sync + 'static
    {
        Continuation(Arc::new(f))
    }

    pub fn call(&self, bindings: &Bindings) -> Result<Rendered, PipelineError> {
        (self.0.as_ref())(bindings)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Continuation")
    }
}

impl PartialEq for Continuation {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A single slot in a binding record: either plain data or a continuation.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingValue {
    Data(Value),
    Continuation(Continuation)
}

impl BindingValue {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            BindingValue::Data(value) => Some(value),
            BindingValue::Continuation(_) => None
        }
    }

    pub fn as_continuation(&self) -> Option<&Continuation> {
        match self {
            BindingValue::Continuation(k) => Some(k),
            BindingValue::Data(_) => None
        }
    }
}

impl From<Value> for BindingValue {
    fn from(value: Value) -> Self {
        BindingValue::Data(value)
    }
}

impl From<Continuation> for BindingValue {
    fn from(k: Continuation) -> Self {
        BindingValue::Continuation(k)
    }
}

/// An insertion-ordered record of named results threaded through a pipeline.
///
/// Each step receives the record built by all prior steps and contributes a
/// delta; merging always produces a new record, never mutates in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    entries: IndexMap<String, BindingValue>
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tree-mode callers: a record carrying a continuation
    /// under the preferred `render` slot.
    pub fn with_render(continuation: Continuation) -> Self {
        Bindings::new().insert(crate::protocol::RENDER_KEY, continuation)
    }

    /// Builder-style insert. Replaces an existing slot of the same name.
    pub fn insert<N: Into<String>, V: Into<BindingValue>>(mut self, name: N, value: V) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&BindingValue> {
        self.entries.get(name)
    }

    /// The data value under `name`, if the slot holds data.
    pub fn data(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(BindingValue::as_data)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `self` plus `{name: value}`, replacing any existing slot.
    pub(crate) fn merged(&self, name: &str, value: BindingValue) -> Bindings {
        let mut entries = self.entries.clone();
        entries.insert(name.to_owned(), value);
        Bindings { entries }
    }

    /// `self` plus `{name: value}`, appending when the slot already holds a
    /// sequence. A non-sequence slot is promoted to a two-element sequence so
    /// repeated fills of the same logical slot never silently overwrite.
    pub(crate) fn merged_concat(&self, name: &str, value: Value) -> Bindings {
        let slot = match self.data(name) {
            Some(Value::Array(existing)) => {
                let mut items = existing.clone();
                items.push(value);
                Value::Array(items)
            }
            Some(existing) => Value::Array(vec![existing.clone(), value]),
            None => value
        };
        self.merged(name, BindingValue::Data(slot))
    }
}

impl<N: Into<String>, V: Into<BindingValue>> FromIterator<(N, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Bindings {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect()
        }
    }
}

/// The result of invoking a tree build with a continuation.
#[derive(Clone, Debug, PartialEq)]
pub enum Rendered {
    /// A plain rendered value.
    Value(Value),
    /// A rendered value that is itself a binding record, as produced by
    /// identity-style continuations.
    Bindings(Bindings),
    /// An explicit "not ready yet" marker. Tree-mode suspension is always
    /// represented as a placeholder, never by blocking.
    Placeholder(String),
    /// A node labeled for diagnostics via [`name_node`](crate::protocol::name_node).
    Labeled(String, Box<Rendered>)
}

impl Rendered {
    pub fn label(&self) -> Option<&str> {
        match self {
            Rendered::Labeled(label, _) => Some(label),
            _ => None
        }
    }

    pub fn is_placeholder(&self) -> bool {
        match self {
            Rendered::Placeholder(_) => true,
            Rendered::Labeled(_, inner) => inner.is_placeholder(),
            _ => false
        }
    }

    /// The unlabeled node underneath any diagnostic labels.
    pub fn unlabeled(&self) -> &Rendered {
        match self {
            Rendered::Labeled(_, inner) => inner.unlabeled(),
            other => other
        }
    }

    pub fn as_bindings(&self) -> Option<&Bindings> {
        match self.unlabeled() {
            Rendered::Bindings(bindings) => Some(bindings),
            _ => None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merged_replaces_and_preserves_order() {
        let bindings = Bindings::new()
            .insert("a", json!(1))
            .insert("b", json!(2));
        let merged = bindings.merged("c", BindingValue::Data(json!(3)));

        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(bindings.len(), 2, "merge must not mutate the source record");

        let replaced = merged.merged("a", BindingValue::Data(json!(9)));
        assert_eq!(replaced.data("a"), Some(&json!(9)));
        assert_eq!(replaced.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn merged_concat_appends_to_sequences() {
        let bindings = Bindings::new().insert("results", json!([1]));
        let appended = bindings.merged_concat("results", json!(2));
        assert_eq!(appended.data("results"), Some(&json!([1, 2])));

        let promoted = Bindings::new()
            .insert("results", json!(1))
            .merged_concat("results", json!(2));
        assert_eq!(promoted.data("results"), Some(&json!([1, 2])));

        let fresh = Bindings::new().merged_concat("results", json!(1));
        assert_eq!(fresh.data("results"), Some(&json!(1)));
    }

    #[test]
    fn continuations_compare_by_identity() {
        let k = Continuation::new(|bindings| Rendered::Bindings(bindings.clone()));
        let same = k.clone();
        let other = Continuation::new(|bindings| Rendered::Bindings(bindings.clone()));

        assert_eq!(BindingValue::from(k.clone()), BindingValue::from(same));
        assert_ne!(BindingValue::from(k), BindingValue::from(other));
    }
}
