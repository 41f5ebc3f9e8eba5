use serde::Deserialize;
use std::{collections::HashMap, fmt};

/// A single field in an output selection.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub enum FieldSelector {
    /// A scalar field by name.
    Scalar(String),
    /// An object field by name, with its inner selection.
    Object(String, Vec<FieldSelector>)
}

impl FieldSelector {
    pub fn name(&self) -> &str {
        match self {
            FieldSelector::Scalar(name) => name,
            FieldSelector::Object(name, _) => name
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Render a selection as a comma-separated field list for diagnostics.
pub(crate) fn selection_names(selection: &[FieldSelector]) -> String {
    selection
        .iter()
        .map(FieldSelector::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One or more dotted identity paths for a field. A single path is coerced
/// to a one-element list when resolving.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum IdPaths {
    One(String),
    Many(Vec<String>)
}

impl IdPaths {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let paths: Vec<&str> = match self {
            IdPaths::One(path) => vec![path.as_str()],
            IdPaths::Many(paths) => paths.iter().map(String::as_str).collect()
        };
        paths.into_iter()
    }
}

/// Per-field mapping to the dotted paths used to find a stable identity for
/// array elements during merge.
pub type IdPathLookup = HashMap<String, IdPaths>;

/// Static description of how one entity type is written to the cache.
///
/// Derived fresh on every write call from this configuration plus the
/// instance data; nothing is cached across calls.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EntitySpec {
    /// The entity's type name.
    pub name: String,
    /// The output field selection written and read back.
    pub selection: Vec<FieldSelector>,
    /// The id field, defaulting to `id`.
    #[serde(default)]
    pub id_field: Option<String>,
    /// Identity paths for array-element merging.
    #[serde(default)]
    pub id_paths: IdPathLookup,
    /// Dotted/wildcarded paths whose values are stored locally only, never
    /// sent to the remote API.
    #[serde(default)]
    pub cache_only: Vec<String>,
    /// Top-level fields never written to the local cache (the inverse of
    /// cache-only).
    #[serde(default)]
    pub remote_only: Vec<String>,
    /// Skip the write entirely when the narrowed selection carries no
    /// cache-only field.
    #[serde(default)]
    pub require_cache_only: bool,
    /// At most one instance ever cached; identified by type name alone.
    #[serde(default)]
    pub singleton: bool,
    /// Deep-merge the currently cached value under the instance before
    /// writing.
    #[serde(default)]
    pub merge_existing_first: bool
}

impl EntitySpec {
    pub fn new<N: Into<String>>(name: N, selection: Vec<FieldSelector>) -> Self {
        Self {
            name: name.into(),
            selection,
            ..Self::default()
        }
    }

    pub fn id_field<F: Into<String>>(mut self, id_field: F) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    pub fn id_path<F: Into<String>>(mut self, field: F, paths: IdPaths) -> Self {
        self.id_paths.insert(field.into(), paths);
        self
    }

    pub fn cache_only<P: Into<String>>(mut self, path: P) -> Self {
        self.cache_only.push(path.into());
        self
    }

    pub fn remote_only<F: Into<String>>(mut self, field: F) -> Self {
        self.remote_only.push(field.into());
        self
    }

    pub fn require_cache_only(mut self) -> Self {
        self.require_cache_only = true;
        self
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn merge_existing_first(mut self) -> Self {
        self.merge_existing_first = true;
        self
    }
}

/// Options to pass to the cache engine.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CacheOptions {
    /// The entity specs known at setup time. Singleton specs are seeded with
    /// an all-null instance before the first real write.
    #[serde(default)]
    pub entities: Vec<EntitySpec>
}

/// Shorthand for building scalar selections.
pub fn scalar<N: Into<String>>(name: N) -> FieldSelector {
    FieldSelector::Scalar(name.into())
}

/// Shorthand for building object selections.
pub fn object<N: Into<String>>(name: N, selection: Vec<FieldSelector>) -> FieldSelector {
    FieldSelector::Object(name.into(), selection)
}
