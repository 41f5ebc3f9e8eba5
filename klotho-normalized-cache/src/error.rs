use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// A required entity spec field is missing or the instance does not fit
    /// the spec. Surfaced immediately, never retried.
    #[error("invalid entity spec: {0}")]
    Configuration(String),

    /// The post-write read-back failed. The engine does not retry writes; a
    /// failed verification indicates a structural mismatch between selection
    /// and store schema, not a transient fault.
    #[error("cache write verification failed for {identity} (selection [{selection}]): {source}")]
    WriteVerification {
        identity: String,
        selection: String,
        #[source]
        source: StoreError
    },

    #[error(transparent)]
    Store(#[from] StoreError)
}
