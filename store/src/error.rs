use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A persisted collection could not be read or parsed.
    #[error("failed to read {collection}: {reason}")]
    Read {
        collection: &'static str,
        reason: String,
    },

    /// A snapshot of a collection could not be written.
    #[error("failed to write {collection}: {reason}")]
    Write {
        collection: &'static str,
        reason: String,
    },

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
