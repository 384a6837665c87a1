//! Error types shared across the Gazette pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the entity model and service-client layer.
#[derive(Error, Debug)]
pub enum Error {
    /// An entity field failed schema validation. Never retried.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// The name of the invalid field.
        field: &'static str,
        /// Description of what's wrong.
        reason: String,
    },

    /// A blob was not found in the blob store.
    ///
    /// Not an error during content resolution (it triggers the HTTP
    /// fallback); it is an error for reads that expect the blob to exist.
    #[error("blob not found: {container}/{key}")]
    BlobNotFound {
        /// Container the blob was looked up in.
        container: String,
        /// Blob key within the container.
        key: String,
    },

    /// Table or blob store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Queue send failed.
    #[error("queue error: {0}")]
    Queue(String),

    /// Language-model completion or embedding call failed.
    #[error("model error: {0}")]
    Model(String),

    /// HTTP fetch failed (network error or unexpected status).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Content could not be resolved from cache, blob store, or HTTP.
    #[error("content unavailable for entry {row_key}")]
    ContentUnavailable {
        /// Row key of the entry whose content could not be resolved.
        row_key: String,
    },

    /// Embedding vector could not be resolved from cache or blob store.
    #[error("embedding unavailable for {partition_key}/{row_key}")]
    EmbeddingUnavailable {
        /// Partition key of the enrichment record.
        partition_key: String,
        /// Row key of the enrichment record.
        row_key: String,
    },

    /// Embedding blob bytes are not a valid vector encoding.
    #[error("embedding codec error: {0}")]
    EmbeddingCodec(String),

    /// JSON serialization or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
