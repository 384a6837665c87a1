//! External service-client contracts.
//!
//! The table store, blob store, message queue, and language model are
//! external multi-writer-safe services. This module defines the narrow
//! async contracts the pipeline needs from each, plus the [`Clients`]
//! bundle that is constructed once at startup and passed into every
//! component. There is no global client state: tests inject the in-memory
//! backends from [`crate::memory`], production wires vendor SDK adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::Result;

/// A flat record destined for the structured key-value table store.
///
/// Field values are scalars rendered as strings; nested structures are
/// JSON-encoded by the entity before they get here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    /// Partition key of the record.
    pub partition_key: String,
    /// Row key of the record.
    pub row_key: String,
    /// Flat field map (deterministically ordered).
    pub fields: BTreeMap<String, String>,
}

impl TableRecord {
    /// Create an empty record for the given identity.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, skipping `None` values entirely.
    pub fn set_opt(&mut self, name: &str, value: Option<String>) {
        if let Some(value) = value {
            self.fields.insert(name.to_string(), value);
        }
    }

    /// Set a field.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }
}

/// Structured key-value table store, addressed by (partition key, row key).
///
/// Upserts are idempotent: writing the same record twice leaves the store
/// in the same state as writing it once.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert or overwrite the record identified by its keys.
    async fn upsert(&self, table: &str, record: TableRecord) -> Result<()>;

    /// Remove the record identified by (partition key, row key).
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<()>;
}

/// Object store for large payloads, addressed by container + key.
///
/// Keys follow the convention `{partition_key}/{content_hash}.{ext}`
/// with ext one of `txt` (entry bodies) or `npy` (embedding vectors).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes, overwriting any existing blob at the key.
    async fn put(&self, container: &str, key: &str, data: Bytes) -> Result<()>;

    /// Download a blob. Fails with [`crate::Error::BlobNotFound`] if absent.
    async fn get(&self, container: &str, key: &str) -> Result<Bytes>;

    /// Delete a blob. Deleting an absent blob is not an error.
    async fn delete(&self, container: &str, key: &str) -> Result<()>;
}

/// Message queue accepting JSON payloads.
///
/// Delivery is at-least-once; consumers must treat each envelope as
/// independently re-processable.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send one message to the named queue.
    async fn send(&self, queue: &str, payload: String) -> Result<()>;
}

/// Large-language-model completion and embedding endpoints.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run a chat completion with a system prompt and user text.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;

    /// Produce an embedding vector for the text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Minimal HTTP client surface used by the detector and content fallback.
///
/// Kept as a trait so the entity model stays free of any HTTP crate and
/// tests can script responses.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Conditional GET carrying an RFC 1123 `If-Modified-Since` header.
    /// Returns the final response status code (after redirects).
    async fn conditional_get(&self, url: &Url, if_modified_since: &str) -> Result<u16>;

    /// Plain GET returning the response body as text. Non-200 is an error.
    async fn get_text(&self, url: &Url) -> Result<String>;

    /// Plain GET returning the raw response body. Non-200 is an error.
    async fn get_bytes(&self, url: &Url) -> Result<Bytes>;
}

/// What to do with blob-stored large fields when an entity is deleted.
///
/// The upstream system never deleted blobs alongside records; keeping them
/// is therefore the default, and purging is an explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Leave content/embedding blobs in place (default).
    #[default]
    KeepBlobs,
    /// Delete the referenced blob together with the structured record.
    PurgeBlobs,
}

/// Names of the tables, containers, and queues the pipeline writes to.
#[derive(Debug, Clone)]
pub struct StorageNames {
    /// Table holding Feed records.
    pub feeds_table: String,
    /// Table holding Entry records.
    pub entries_table: String,
    /// Table holding AIEnrichment records.
    pub enrichment_table: String,
    /// Table holding Post records.
    pub posts_table: String,
    /// Container for entry bodies and embedding vectors.
    pub entries_container: String,
    /// Container holding the feeds configuration document.
    pub config_container: String,
    /// Blob name of the feeds configuration document.
    pub config_blob: String,
    /// Queue for feed-level update notifications (URL payloads).
    pub feed_queue: String,
    /// Queue for entry-level enrichment batches (key-pair payloads).
    pub entry_queue: String,
}

impl Default for StorageNames {
    fn default() -> Self {
        Self {
            feeds_table: "feeds".to_string(),
            entries_table: "entries".to_string(),
            enrichment_table: "ai_enrichment".to_string(),
            posts_table: "posts".to_string(),
            entries_container: "entries".to_string(),
            config_container: "config".to_string(),
            config_blob: "config.json".to_string(),
            feed_queue: "feed-updates".to_string(),
            entry_queue: "entry-enrichment".to_string(),
        }
    }
}

impl StorageNames {
    /// Load names from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `GAZETTE_FEEDS_TABLE`, `GAZETTE_ENTRIES_TABLE`,
    /// `GAZETTE_ENRICHMENT_TABLE`, `GAZETTE_POSTS_TABLE`,
    /// `GAZETTE_ENTRIES_CONTAINER`, `GAZETTE_CONFIG_CONTAINER`,
    /// `GAZETTE_CONFIG_BLOB`, `GAZETTE_FEED_QUEUE`, `GAZETTE_ENTRY_QUEUE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| std::env::var(name).unwrap_or(default);
        Self {
            feeds_table: var("GAZETTE_FEEDS_TABLE", defaults.feeds_table),
            entries_table: var("GAZETTE_ENTRIES_TABLE", defaults.entries_table),
            enrichment_table: var("GAZETTE_ENRICHMENT_TABLE", defaults.enrichment_table),
            posts_table: var("GAZETTE_POSTS_TABLE", defaults.posts_table),
            entries_container: var("GAZETTE_ENTRIES_CONTAINER", defaults.entries_container),
            config_container: var("GAZETTE_CONFIG_CONTAINER", defaults.config_container),
            config_blob: var("GAZETTE_CONFIG_BLOB", defaults.config_blob),
            feed_queue: var("GAZETTE_FEED_QUEUE", defaults.feed_queue),
            entry_queue: var("GAZETTE_ENTRY_QUEUE", defaults.entry_queue),
        }
    }
}

/// Dependency-injected bundle of service clients.
///
/// Constructed once (in `main` or a test) and shared by reference. The
/// clients themselves are connection-pooled and safe for concurrent use.
#[derive(Clone)]
pub struct Clients {
    /// Structured key-value table store.
    pub tables: Arc<dyn TableStore>,
    /// Blob store for large payloads.
    pub blobs: Arc<dyn BlobStore>,
    /// Message queue producer.
    pub queues: Arc<dyn MessageQueue>,
    /// Completion/embedding model.
    pub model: Arc<dyn LanguageModel>,
    /// Table/container/queue names.
    pub names: StorageNames,
    /// Blob lifecycle policy on entity delete.
    pub delete_policy: DeletePolicy,
}

impl Clients {
    /// Bundle the given clients with default names and delete policy.
    pub fn new(
        tables: Arc<dyn TableStore>,
        blobs: Arc<dyn BlobStore>,
        queues: Arc<dyn MessageQueue>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            tables,
            blobs,
            queues,
            model,
            names: StorageNames::default(),
            delete_policy: DeletePolicy::default(),
        }
    }

    /// Replace the storage names.
    pub fn with_names(mut self, names: StorageNames) -> Self {
        self.names = names;
        self
    }

    /// Replace the blob delete policy.
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }
}
