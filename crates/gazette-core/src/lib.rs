//! Core types, entities, and service-client contracts for the Gazette
//! feed pipeline.
//!
//! This crate provides:
//! - The content-addressable entity model (Feed, Entry, AIEnrichment, Post)
//! - Content-key hashing (xxh64, 16 hex characters)
//! - The queue envelope contract shared by producers and consumers
//! - Async contracts for the external table store, blob store, message
//!   queue, language model, and HTTP client, plus in-memory backends
//! - The NPY codec for embedding-vector blobs
//! - A bounded retry policy and duplicate-suppressed failure recording
//! - Prometheus metrics helpers
//!
//! # Identity model
//!
//! ```text
//! Feed          row_key = hash(link)              partition = "feed"
//! Entry         row_key = hash(upstream id)       partition = feed-name token
//! AIEnrichment  identity inherited from Entry     (one-to-one)
//! Post          row_key = hash(title+content+date) partition = draft month
//! ```
//!
//! Large payloads never live in the table records: entry bodies and
//! embedding vectors are hashed and stored as blobs at
//! `{partition_key}/{content_hash}.{txt|npy}`, with only the hash inline.

pub mod clients;
pub mod entities;
mod envelope;
mod error;
pub mod failure;
mod hash;
pub mod memory;
pub mod metrics;
pub mod npy;
mod retry;

pub use clients::{
    BlobStore, Clients, DeletePolicy, HttpFetcher, LanguageModel, MessageQueue, StorageNames,
    TableRecord, TableStore,
};
pub use entities::{
    AIEnrichment, Content, DraftStatus, EngagementCategory, Entry, Feed, FeedImage, Post,
    Sentiment, FEED_PARTITION_KEY,
};
pub use envelope::{EntryBatchMessage, Envelope, EnvelopeStatus, FeedUpdateMessage};
pub use error::{Error, Result};
pub use hash::{content_key, is_content_key, CONTENT_KEY_LEN};
pub use retry::RetryPolicy;
