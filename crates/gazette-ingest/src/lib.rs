//! Gazette ingestion pipeline components.
//!
//! This crate provides the polling, ingestion, and enrichment stages that
//! feed the Gazette archive.
//!
//! # Modules
//!
//! - [`detector`] - Conditional-fetch change detection per feed URL
//! - [`poller`] - Sweep orchestrator maintaining the shared checkpoint
//! - [`pipeline`] - Full parse + entity persistence + enqueue
//! - [`enrich`] - AI enrichment of persisted entries
//! - [`config`] - Blob-backed feeds configuration
//! - [`http`] - Reqwest-backed HTTP fetcher
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ FeedChangeDetector│  conditional GET, 200 vs 304
//! └────────┬─────────┘
//!          │ changed URLs
//!          ▼
//! ┌──────────────────┐
//! │ IngestionPipeline │  parse feed → upsert Feed/Entries → blob content
//! └────────┬─────────┘
//!          │ entry key batches ("retrieved" envelopes)
//!          ▼
//! ┌──────────────────┐
//! │ EnrichmentService │  summary, sentiment, readability, embeddings
//! └──────────────────┘
//! ```
//!
//! Failures are isolated per feed and per entry: one bad item never aborts
//! its siblings, and the shared checkpoint advances only after a full
//! sweep.

pub mod config;
pub mod detector;
pub mod enrich;
mod error;
pub mod http;
pub mod pipeline;
pub mod poller;

pub use config::{load_feeds_config, FeedsConfig};
pub use detector::{epoch, format_rfc1123, FeedChangeDetector};
pub use enrich::{EnrichReport, EnrichmentService};
pub use error::{Error, Result};
pub use http::ReqwestFetcher;
pub use pipeline::{partition_token, IngestReport, IngestionPipeline};
pub use poller::{PollOutcome, Poller};
