//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during feed polling, ingestion, and enrichment.
#[derive(Error, Debug)]
pub enum Error {
    /// Entity model or service-client error.
    #[error(transparent)]
    Core(#[from] gazette_core::Error),

    /// The fetched document parsed, but carries no feed metadata.
    #[error("invalid feed URL: {url}")]
    InvalidFeed {
        /// The offending feed URL.
        url: String,
    },

    /// The fetched document is not a parseable RSS/Atom feed.
    #[error("feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    /// Missing or malformed feeds configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
