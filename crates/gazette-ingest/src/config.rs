//! Feeds configuration, loaded from the blob store.
//!
//! A JSON document with a `feeds` key holding the feed URLs to poll:
//!
//! ```json
//! { "feeds": ["https://example.com/feed.xml", "https://other.example/rss"] }
//! ```
//!
//! Container and blob names come from the bundle's [`StorageNames`]
//! (`GAZETTE_CONFIG_CONTAINER`/`GAZETTE_CONFIG_BLOB` in the environment).
//! Loaded once per process lifetime; a missing document or empty list is a
//! fatal configuration error, never retried.
//!
//! [`StorageNames`]: gazette_core::StorageNames

use serde::Deserialize;
use url::Url;

use gazette_core::{BlobStore as _, Clients};

use crate::error::{Error, Result};

/// The feeds configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Feed URLs to poll.
    pub feeds: Vec<Url>,
}

/// Load and validate the feeds configuration from the blob store.
pub async fn load_feeds_config(clients: &Clients) -> Result<FeedsConfig> {
    let names = &clients.names;
    let bytes = clients
        .blobs
        .get(&names.config_container, &names.config_blob)
        .await
        .map_err(|e| {
            Error::Config(format!(
                "failed to load '{}' from container '{}': {e}",
                names.config_blob, names.config_container
            ))
        })?;

    let config: FeedsConfig = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Config(format!("malformed feeds configuration: {e}")))?;

    if config.feeds.is_empty() {
        return Err(Error::Config(
            "feeds configuration contains no feed URLs".to_string(),
        ));
    }

    tracing::info!(feeds = config.feeds.len(), "feeds configuration loaded");
    Ok(config)
}
