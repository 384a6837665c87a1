//! Feed entity.
//!
//! A Feed row represents one syndication source. Its identity is the hash
//! of its canonical link, so re-ingesting the same URL updates the existing
//! record instead of creating a new one. The link is immutable once the
//! Feed exists: changing it changes the identity.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{check_http_url, check_len, check_opt_len};
use crate::clients::{Clients, TableRecord, TableStore as _};
use crate::error::{Error, Result};
use crate::hash::content_key;

/// All Feed records share one partition.
pub const FEED_PARTITION_KEY: &str = "feed";

/// Image metadata attached to a feed, persisted as a JSON string field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedImage {
    /// Image URL.
    pub url: String,
    /// Image title, if the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Link target of the image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A syndication feed.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Display title; defaults to "Untitled".
    pub title: String,
    /// Canonical feed URL — the identity source.
    pub link: Url,
    /// ISO language code ("en" or "en-US").
    pub language: Option<String>,
    /// Publisher name.
    pub publisher: Option<String>,
    /// Rights statement.
    pub rights: Option<String>,
    /// Last update advertised by the source.
    pub updated: DateTime<Utc>,
    /// Associated image metadata.
    pub image: Option<FeedImage>,
    /// Subtitle or short description.
    pub subtitle: Option<String>,
}

impl Feed {
    /// Create a feed for the given link with default metadata.
    pub fn new(link: Url) -> Self {
        Self {
            title: "Untitled".to_string(),
            link,
            language: None,
            publisher: None,
            rights: None,
            updated: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            image: None,
            subtitle: None,
        }
    }

    /// Partition key; constant across all feeds.
    pub fn partition_key(&self) -> &'static str {
        FEED_PARTITION_KEY
    }

    /// Row key derived from the canonical link.
    ///
    /// Stable across re-ingestion of the same URL.
    pub fn row_key(&self) -> String {
        content_key(self.link.as_str())
    }

    /// Validate all fields against the schema bounds.
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, 1, 200)?;
        check_http_url("link", &self.link)?;
        check_len("link", self.link.as_str(), 1, 500)?;
        if let Some(lang) = &self.language {
            check_language_code(lang)?;
        }
        check_opt_len("publisher", self.publisher.as_deref(), 1, 200)?;
        check_opt_len("rights", self.rights.as_deref(), 0, 500)?;
        check_opt_len("subtitle", self.subtitle.as_deref(), 0, 500)?;
        Ok(())
    }

    /// Serialize to a flat table record. Nested image metadata becomes a
    /// JSON string.
    pub fn to_record(&self) -> Result<TableRecord> {
        let mut record = TableRecord::new(self.partition_key(), self.row_key());
        record.set("Title", &self.title);
        record.set("Link", self.link.as_str());
        record.set_opt("Language", self.language.clone());
        record.set_opt("Publisher", self.publisher.clone());
        record.set_opt("Rights", self.rights.clone());
        record.set("Updated", self.updated.to_rfc3339());
        if let Some(image) = &self.image {
            record.set("Image", serde_json::to_string(image)?);
        }
        record.set_opt("Subtitle", self.subtitle.clone());
        Ok(record)
    }

    /// Validate, upsert, and return the feed (create-or-update by identity).
    pub async fn create(self, clients: &Clients) -> Result<Self> {
        self.save(clients).await?;
        Ok(self)
    }

    /// Upsert the current state. Safe to call repeatedly.
    pub async fn save(&self, clients: &Clients) -> Result<()> {
        self.validate()?;
        clients
            .tables
            .upsert(&clients.names.feeds_table, self.to_record()?)
            .await?;
        tracing::debug!(row_key = %self.row_key(), title = %self.title, "feed saved");
        Ok(())
    }

    /// Remove the structured record. Feeds own no blobs.
    pub async fn delete(&self, clients: &Clients) -> Result<()> {
        clients
            .tables
            .delete(
                &clients.names.feeds_table,
                self.partition_key(),
                &self.row_key(),
            )
            .await
    }
}

/// Validate an ISO language code: two lowercase letters, optionally
/// followed by a dash and a two-letter region ("en", "en-US").
fn check_language_code(code: &str) -> Result<()> {
    let bytes = code.as_bytes();
    let valid = match bytes.len() {
        2 => bytes.iter().all(u8::is_ascii_lowercase),
        5 => {
            bytes[..2].iter().all(u8::is_ascii_lowercase)
                && bytes[2] == b'-'
                && bytes[3..].iter().all(u8::is_ascii_alphabetic)
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field: "language",
            reason: format!("'{code}' is not a language code like 'en' or 'en-US'"),
        })
    }
}
