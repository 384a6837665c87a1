//! Durable entities with content-derived identity.
//!
//! Every entity computes its (partition key, row key) identity from its own
//! content, never from an assigned counter: a [`Feed`] from its link, an
//! [`Entry`] from its upstream id, an [`AIEnrichment`] from its owning
//! entry, a [`Post`] from its title + content + draft date. Compact fields
//! are upserted to the table store as flat records; large payloads (entry
//! bodies, embedding vectors) live in the blob store under content-hash
//! keys and only the key is persisted inline.

mod enrichment;
mod entry;
mod feed;
mod post;

pub use enrichment::{AIEnrichment, EngagementCategory, Sentiment};
pub use entry::{Content, Entry};
pub use feed::{Feed, FeedImage, FEED_PARTITION_KEY};
pub use post::{DraftStatus, Post};

use crate::error::{Error, Result};

/// Check a required string field against length bounds.
pub(crate) fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(Error::InvalidField {
            field,
            reason: format!("shorter than {min} characters"),
        });
    }
    if len > max {
        return Err(Error::InvalidField {
            field,
            reason: format!("longer than {max} characters"),
        });
    }
    Ok(())
}

/// Check an optional string field against length bounds.
pub(crate) fn check_opt_len(
    field: &'static str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<()> {
    match value {
        Some(v) => check_len(field, v, min, max),
        None => Ok(()),
    }
}

/// Check that a URL uses the http or https scheme.
pub(crate) fn check_http_url(field: &'static str, url: &url::Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidField {
            field,
            reason: format!("URL scheme should be 'http' or 'https', got '{other}'"),
        }),
    }
}

/// Check a numeric field against an inclusive range.
pub(crate) fn check_range(field: &'static str, value: Option<f32>, min: f32, max: f32) -> Result<()> {
    if let Some(v) = value {
        if !(min..=max).contains(&v) {
            return Err(Error::InvalidField {
                field,
                reason: format!("{v} outside [{min}, {max}]"),
            });
        }
    }
    Ok(())
}

/// Check that a partition key is usable as a blob path segment
/// (alphanumeric, dash, underscore only).
pub(crate) fn check_partition_key(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::InvalidField {
            field,
            reason: format!("'{value}' contains characters outside [a-zA-Z0-9_-]"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds() {
        assert!(check_len("title", "ok", 1, 200).is_ok());
        assert!(check_len("title", "", 1, 200).is_err());
        assert!(check_len("title", &"x".repeat(201), 1, 200).is_err());
    }

    #[test]
    fn optional_length_skips_none() {
        assert!(check_opt_len("author", None, 2, 50).is_ok());
        assert!(check_opt_len("author", Some("a"), 2, 50).is_err());
    }

    #[test]
    fn url_scheme() {
        let https = url::Url::parse("https://example.com").unwrap();
        let ftp = url::Url::parse("ftp://example.com").unwrap();
        assert!(check_http_url("link", &https).is_ok());
        let err = check_http_url("link", &ftp).unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn partition_key_charset() {
        assert!(check_partition_key("partition_key", "my_tech_feed").is_ok());
        assert!(check_partition_key("partition_key", "feed-2024").is_ok());
        assert!(check_partition_key("partition_key", "").is_err());
        assert!(check_partition_key("partition_key", "my feed").is_err());
        assert!(check_partition_key("partition_key", "feed/evil").is_err());
    }
}
