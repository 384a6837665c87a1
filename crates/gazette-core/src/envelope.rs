//! Queue message envelope contract.
//!
//! Every message sent to a queue wraps its payload in an envelope carrying a
//! status, the envelope creation timestamp, and an optional concurrency tag.
//! Status values form a forward-only progression: producers never mutate a
//! sent message, they send a new envelope with the next status. Consumers
//! own statuses beyond the ones defined here, so unknown values deserialize
//! into [`EnvelopeStatus::Other`] instead of failing.
//!
//! # Wire shape
//!
//! ```json
//! { "envelope": { "status": "retrieved", "timestamp": "...", "eTag": null },
//!   "feed": "<feed row key or feed URL>",
//!   "entries": [["my_feed", "aabbccddeeff0011"], ...] }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Processing status carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    /// A feed URL was detected as changed and queued for ingestion.
    Enqueued,
    /// A feed was fully parsed and its entries persisted.
    Retrieved,
    /// A consumer-defined later state.
    #[serde(other)]
    Other,
}

/// The transport wrapper around a queue message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Current status of the unit of work.
    pub status: EnvelopeStatus,
    /// When this envelope was created (ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// Optional concurrency tag for optimistic updates; always null from
    /// producers in this repository.
    #[serde(rename = "eTag")]
    pub etag: Option<String>,
}

impl Envelope {
    /// Create an envelope with the given status, stamped now.
    pub fn new(status: EnvelopeStatus) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            etag: None,
        }
    }
}

/// Feed-level message: a URL whose feed changed, awaiting full ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedUpdateMessage {
    /// Envelope with status [`EnvelopeStatus::Enqueued`].
    pub envelope: Envelope,
    /// The feed URL to ingest.
    pub feed: Url,
}

impl FeedUpdateMessage {
    /// Wrap a changed feed URL for the feed-updates queue.
    pub fn new(feed: Url) -> Self {
        Self {
            envelope: Envelope::new(EnvelopeStatus::Enqueued),
            feed,
        }
    }
}

/// Entry-level message: a persisted feed and its entry keys, awaiting
/// enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryBatchMessage {
    /// Envelope with status [`EnvelopeStatus::Retrieved`].
    pub envelope: Envelope,
    /// Row key of the persisted Feed record.
    pub feed: String,
    /// `(partition_key, row_key)` of every persisted entry, in source order.
    pub entries: Vec<(String, String)>,
}

impl EntryBatchMessage {
    /// Wrap a persisted feed and its entry keys for the enrichment queue.
    pub fn new(feed_key: String, entries: Vec<(String, String)>) -> Self {
        Self {
            envelope: Envelope::new(EnvelopeStatus::Retrieved),
            feed: feed_key,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_update_wire_shape() {
        let url = Url::parse("https://example.com/feed").unwrap();
        let msg = FeedUpdateMessage::new(url);
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["envelope"]["status"], "enqueued");
        assert!(json["envelope"]["eTag"].is_null());
        assert!(json["envelope"]["timestamp"].is_string());
        assert_eq!(json["feed"], "https://example.com/feed");
    }

    #[test]
    fn entry_batch_wire_shape() {
        let msg = EntryBatchMessage::new(
            "00112233aabbccdd".to_string(),
            vec![
                ("my_feed".to_string(), "aaaaaaaaaaaaaaaa".to_string()),
                ("my_feed".to_string(), "bbbbbbbbbbbbbbbb".to_string()),
            ],
        );
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["envelope"]["status"], "retrieved");
        assert_eq!(json["feed"], "00112233aabbccdd");
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0][0], "my_feed");
        assert_eq!(entries[0][1], "aaaaaaaaaaaaaaaa");
    }

    #[test]
    fn round_trips_through_json() {
        let msg = EntryBatchMessage::new("feedkey0feedkey0".to_string(), vec![]);
        let text = serde_json::to_string(&msg).unwrap();
        let back: EntryBatchMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back.envelope.status, EnvelopeStatus::Retrieved);
        assert_eq!(back.feed, "feedkey0feedkey0");
        assert!(back.entries.is_empty());
    }

    #[test]
    fn unknown_status_parses_as_other() {
        let text = r#"{"status": "summarized", "timestamp": "2024-05-01T06:00:00Z", "eTag": null}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert_eq!(envelope.status, EnvelopeStatus::Other);
    }
}
