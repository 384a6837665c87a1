//! Periodic polling orchestrator.
//!
//! Sweeps the configured feed URLs through the change detector and
//! enqueues the URLs that changed to the feed-updates queue, deferring the
//! full parse to the ingestion pipeline stage. One shared "last ingestion"
//! checkpoint covers the whole sweep: it advances only after the sweep
//! completes, so a feed that failed to respond is simply re-checked with a
//! slightly coarser `since` next time.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use url::Url;

use gazette_core::{failure, Clients, FeedUpdateMessage, MessageQueue as _};

use crate::detector::FeedChangeDetector;
use crate::error::Result;

/// Result of one polling sweep.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// New shared checkpoint: when this sweep completed.
    pub checkpoint: DateTime<Utc>,
    /// Number of feed URLs checked.
    pub checked: usize,
    /// The URLs detected as changed and enqueued, in sweep order.
    pub updated: Vec<Url>,
}

/// Sweeps feeds and enqueues changed URLs.
pub struct Poller {
    clients: Clients,
    detector: FeedChangeDetector,
}

impl Poller {
    /// Create a poller using the bundle's queue client.
    pub fn new(clients: Clients, detector: FeedChangeDetector) -> Self {
        Self { clients, detector }
    }

    /// Check every feed URL and enqueue the changed ones.
    ///
    /// A failed update check is fail-safe: the feed is treated as "no
    /// update", the failure is recorded once, and the sweep continues.
    /// A queue send failure is fatal for the whole run.
    pub async fn poll_all(
        &self,
        feed_urls: &[Url],
        last_ingestion: DateTime<Utc>,
    ) -> Result<PollOutcome> {
        let mut updated = Vec::new();

        for feed_url in feed_urls {
            counter!("poll_feeds_checked_total").increment(1);
            match self.detector.has_update(feed_url, last_ingestion).await {
                Ok(true) => {
                    let message = FeedUpdateMessage::new(feed_url.clone());
                    let payload = serde_json::to_string(&message).map_err(gazette_core::Error::from)?;
                    self.clients
                        .queues
                        .send(&self.clients.names.feed_queue, payload)
                        .await?;
                    counter!("poll_feeds_updated_total").increment(1);
                    tracing::info!(url = %feed_url, "feed enqueued");
                    updated.push(feed_url.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    // Never treat a failed check as "has update".
                    counter!("poll_check_failures_total").increment(1);
                    failure::record_failure(&format!("failed to check feed {feed_url}: {e}"));
                }
            }
        }

        let checkpoint = Utc::now();
        gauge!("pipeline_last_sweep_timestamp_seconds").set(checkpoint.timestamp() as f64);
        tracing::info!(
            checked = feed_urls.len(),
            updated = updated.len(),
            "polling sweep complete"
        );

        Ok(PollOutcome {
            checkpoint,
            checked: feed_urls.len(),
            updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::epoch;
    use gazette_core::memory::{memory_clients, ScriptedFetcher};
    use gazette_core::EnvelopeStatus;
    use std::sync::Arc;

    fn urls(raw: &[&str]) -> Vec<Url> {
        raw.iter().map(|u| Url::parse(u).unwrap()).collect()
    }

    #[tokio::test]
    async fn enqueues_only_changed_feeds() {
        let (clients, _, _, queues) = memory_clients();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status("https://a.example/feed", 200);
        fetcher.set_status("https://b.example/feed", 304);
        fetcher.set_status("https://c.example/feed", 200);

        let poller = Poller::new(clients.clone(), FeedChangeDetector::new(fetcher));
        let feeds = urls(&[
            "https://a.example/feed",
            "https://b.example/feed",
            "https://c.example/feed",
        ]);

        let outcome = poller.poll_all(&feeds, epoch()).await.unwrap();
        assert_eq!(outcome.checked, 3);
        assert_eq!(outcome.updated.len(), 2);

        let messages = queues.messages(&clients.names.feed_queue);
        assert_eq!(messages.len(), 2);
        let first: FeedUpdateMessage = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(first.envelope.status, EnvelopeStatus::Enqueued);
        assert_eq!(first.feed.as_str(), "https://a.example/feed");
    }

    #[tokio::test]
    async fn check_failure_is_isolated_and_fail_safe() {
        let (clients, _, _, queues) = memory_clients();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status("https://broken.example/feed", 503);
        fetcher.set_status("https://ok.example/feed", 200);

        let poller = Poller::new(clients.clone(), FeedChangeDetector::new(fetcher));
        let feeds = urls(&["https://broken.example/feed", "https://ok.example/feed"]);

        let outcome = poller.poll_all(&feeds, epoch()).await.unwrap();
        // The broken feed is treated as "no update"; the sweep continued.
        assert_eq!(outcome.updated.len(), 1);
        assert_eq!(queues.messages(&clients.names.feed_queue).len(), 1);
    }

    #[tokio::test]
    async fn checkpoint_advances_after_sweep() {
        let (clients, _, _, _) = memory_clients();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status("https://a.example/feed", 304);

        let poller = Poller::new(clients, FeedChangeDetector::new(fetcher));
        let before = Utc::now();
        let outcome = poller
            .poll_all(&urls(&["https://a.example/feed"]), epoch())
            .await
            .unwrap();
        assert!(outcome.checkpoint >= before);
    }
}
