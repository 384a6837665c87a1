//! Feed change detection via HTTP conditional fetch.
//!
//! Decides cheaply whether a feed endpoint has new content since a given
//! timestamp: a GET with an `If-Modified-Since` header answers 200 for
//! new/unknown content and 304 for unchanged. The full feed body is never
//! parsed here.
//!
//! Servers that honor conditional requests rely on exact RFC 1123 date
//! formatting; a malformed header merely degrades to "always treat as new".

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use gazette_core::{Error, HttpFetcher, Result, RetryPolicy};

/// Default `since` for feeds that have never been checked.
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or_default()
}

/// Format a timestamp per RFC 1123 for the `If-Modified-Since` header,
/// e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn format_rfc1123(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Checks feed endpoints for updates using conditional GET requests.
pub struct FeedChangeDetector {
    http: Arc<dyn HttpFetcher>,
    retry: RetryPolicy,
}

impl FeedChangeDetector {
    /// Create a detector with the standard one-retry/no-backoff policy.
    pub fn new(http: Arc<dyn HttpFetcher>) -> Self {
        Self {
            http,
            retry: RetryPolicy::single_retry(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check whether the feed at `feed_url` has changed since `since`.
    ///
    /// Returns `true` on HTTP 200 (new or unknown content) and `false` on
    /// 304 (not modified). Any other status or a network failure is a fetch
    /// error, retried once before surfacing. No shared state is touched;
    /// the caller persists the new "last checked" timestamp after a
    /// successful sweep.
    pub async fn has_update(&self, feed_url: &Url, since: DateTime<Utc>) -> Result<bool> {
        let header = format_rfc1123(since);
        self.retry
            .run("feed update check", || async {
                let status = self.http.conditional_get(feed_url, &header).await?;
                match status {
                    200 => Ok(true),
                    304 => {
                        tracing::debug!(url = %feed_url, "feed not updated");
                        Ok(false)
                    }
                    other => Err(Error::Fetch(format!(
                        "unexpected status {other} checking {feed_url}"
                    ))),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazette_core::memory::ScriptedFetcher;

    fn url() -> Url {
        Url::parse("https://example.com/feed.xml").unwrap()
    }

    #[test]
    fn rfc1123_epoch() {
        assert_eq!(format_rfc1123(epoch()), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn rfc1123_known_date() {
        let t = Utc.with_ymd_and_hms(2024, 5, 17, 6, 0, 0).unwrap();
        assert_eq!(format_rfc1123(t), "Fri, 17 May 2024 06:00:00 GMT");
    }

    #[tokio::test]
    async fn status_200_means_update() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status(url().as_str(), 200);
        let detector = FeedChangeDetector::new(fetcher);
        assert!(detector.has_update(&url(), epoch()).await.unwrap());
    }

    #[tokio::test]
    async fn status_304_means_no_update() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status(url().as_str(), 304);
        let detector = FeedChangeDetector::new(fetcher);
        assert!(!detector.has_update(&url(), epoch()).await.unwrap());
    }

    #[tokio::test]
    async fn conditional_semantics_depend_on_since() {
        // The server answers 304 for a check after T1 and 200 for one
        // before it; the detector just relays the conditional result.
        let fetcher = Arc::new(ScriptedFetcher::new());
        let detector = FeedChangeDetector::new(fetcher.clone());

        let t0 = epoch();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 17, 6, 0, 0).unwrap();

        fetcher.set_status(url().as_str(), 200);
        assert!(detector.has_update(&url(), t0).await.unwrap());

        fetcher.set_status(url().as_str(), 304);
        assert!(!detector.has_update(&url(), t1).await.unwrap());

        let calls = fetcher.conditional_calls();
        assert_eq!(calls[0].1, format_rfc1123(t0));
        assert_eq!(calls[1].1, format_rfc1123(t1));
    }

    #[tokio::test]
    async fn unexpected_status_errors_after_one_retry() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_status(url().as_str(), 500);
        let detector = FeedChangeDetector::new(fetcher.clone());

        let result = detector.has_update(&url(), epoch()).await;
        assert!(matches!(result, Err(Error::Fetch(_))));
        // Initial attempt plus exactly one retry, no backoff.
        assert_eq!(fetcher.conditional_calls().len(), 2);
    }
}
