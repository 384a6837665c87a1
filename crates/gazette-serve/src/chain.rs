//! The poll → collect → summarize chain.
//!
//! One invocation runs to completion before the next is triggered, whether
//! by the daily schedule or an HTTP request. Per-feed and per-entry
//! failures are isolated inside each phase; only configuration problems
//! and queue outages abort a run.

use serde::Serialize;
use url::Url;

use gazette_core::failure;
use gazette_ingest::Result;

use crate::state::AppState;

/// Counters summarizing one chain run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ChainOutcome {
    /// Feed URLs checked by the detector.
    pub checked: usize,
    /// Feeds that had changed and were ingested.
    pub ingested: usize,
    /// Entries persisted across all ingested feeds.
    pub entries: usize,
    /// Entries skipped during ingestion.
    pub skipped: usize,
    /// Entries enriched.
    pub enriched: usize,
}

/// Run the full chain: detect changes, ingest changed feeds, enrich the
/// ingested entries, and advance the shared checkpoint.
pub async fn run_chain(state: &AppState) -> Result<ChainOutcome> {
    let since = *state.last_ingestion.read();
    let sweep = state.poller().poll_all(&state.feeds, since).await?;
    *state.last_ingestion.write() = sweep.checkpoint;

    let mut outcome = ChainOutcome {
        checked: sweep.checked,
        ..ChainOutcome::default()
    };

    let collected = collect(state, &sweep.updated).await?;
    outcome.ingested = collected.ingested;
    outcome.entries = collected.entries;
    outcome.skipped = collected.skipped;

    let report = summarize(state).await;
    outcome.enriched = report.enriched;
    outcome.skipped += report.skipped;

    tracing::info!(
        checked = outcome.checked,
        ingested = outcome.ingested,
        entries = outcome.entries,
        enriched = outcome.enriched,
        skipped = outcome.skipped,
        "chain run complete"
    );
    Ok(outcome)
}

/// Counters for the collect phase.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CollectOutcome {
    /// Feeds successfully ingested.
    pub ingested: usize,
    /// Entries persisted and queued for enrichment.
    pub entries: usize,
    /// Entries skipped.
    pub skipped: usize,
}

/// Ingest the given feeds, isolating per-feed failures, and stage the
/// persisted entries for the summarize phase.
pub async fn collect(state: &AppState, feed_urls: &[Url]) -> Result<CollectOutcome> {
    let pipeline = state.pipeline();
    let mut outcome = CollectOutcome::default();

    for feed_url in feed_urls {
        match pipeline.ingest(feed_url).await {
            Ok(report) => {
                outcome.ingested += 1;
                outcome.entries += report.entries.len();
                outcome.skipped += report.skipped;
                state.pending.lock().extend(report.entries);
            }
            Err(gazette_ingest::Error::Core(gazette_core::Error::Queue(e))) => {
                // Losing the queue service is fatal for the whole run.
                return Err(gazette_core::Error::Queue(e).into());
            }
            Err(e) => {
                failure::record_failure(&format!("failed to ingest feed {feed_url}: {e}"));
            }
        }
    }

    Ok(outcome)
}

/// Enrich all staged entries, draining the pending set.
pub async fn summarize(state: &AppState) -> gazette_ingest::EnrichReport {
    let mut batch = std::mem::take(&mut *state.pending.lock());
    if batch.is_empty() {
        return gazette_ingest::EnrichReport::default();
    }
    state.enricher().enrich_batch(&mut batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazette_core::memory::{memory_clients, ScriptedFetcher};
    use std::sync::Arc;

    const FEED_URL: &str = "https://example.com/feed.xml";

    fn feed_xml() -> String {
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>My Tech Feed</title>
<link>https://example.com/</link>
<description>Tech stories</description>
<item><guid>urn:item-1</guid><title>Story 1</title>
<link>https://example.com/posts/1</link>
<description>Summary of story one</description></item>
<item><guid>urn:item-2</guid><title>Story 2</title>
<link>https://example.com/posts/2</link>
<description>Summary of story two</description></item>
</channel></rss>"#
            .to_string()
    }

    fn state_with_feed() -> (AppState, Arc<ScriptedFetcher>) {
        let (clients, _, _, _) = memory_clients();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_body(FEED_URL, feed_xml());
        fetcher.set_body("https://example.com/posts/1", "body one");
        fetcher.set_body("https://example.com/posts/2", "body two");
        let state = AppState::new(
            clients,
            fetcher.clone(),
            vec![Url::parse(FEED_URL).unwrap()],
        );
        (state, fetcher)
    }

    #[tokio::test]
    async fn full_chain_ingests_and_enriches() {
        let (state, _) = state_with_feed();
        let outcome = run_chain(&state).await.unwrap();

        assert_eq!(outcome.checked, 1);
        assert_eq!(outcome.ingested, 1);
        assert_eq!(outcome.entries, 2);
        assert_eq!(outcome.enriched, 2);
        assert!(state.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn chain_advances_checkpoint() {
        let (state, _) = state_with_feed();
        let before = *state.last_ingestion.read();
        run_chain(&state).await.unwrap();
        assert!(*state.last_ingestion.read() > before);
    }

    #[tokio::test]
    async fn unchanged_feed_is_not_ingested() {
        let (state, fetcher) = state_with_feed();
        fetcher.set_status(FEED_URL, 304);
        let outcome = run_chain(&state).await.unwrap();
        assert_eq!(outcome.ingested, 0);
        assert_eq!(outcome.entries, 0);
    }

    #[tokio::test]
    async fn collect_isolates_a_broken_feed() {
        let (state, _fetcher) = state_with_feed();
        // No body is scripted for the broken feed, so its fetch fails.
        let broken = Url::parse("https://broken.example/feed").unwrap();
        let ok = Url::parse(FEED_URL).unwrap();

        let outcome = collect(&state, &[broken, ok]).await.unwrap();
        assert_eq!(outcome.ingested, 1);
        assert_eq!(outcome.entries, 2);
    }

    #[tokio::test]
    async fn summarize_drains_pending() {
        let (state, _) = state_with_feed();
        collect(&state, &[Url::parse(FEED_URL).unwrap()])
            .await
            .unwrap();
        assert_eq!(state.pending.lock().len(), 2);

        let report = summarize(&state).await;
        assert_eq!(report.enriched, 2);
        assert!(state.pending.lock().is_empty());

        // Nothing staged: a second summarize is a no-op.
        let report = summarize(&state).await;
        assert_eq!(report.enriched, 0);
    }
}
