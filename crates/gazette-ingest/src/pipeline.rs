//! Feed/entry ingestion pipeline.
//!
//! Given a feed URL confirmed to have changed, the pipeline fetches and
//! parses the full feed, materializes the Feed and Entry entities (forcing
//! content resolution so no entry is persisted without a valid content
//! key), and publishes one entry-batch envelope to the enrichment queue.
//!
//! # Architecture
//!
//! ```text
//! [feed URL] → fetch+parse → upsert Feed → per entry: resolve content,
//!              upsert Entry → one `retrieved` envelope with all entry keys
//! ```
//!
//! Partial success is the normal case: an entry whose content cannot be
//! resolved is logged and skipped, and the remaining entries proceed.

use std::sync::Arc;

use metrics::counter;
use url::Url;

use gazette_core::{
    failure, Clients, Entry, EntryBatchMessage, Feed, FeedImage, HttpFetcher, MessageQueue as _,
};

use crate::detector::epoch;
use crate::error::{Error, Result};

/// Derive a partition token from a feed name: lowercase, with underscores
/// at word boundaries ("My Tech Feed" → "my_tech_feed", "TechCrunch" →
/// "tech_crunch").
///
/// This is a display grouping key only. Renaming a feed regroups future
/// entries without moving past ones; entry identity never depends on it.
pub fn partition_token(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_was_lower = false;
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            } else if c.is_ascii_uppercase() && prev_was_lower {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
            prev_was_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            pending_sep = true;
            prev_was_lower = false;
        }
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// Result of ingesting one feed.
#[derive(Debug)]
pub struct IngestReport {
    /// Row key of the persisted Feed record.
    pub feed_key: String,
    /// Partition token under which the entries were stored.
    pub partition_key: String,
    /// The persisted entries, in source order.
    pub entries: Vec<Entry>,
    /// Number of entries skipped due to per-entry failures.
    pub skipped: usize,
}

impl IngestReport {
    /// `(partition_key, row_key)` of every persisted entry, in source order.
    pub fn entry_keys(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.partition_key.clone(), e.row_key()))
            .collect()
    }
}

/// Parses feeds and materializes durable entities.
pub struct IngestionPipeline {
    clients: Clients,
    http: Arc<dyn HttpFetcher>,
}

impl IngestionPipeline {
    /// Create a pipeline over the given client bundle.
    pub fn new(clients: Clients, http: Arc<dyn HttpFetcher>) -> Self {
        Self { clients, http }
    }

    /// Fetch, parse, and persist one feed, then enqueue its entry keys.
    ///
    /// Fatal for this URL: an unfetchable or unparseable document, empty
    /// feed metadata, or a queue send failure. Per-entry failures are
    /// recorded and skipped. Each call re-fetches and re-parses from
    /// scratch.
    pub async fn ingest(&self, feed_url: &Url) -> Result<IngestReport> {
        let bytes = self.http.get_bytes(feed_url).await?;
        let parsed = feed_rs::parser::parse(bytes.as_ref())?;

        if parsed.title.is_none() && parsed.description.is_none() && parsed.links.is_empty() {
            return Err(Error::InvalidFeed {
                url: feed_url.to_string(),
            });
        }

        let feed = map_feed(&parsed, feed_url).create(&self.clients).await?;
        counter!("ingest_feeds_total").increment(1);
        let feed_key = feed.row_key();
        let partition_key = partition_token(&feed.title);
        tracing::debug!(feed_key = %feed_key, partition_key = %partition_key, "feed persisted");

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for item in &parsed.entries {
            match self.ingest_entry(item, &partition_key, &feed_key).await {
                Ok(entry) => {
                    counter!("ingest_entries_total").increment(1);
                    entries.push(entry);
                }
                Err(e) => {
                    skipped += 1;
                    counter!("ingest_entries_skipped_total").increment(1);
                    failure::record_failure(&format!(
                        "failed to ingest entry '{}' from {feed_url}: {e}",
                        item.id
                    ));
                }
            }
        }

        let report = IngestReport {
            feed_key: feed_key.clone(),
            partition_key,
            entries,
            skipped,
        };

        let message = EntryBatchMessage::new(feed_key, report.entry_keys());
        let payload = serde_json::to_string(&message).map_err(gazette_core::Error::from)?;
        self.clients
            .queues
            .send(&self.clients.names.entry_queue, payload)
            .await?;
        tracing::info!(
            url = %feed_url,
            entries = report.entries.len(),
            skipped = report.skipped,
            "feed ingested"
        );

        Ok(report)
    }

    /// Materialize one entry, forcing content resolution before persisting.
    async fn ingest_entry(
        &self,
        item: &feed_rs::model::Entry,
        partition_key: &str,
        feed_key: &str,
    ) -> Result<Entry> {
        let href = item
            .links
            .first()
            .map(|l| l.href.clone())
            .ok_or_else(|| gazette_core::Error::InvalidField {
                field: "link",
                reason: format!("entry '{}' has no link", item.id),
            })?;
        let link = Url::parse(&href).map_err(gazette_core::Error::from)?;

        let mut entry = Entry::new(partition_key, &item.id, feed_key, link);
        if let Some(title) = &item.title {
            if !title.content.is_empty() {
                entry.title = truncate_chars(&title.content, 200);
            }
        }
        entry.published = item.published.or(item.updated).unwrap_or_else(epoch);
        entry.author = item
            .authors
            .first()
            .map(|p| truncate_chars(&p.name, 50))
            .filter(|name| name.chars().count() >= 2);
        entry.summary = item
            .summary
            .as_ref()
            .map(|t| truncate_chars(&t.content, 500))
            .filter(|s| s.chars().count() >= 2);
        if let Some(source) = &item.source {
            entry.source = Some([("id".to_string(), source.clone())].into());
        }

        // An inline body from the feed is a content write; otherwise force
        // the blob → HTTP resolution chain now, so the persisted record
        // always carries a valid content key.
        let inline_body = item
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .filter(|b| !b.is_empty());
        match inline_body {
            Some(body) => entry.set_content(body, &self.clients).await?,
            None => {
                entry
                    .resolve_content(&self.clients, self.http.as_ref())
                    .await?;
            }
        }

        Ok(entry.create(&self.clients).await?)
    }
}

/// Map parsed feed metadata onto the Feed entity.
fn map_feed(parsed: &feed_rs::model::Feed, feed_url: &Url) -> Feed {
    let link = parsed
        .links
        .first()
        .and_then(|l| Url::parse(&l.href).ok())
        .unwrap_or_else(|| feed_url.clone());

    let mut feed = Feed::new(link);
    if let Some(title) = &parsed.title {
        if !title.content.is_empty() {
            feed.title = truncate_chars(&title.content, 200);
        }
    }
    feed.language = parsed.language.clone();
    feed.publisher = parsed
        .contributors
        .first()
        .or_else(|| parsed.authors.first())
        .map(|p| truncate_chars(&p.name, 200));
    feed.rights = parsed.rights.as_ref().map(|t| truncate_chars(&t.content, 500));
    if let Some(updated) = parsed.updated.or(parsed.published) {
        feed.updated = updated;
    }
    feed.image = parsed.logo.as_ref().or(parsed.icon.as_ref()).map(|image| FeedImage {
        url: image.uri.clone(),
        title: image.title.clone(),
        link: image.link.as_ref().map(|l| l.href.clone()),
    });
    feed.subtitle = parsed
        .description
        .as_ref()
        .map(|t| truncate_chars(&t.content, 500));
    feed
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazette_core::memory::{memory_clients, ScriptedFetcher};
    use gazette_core::{content_key, EnvelopeStatus};

    const FEED_URL: &str = "https://example.com/feed.xml";

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>My Tech Feed</title>
<link>https://example.com/</link>
<description>Tech stories</description>
{items}
</channel></rss>"#
        )
    }

    fn item(n: u32) -> String {
        format!(
            r#"<item><guid>urn:item-{n}</guid><title>Story {n}</title>
<link>https://example.com/posts/{n}</link>
<description>Summary of story {n}</description></item>"#
        )
    }

    fn pipeline_with(
        xml: &str,
    ) -> (
        IngestionPipeline,
        std::sync::Arc<gazette_core::memory::MemoryQueue>,
        std::sync::Arc<gazette_core::memory::MemoryTableStore>,
        std::sync::Arc<ScriptedFetcher>,
    ) {
        let (clients, tables, _, queues) = memory_clients();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_body(FEED_URL, xml.to_string());
        let pipeline = IngestionPipeline::new(clients, fetcher.clone());
        (pipeline, queues, tables, fetcher)
    }

    #[test]
    fn partition_token_word_boundaries() {
        assert_eq!(partition_token("My Tech Feed"), "my_tech_feed");
        assert_eq!(partition_token("TechCrunch"), "tech_crunch");
        assert_eq!(partition_token("ABC News"), "abc_news");
        assert_eq!(partition_token("Ars Technica - All"), "ars_technica_all");
        assert_eq!(partition_token("already_snake"), "already_snake");
        assert_eq!(partition_token(""), "untitled");
        assert_eq!(partition_token("***"), "untitled");
    }

    #[tokio::test]
    async fn ingest_persists_feed_and_entries() {
        let xml = rss(&format!("{}{}", item(1), item(2)));
        let (pipeline, _, tables, fetcher) = pipeline_with(&xml);
        fetcher.set_body("https://example.com/posts/1", "body one");
        fetcher.set_body("https://example.com/posts/2", "body two");

        let url = Url::parse(FEED_URL).unwrap();
        let report = pipeline.ingest(&url).await.unwrap();

        assert_eq!(report.partition_key, "my_tech_feed");
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(tables.len("feeds"), 1);
        assert_eq!(tables.len("entries"), 2);

        // Feed identity comes from the channel link, not the fetch URL.
        assert_eq!(report.feed_key, content_key("https://example.com/"));
    }

    #[tokio::test]
    async fn envelope_shape_matches_contract() {
        let xml = rss(&format!("{}{}", item(1), item(2)));
        let (pipeline, queues, _, fetcher) = pipeline_with(&xml);
        fetcher.set_body("https://example.com/posts/1", "body one");
        fetcher.set_body("https://example.com/posts/2", "body two");

        let url = Url::parse(FEED_URL).unwrap();
        let report = pipeline.ingest(&url).await.unwrap();

        let messages = queues.messages("entry-enrichment");
        assert_eq!(messages.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(json["envelope"]["status"], "retrieved");
        assert_eq!(json["feed"], report.feed_key);
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0][0], "my_tech_feed");
        assert_eq!(entries[0][1], content_key("urn:item-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_failure_is_skipped_not_fatal() {
        let xml = rss(&format!(
            "{}{}{}{}{}",
            item(1),
            item(2),
            item(3),
            item(4),
            item(5)
        ));
        let (pipeline, queues, tables, fetcher) = pipeline_with(&xml);
        for n in [1u32, 2, 4, 5] {
            fetcher.set_body(&format!("https://example.com/posts/{n}"), format!("body {n}"));
        }
        // Entry 3's content is reachable neither via blob nor HTTP.

        let url = Url::parse(FEED_URL).unwrap();
        let report = pipeline.ingest(&url).await.unwrap();

        assert_eq!(report.entries.len(), 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(tables.len("entries"), 4);

        let json: serde_json::Value =
            serde_json::from_str(&queues.messages("entry-enrichment")[0]).unwrap();
        assert_eq!(json["entries"].as_array().unwrap().len(), 4);
        let keys: Vec<String> = json["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| pair[1].as_str().unwrap().to_string())
            .collect();
        assert!(!keys.contains(&content_key("urn:item-3")));
    }

    #[tokio::test]
    async fn entries_enqueued_in_source_order() {
        let xml = rss(&format!("{}{}{}", item(3), item(1), item(2)));
        let (pipeline, queues, _, fetcher) = pipeline_with(&xml);
        for n in [1u32, 2, 3] {
            fetcher.set_body(&format!("https://example.com/posts/{n}"), "body");
        }

        let url = Url::parse(FEED_URL).unwrap();
        pipeline.ingest(&url).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&queues.messages("entry-enrichment")[0]).unwrap();
        let keys: Vec<String> = json["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| pair[1].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                content_key("urn:item-3"),
                content_key("urn:item-1"),
                content_key("urn:item-2"),
            ]
        );
    }

    #[tokio::test]
    async fn inline_content_skips_http_fetch() {
        let xml = rss(
            r#"<item><guid>urn:item-1</guid><title>Story</title>
<link>https://example.com/posts/1</link>
<content:encoded xmlns:content="http://purl.org/rss/1.0/modules/content/"><![CDATA[<p>inline body</p>]]></content:encoded>
</item>"#,
        );
        let (pipeline, _, _, _fetcher) = pipeline_with(&xml);
        // No body scripted for the entry link: resolution must come from
        // the inline content.

        let url = Url::parse(FEED_URL).unwrap();
        let report = pipeline.ingest(&url).await.unwrap();
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].cached_content().unwrap().contains("inline body"));
    }

    #[tokio::test]
    async fn empty_metadata_is_invalid_feed() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let (pipeline, _, _, _) = pipeline_with(xml);
        let url = Url::parse(FEED_URL).unwrap();
        let result = pipeline.ingest(&url).await;
        assert!(matches!(result, Err(Error::InvalidFeed { .. })));
    }

    #[tokio::test]
    async fn reingest_updates_in_place() {
        let xml = rss(&item(1));
        let (pipeline, queues, tables, fetcher) = pipeline_with(&xml);
        fetcher.set_body("https://example.com/posts/1", "body");

        let url = Url::parse(FEED_URL).unwrap();
        pipeline.ingest(&url).await.unwrap();
        pipeline.ingest(&url).await.unwrap();

        // Same identities: still one feed record and one entry record,
        // but one envelope per ingest call.
        assert_eq!(tables.len("feeds"), 1);
        assert_eq!(tables.len("entries"), 1);
        assert_eq!(queues.messages("entry-enrichment").len(), 2);
        let last: serde_json::Value =
            serde_json::from_str(&queues.messages("entry-enrichment")[1]).unwrap();
        assert_eq!(
            last["envelope"]["status"],
            serde_json::to_value(EnvelopeStatus::Retrieved).unwrap()
        );
    }
}
