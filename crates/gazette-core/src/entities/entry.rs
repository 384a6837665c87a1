//! Entry entity and its blob-backed content.
//!
//! An Entry is one item of a feed. The body text is never stored inline in
//! the table record: writing content computes its hash, uploads the text to
//! the blob store at `{partition_key}/{content_key}.txt`, and persists only
//! the key. Reading goes cache → blob store → HTTP fetch of the entry's
//! link, caching whatever it finds for the lifetime of the in-memory value.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use super::{check_http_url, check_len, check_opt_len, check_partition_key};
use crate::clients::{BlobStore as _, Clients, HttpFetcher, TableRecord, TableStore as _};
use crate::error::{Error, Result};
use crate::hash::{content_key, is_content_key};
use crate::retry::RetryPolicy;

/// Two-state body content of an entry.
///
/// `Unresolved` knows at most the content hash; `Resolved` additionally
/// holds the materialized text. The key and the cached text always move
/// together: every write recomputes both, and a failed blob upload leaves
/// the previous state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Only the content hash (if any) is known.
    Unresolved {
        /// Content key persisted in the table record, if previously set.
        key: Option<String>,
    },
    /// Hash and materialized text are both in memory.
    Resolved {
        /// Content key of the text.
        key: String,
        /// The body text.
        text: String,
    },
}

/// One feed item.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Grouping key derived from the owning feed's name.
    pub partition_key: String,
    /// Display title; defaults to "Untitled".
    pub title: String,
    /// Upstream-provided unique id — the identity source.
    pub id: String,
    /// Row key of the owning Feed record.
    pub feed_key: String,
    /// Canonical link to the item.
    pub link: Url,
    /// Published timestamp.
    pub published: DateTime<Utc>,
    /// Author name.
    pub author: Option<String>,
    /// Source-provided summary.
    pub summary: Option<String>,
    /// Source metadata, persisted as a JSON string.
    pub source: Option<BTreeMap<String, String>>,
    content: Content,
}

impl Entry {
    /// Create an entry with default metadata and unresolved content.
    pub fn new(
        partition_key: impl Into<String>,
        id: impl Into<String>,
        feed_key: impl Into<String>,
        link: Url,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            title: "Untitled".to_string(),
            id: id.into(),
            feed_key: feed_key.into(),
            link,
            published: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            author: None,
            summary: None,
            source: None,
            content: Content::Unresolved { key: None },
        }
    }

    /// Row key derived from the upstream id.
    pub fn row_key(&self) -> String {
        content_key(&self.id)
    }

    /// Content key, if content has ever been set or referenced.
    pub fn content_key(&self) -> Option<&str> {
        match &self.content {
            Content::Unresolved { key } => key.as_deref(),
            Content::Resolved { key, .. } => Some(key),
        }
    }

    /// The cached body text, if resolved.
    pub fn cached_content(&self) -> Option<&str> {
        match &self.content {
            Content::Resolved { text, .. } => Some(text),
            Content::Unresolved { .. } => None,
        }
    }

    /// Adopt a content key loaded from a persisted record without
    /// materializing the text.
    pub fn set_content_key(&mut self, key: String) {
        self.content = Content::Unresolved { key: Some(key) };
    }

    /// Drop the materialized text, keeping only the key.
    ///
    /// The next [`Self::resolve_content`] call re-reads from the blob store.
    pub fn evict_cached_content(&mut self) {
        let content = std::mem::replace(&mut self.content, Content::Unresolved { key: None });
        self.content = match content {
            Content::Resolved { key, .. } => Content::Unresolved { key: Some(key) },
            unresolved => unresolved,
        };
    }

    /// Write body content: hash it, upload the blob, then swap key and
    /// cache together. A failed upload leaves the previous state intact.
    pub async fn set_content(&mut self, text: String, clients: &Clients) -> Result<()> {
        let key = content_key(text.as_bytes());
        clients
            .blobs
            .put(
                &clients.names.entries_container,
                &self.content_path(&key),
                Bytes::from(text.clone().into_bytes()),
            )
            .await?;
        self.content = Content::Resolved { key, text };
        Ok(())
    }

    /// Resolve the body text, fetching it if necessary.
    ///
    /// Order: in-memory cache, then the blob store by content key, then an
    /// HTTP GET of the entry's link (3 retries, 2 s apart). Content fetched
    /// over HTTP is written back through [`Self::set_content`] so the blob
    /// store and key stay consistent.
    pub async fn resolve_content(
        &mut self,
        clients: &Clients,
        http: &dyn HttpFetcher,
    ) -> Result<&str> {
        self.ensure_content(clients, http).await?;
        match &self.content {
            Content::Resolved { text, .. } => Ok(text),
            Content::Unresolved { .. } => Err(Error::ContentUnavailable {
                row_key: self.row_key(),
            }),
        }
    }

    async fn ensure_content(&mut self, clients: &Clients, http: &dyn HttpFetcher) -> Result<()> {
        let key = match &self.content {
            Content::Resolved { .. } => return Ok(()),
            Content::Unresolved { key } => key.clone(),
        };

        if let Some(key) = key {
            match clients
                .blobs
                .get(&clients.names.entries_container, &self.content_path(&key))
                .await
            {
                Ok(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        self.content = Content::Resolved { key, text };
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(row_key = %self.row_key(), error = %e,
                            "content blob is not valid UTF-8, refetching");
                    }
                },
                Err(e) => {
                    tracing::debug!(row_key = %self.row_key(), error = %e,
                        "content blob unavailable, falling back to HTTP");
                }
            }
        }

        let link = self.link.clone();
        let text = RetryPolicy::content_fetch()
            .run("entry content fetch", || http.get_text(&link))
            .await
            .map_err(|e| {
                tracing::debug!(row_key = %self.row_key(), error = %e, "content HTTP fetch failed");
                Error::ContentUnavailable {
                    row_key: self.row_key(),
                }
            })?;
        self.set_content(text, clients).await
    }

    fn content_path(&self, key: &str) -> String {
        format!("{}/{key}.txt", self.partition_key)
    }

    /// Validate all fields against the schema bounds.
    pub fn validate(&self) -> Result<()> {
        check_partition_key("partition_key", &self.partition_key)?;
        check_len("title", &self.title, 1, 200)?;
        check_len("id", &self.id, 1, 200)?;
        if !is_content_key(&self.feed_key) {
            return Err(Error::InvalidField {
                field: "feed_key",
                reason: format!("'{}' is not a 16-hex content key", self.feed_key),
            });
        }
        check_http_url("link", &self.link)?;
        check_opt_len("author", self.author.as_deref(), 2, 50)?;
        check_opt_len("summary", self.summary.as_deref(), 2, 500)?;
        Ok(())
    }

    /// Serialize to a flat table record; the body stays in the blob store,
    /// only its key is included.
    pub fn to_record(&self) -> Result<TableRecord> {
        let mut record = TableRecord::new(self.partition_key.as_str(), self.row_key());
        record.set("Title", &self.title);
        record.set("Id", &self.id);
        record.set("FeedKey", &self.feed_key);
        record.set("Link", self.link.as_str());
        record.set("Published", self.published.to_rfc3339());
        record.set_opt("Author", self.author.clone());
        record.set_opt("Summary", self.summary.clone());
        if let Some(source) = &self.source {
            record.set("Source", serde_json::to_string(source)?);
        }
        record.set_opt("ContentKey", self.content_key().map(str::to_string));
        Ok(record)
    }

    /// Validate, upsert, and return the entry (create-or-update by identity).
    pub async fn create(self, clients: &Clients) -> Result<Self> {
        self.save(clients).await?;
        Ok(self)
    }

    /// Upsert the current state. Safe to call repeatedly.
    pub async fn save(&self, clients: &Clients) -> Result<()> {
        self.validate()?;
        clients
            .tables
            .upsert(&clients.names.entries_table, self.to_record()?)
            .await?;
        tracing::debug!(row_key = %self.row_key(), partition_key = %self.partition_key, "entry saved");
        Ok(())
    }

    /// Remove the structured record; the content blob follows the bundle's
    /// delete policy.
    pub async fn delete(&self, clients: &Clients) -> Result<()> {
        clients
            .tables
            .delete(
                &clients.names.entries_table,
                &self.partition_key,
                &self.row_key(),
            )
            .await?;
        if clients.delete_policy == crate::clients::DeletePolicy::PurgeBlobs {
            if let Some(key) = self.content_key() {
                let path = self.content_path(key);
                clients
                    .blobs
                    .delete(&clients.names.entries_container, &path)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::DeletePolicy;
    use crate::memory::{memory_clients, ScriptedFetcher};

    fn entry() -> Entry {
        let mut e = Entry::new(
            "my_tech_feed",
            "urn:example:item-1",
            content_key("https://example.com/feed.xml"),
            Url::parse("https://example.com/posts/1").unwrap(),
        );
        e.title = "First Post".to_string();
        e.author = Some("Jo Writer".to_string());
        e
    }

    #[test]
    fn identity_from_upstream_id() {
        let a = entry();
        let b = entry();
        assert_eq!(a.row_key(), b.row_key());

        let mut c = entry();
        c.id = "urn:example:item-2".to_string();
        assert_ne!(a.row_key(), c.row_key());
    }

    #[test]
    fn identity_ignores_partition() {
        let a = entry();
        let mut b = entry();
        b.partition_key = "renamed_feed".to_string();
        assert_eq!(a.row_key(), b.row_key());
    }

    #[test]
    fn rejects_bad_feed_key() {
        let mut e = entry();
        e.feed_key = "nothex".to_string();
        assert!(matches!(
            e.validate(),
            Err(Error::InvalidField { field: "feed_key", .. })
        ));
    }

    #[test]
    fn rejects_short_author() {
        let mut e = entry();
        e.author = Some("J".to_string());
        assert!(e.validate().is_err());
    }

    #[tokio::test]
    async fn set_content_uploads_blob_and_persists_key_only() {
        let (clients, tables, blobs, _) = memory_clients();
        let mut e = entry();
        e.set_content("the article body".to_string(), &clients)
            .await
            .unwrap();
        e.save(&clients).await.unwrap();

        let key = e.content_key().unwrap().to_string();
        assert!(blobs.contains("entries", &format!("my_tech_feed/{key}.txt")));

        let record = tables
            .get(&clients.names.entries_table, "my_tech_feed", &e.row_key())
            .unwrap();
        assert_eq!(record["ContentKey"], key);
        assert!(!record.values().any(|v| v == "the article body"));
    }

    #[tokio::test]
    async fn content_round_trips_through_cache_and_blob() {
        let (clients, _, _, _) = memory_clients();
        let http = ScriptedFetcher::new();
        let mut e = entry();
        e.set_content("body text C".to_string(), &clients)
            .await
            .unwrap();

        // From cache.
        assert_eq!(
            e.resolve_content(&clients, &http).await.unwrap(),
            "body text C"
        );

        // Simulate cache eviction; must re-read from the blob store.
        e.evict_cached_content();
        assert!(e.cached_content().is_none());
        assert_eq!(
            e.resolve_content(&clients, &http).await.unwrap(),
            "body text C"
        );
    }

    #[tokio::test]
    async fn blob_miss_falls_back_to_http() {
        let (clients, _, blobs, _) = memory_clients();
        let http = ScriptedFetcher::new();
        http.set_body("https://example.com/posts/1", "fetched over http");

        let mut e = entry();
        e.set_content_key("deadbeefdeadbeef".to_string());

        let text = e.resolve_content(&clients, &http).await.unwrap();
        assert_eq!(text, "fetched over http");

        // The fetched content was written back under its own hash.
        let key = content_key("fetched over http");
        assert_eq!(e.content_key(), Some(key.as_str()));
        assert!(blobs.contains("entries", &format!("my_tech_feed/{key}.txt")));
    }

    #[tokio::test(start_paused = true)]
    async fn both_sources_failing_is_an_error_not_a_panic() {
        let (clients, _, _, _) = memory_clients();
        let http = ScriptedFetcher::new(); // no body scripted -> fetch error

        let mut e = entry();
        let result = e.resolve_content(&clients, &http).await;
        assert!(matches!(result, Err(Error::ContentUnavailable { .. })));
    }

    #[tokio::test]
    async fn delete_keeps_blob_by_default() {
        let (clients, tables, blobs, _) = memory_clients();
        let mut e = entry();
        e.set_content("body".to_string(), &clients).await.unwrap();
        e.save(&clients).await.unwrap();

        e.delete(&clients).await.unwrap();
        assert!(tables.is_empty(&clients.names.entries_table));
        assert_eq!(blobs.len(), 1);
    }

    #[tokio::test]
    async fn delete_purges_blob_when_configured() {
        let (clients, _, blobs, _) = memory_clients();
        let clients = clients.with_delete_policy(DeletePolicy::PurgeBlobs);
        let mut e = entry();
        e.set_content("body".to_string(), &clients).await.unwrap();
        e.save(&clients).await.unwrap();

        e.delete(&clients).await.unwrap();
        assert!(blobs.is_empty());
    }
}
