//! AIEnrichment entity.
//!
//! One-to-one sidecar of an [`super::Entry`]: it inherits the entry's
//! partition and row keys. Embedding vectors follow the same blob split as
//! entry bodies — serialized to NPY bytes, hashed, uploaded to
//! `{partition_key}/{hash}.npy`, with only the hash in the table record.

use std::collections::BTreeSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{check_opt_len, check_partition_key, check_range, Entry};
use crate::clients::{BlobStore as _, Clients, DeletePolicy, TableRecord, TableStore as _};
use crate::error::{Error, Result};
use crate::hash::{content_key, is_content_key};
use crate::npy;

/// Reader-engagement category assigned by the enrichment stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EngagementCategory {
    /// Readers tend to like/upvote this kind of item.
    Liked,
    /// Readers tend to comment on it.
    Comment,
    /// Readers tend to share it.
    Shared,
}

/// Overall sentiment assigned by the enrichment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    /// Predominantly positive tone.
    Positive,
    /// Predominantly negative tone.
    Negative,
    /// No strong tone either way.
    Neutral,
    /// Both strongly positive and negative passages.
    Mixed,
}

/// Two-state embedding vector, mirroring [`super::Content`].
#[derive(Debug, Clone, PartialEq)]
enum Embedding {
    Unresolved { key: Option<String> },
    Resolved { key: String, vector: Vec<f32> },
}

/// AI-derived metadata for one entry.
#[derive(Debug, Clone)]
pub struct AIEnrichment {
    /// Partition key inherited from the owning entry.
    pub partition_key: String,
    /// Row key inherited from the owning entry.
    pub row_key: String,
    /// AI-generated summary.
    pub summary: Option<String>,
    /// Overall sentiment of the entry.
    pub sentiment: Option<Sentiment>,
    /// Sentiment score, -1 (negative) to 1 (positive).
    pub sentiment_score: Option<f32>,
    /// Grade-level readability score, 0 (easiest) to 15 (academic).
    pub grade_level: Option<f32>,
    /// Difficulty score, 4.9 (easy) to 11 (very difficult).
    pub difficulty: Option<f32>,
    /// Engagement score, 0 to 10.
    pub engagement_score: Option<f32>,
    /// 1–3 unique engagement categories, when assigned.
    pub engagement_categories: Option<BTreeSet<EngagementCategory>>,
    embedding: Embedding,
}

impl AIEnrichment {
    /// Create an enrichment record for an entry, inheriting its identity.
    pub fn for_entry(entry: &Entry) -> Self {
        Self {
            partition_key: entry.partition_key.clone(),
            row_key: entry.row_key(),
            summary: None,
            sentiment: None,
            sentiment_score: None,
            grade_level: None,
            difficulty: None,
            engagement_score: None,
            engagement_categories: None,
            embedding: Embedding::Unresolved { key: None },
        }
    }

    /// Embedding key, if a vector has ever been set or referenced.
    pub fn embedding_key(&self) -> Option<&str> {
        match &self.embedding {
            Embedding::Unresolved { key } => key.as_deref(),
            Embedding::Resolved { key, .. } => Some(key),
        }
    }

    /// Adopt an embedding key loaded from a persisted record.
    pub fn set_embedding_key(&mut self, key: String) {
        self.embedding = Embedding::Unresolved { key: Some(key) };
    }

    /// Write an embedding vector: encode to NPY, hash, upload, then swap
    /// key and cache together.
    pub async fn set_embedding(&mut self, vector: Vec<f32>, clients: &Clients) -> Result<()> {
        let bytes = npy::encode_f32(&vector);
        let key = content_key(&bytes);
        clients
            .blobs
            .put(
                &clients.names.entries_container,
                &self.embedding_path(&key),
                Bytes::from(bytes),
            )
            .await?;
        self.embedding = Embedding::Resolved { key, vector };
        Ok(())
    }

    /// Resolve the embedding vector from cache or the blob store.
    ///
    /// Unlike entry content there is no HTTP fallback: a missing blob is
    /// an error.
    pub async fn resolve_embedding(&mut self, clients: &Clients) -> Result<&[f32]> {
        if let Embedding::Unresolved { key } = &self.embedding {
            let key = key.clone().ok_or_else(|| self.unavailable())?;
            let bytes = clients
                .blobs
                .get(&clients.names.entries_container, &self.embedding_path(&key))
                .await
                .map_err(|e| match e {
                    Error::BlobNotFound { .. } => self.unavailable(),
                    other => other,
                })?;
            let vector = npy::decode_f32(&bytes)?;
            self.embedding = Embedding::Resolved { key, vector };
        }
        match &self.embedding {
            Embedding::Resolved { vector, .. } => Ok(vector),
            Embedding::Unresolved { .. } => Err(self.unavailable()),
        }
    }

    fn unavailable(&self) -> Error {
        Error::EmbeddingUnavailable {
            partition_key: self.partition_key.clone(),
            row_key: self.row_key.clone(),
        }
    }

    fn embedding_path(&self, key: &str) -> String {
        format!("{}/{key}.npy", self.partition_key)
    }

    /// Validate all fields against the schema bounds.
    pub fn validate(&self) -> Result<()> {
        check_partition_key("partition_key", &self.partition_key)?;
        if !is_content_key(&self.row_key) {
            return Err(Error::InvalidField {
                field: "row_key",
                reason: format!("'{}' is not a 16-hex content key", self.row_key),
            });
        }
        check_opt_len("summary", self.summary.as_deref(), 1, 500)?;
        check_range("sentiment_score", self.sentiment_score, -1.0, 1.0)?;
        check_range("grade_level", self.grade_level, 0.0, 15.0)?;
        check_range("difficulty", self.difficulty, 4.9, 11.0)?;
        check_range("engagement_score", self.engagement_score, 0.0, 10.0)?;
        if let Some(categories) = &self.engagement_categories {
            if categories.is_empty() || categories.len() > 3 {
                return Err(Error::InvalidField {
                    field: "engagement_categories",
                    reason: format!("expected 1-3 categories, got {}", categories.len()),
                });
            }
        }
        Ok(())
    }

    /// Serialize to a flat table record; the vector stays in the blob
    /// store, only its key is included.
    pub fn to_record(&self) -> Result<TableRecord> {
        let mut record = TableRecord::new(self.partition_key.as_str(), self.row_key.as_str());
        record.set_opt("Summary", self.summary.clone());
        if let Some(sentiment) = &self.sentiment {
            record.set("Sentiment", serde_json::to_string(sentiment)?);
        }
        record.set_opt(
            "SentimentScore",
            self.sentiment_score.map(|v| v.to_string()),
        );
        record.set_opt("GradeLevel", self.grade_level.map(|v| v.to_string()));
        record.set_opt("Difficulty", self.difficulty.map(|v| v.to_string()));
        record.set_opt(
            "EngagementScore",
            self.engagement_score.map(|v| v.to_string()),
        );
        if let Some(categories) = &self.engagement_categories {
            record.set("EngagementCategories", serde_json::to_string(categories)?);
        }
        record.set_opt("EmbeddingsKey", self.embedding_key().map(str::to_string));
        Ok(record)
    }

    /// Validate, upsert, and return the record (re-enrichment upserts).
    pub async fn create(self, clients: &Clients) -> Result<Self> {
        self.save(clients).await?;
        Ok(self)
    }

    /// Upsert the current state. Safe to call repeatedly.
    pub async fn save(&self, clients: &Clients) -> Result<()> {
        self.validate()?;
        clients
            .tables
            .upsert(&clients.names.enrichment_table, self.to_record()?)
            .await?;
        tracing::debug!(row_key = %self.row_key, "enrichment saved");
        Ok(())
    }

    /// Remove the structured record, independently of the owning entry.
    /// The embedding blob follows the bundle's delete policy.
    pub async fn delete(&self, clients: &Clients) -> Result<()> {
        clients
            .tables
            .delete(
                &clients.names.enrichment_table,
                &self.partition_key,
                &self.row_key,
            )
            .await?;
        if clients.delete_policy == DeletePolicy::PurgeBlobs {
            if let Some(key) = self.embedding_key() {
                let path = self.embedding_path(key);
                clients
                    .blobs
                    .delete(&clients.names.entries_container, &path)
                    .await?;
            }
        }
        Ok(())
    }
}
