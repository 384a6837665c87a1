//! Post entity — editorial output drafted from enriched entries.
//!
//! Identity is content-derived, not assigned: the row key is the hash of
//! title + content + draft date and recomputes whenever any of them change.
//! Posts are grouped by draft month.

use chrono::{DateTime, Utc};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};

use super::check_len;
use crate::clients::{Clients, TableRecord, TableStore as _};
use crate::error::{Error, Result};
use crate::hash::content_key;

/// Editorial workflow state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStatus {
    /// Initial draft.
    Draft,
    /// Reviewed and edited.
    Edited,
    /// Approved for publication.
    Approved,
    /// Published.
    Posted,
}

/// A blog post draft.
#[derive(Debug, Clone)]
pub struct Post {
    /// Post title.
    pub title: String,
    /// When the post was drafted.
    pub draft_date: DateTime<Utc>,
    /// Keywords extracted from the content; at most 10.
    pub keywords: Vec<String>,
    /// Post body in Markdown.
    pub content: String,
    /// Current workflow state.
    pub status: DraftStatus,
}

impl Post {
    /// Create a draft post.
    pub fn new(title: impl Into<String>, content: impl Into<String>, draft_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            draft_date,
            keywords: Vec::new(),
            content: content.into(),
            status: DraftStatus::Draft,
        }
    }

    /// Partition key: the draft month as `YYYY-MM`.
    pub fn partition_key(&self) -> String {
        self.draft_date.format("%Y-%m").to_string()
    }

    /// Row key: hash of title, content, and draft date.
    ///
    /// Recomputed from current field values on every call, so editing any
    /// of the three changes the identity.
    pub fn row_key(&self) -> String {
        let repr = format!(
            "{}_{}_{}",
            self.title,
            self.content,
            self.draft_date.to_rfc3339()
        );
        content_key(repr)
    }

    /// Validate field bounds and check the content renders as Markdown.
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, 1, 100)?;
        check_len("content", &self.content, 1, 10_000)?;
        if self.keywords.len() > 10 {
            return Err(Error::InvalidField {
                field: "keywords",
                reason: format!("expected at most 10 keywords, got {}", self.keywords.len()),
            });
        }
        // Render as a basic well-formedness check; an empty rendering means
        // the content was only markup noise.
        let mut rendered = String::new();
        html::push_html(&mut rendered, Parser::new_ext(&self.content, Options::empty()));
        if rendered.trim().is_empty() {
            return Err(Error::InvalidField {
                field: "content",
                reason: "content does not render as Markdown".to_string(),
            });
        }
        Ok(())
    }

    /// Serialize to a flat table record.
    pub fn to_record(&self) -> Result<TableRecord> {
        let mut record = TableRecord::new(self.partition_key(), self.row_key());
        record.set("Title", &self.title);
        record.set("DraftDate", self.draft_date.to_rfc3339());
        if !self.keywords.is_empty() {
            record.set("Keywords", serde_json::to_string(&self.keywords)?);
        }
        record.set("Content", &self.content);
        record.set("DraftStatus", serde_json::to_string(&self.status)?);
        Ok(record)
    }

    /// Validate, upsert, and return the post.
    pub async fn create(self, clients: &Clients) -> Result<Self> {
        self.save(clients).await?;
        Ok(self)
    }

    /// Upsert the current state. Safe to call repeatedly.
    pub async fn save(&self, clients: &Clients) -> Result<()> {
        self.validate()?;
        clients
            .tables
            .upsert(&clients.names.posts_table, self.to_record()?)
            .await?;
        Ok(())
    }

    /// Remove the structured record.
    pub async fn delete(&self, clients: &Clients) -> Result<()> {
        clients
            .tables
            .delete(
                &clients.names.posts_table,
                &self.partition_key(),
                &self.row_key(),
            )
            .await
    }
}
