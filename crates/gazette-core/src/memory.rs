//! In-memory service backends.
//!
//! Process-local implementations of the client contracts in
//! [`crate::clients`]. They back the test suite and the local development
//! mode of the server binary; production swaps in vendor SDK adapters.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use url::Url;

use crate::clients::{
    BlobStore, Clients, HttpFetcher, LanguageModel, MessageQueue, TableRecord, TableStore,
};
use crate::error::{Error, Result};

/// In-memory table store keyed by table name and (partition, row).
#[derive(Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<String, BTreeMap<(String, String), BTreeMap<String, String>>>>,
}

impl MemoryTableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record's fields (test inspection).
    pub fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Option<BTreeMap<String, String>> {
        self.tables
            .lock()
            .get(table)?
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned()
    }

    /// Number of records in a table (test inspection).
    pub fn len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, BTreeMap::len)
    }

    /// Whether a table holds no records.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn upsert(&self, table: &str, record: TableRecord) -> Result<()> {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .insert((record.partition_key, record.row_key), record.fields);
        Ok(())
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        let removed = self
            .tables
            .lock()
            .get_mut(table)
            .and_then(|t| t.remove(&(partition_key.to_string(), row_key.to_string())));
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::Storage(format!(
                "no record {partition_key}/{row_key} in table {table}"
            ))),
        }
    }
}

/// In-memory blob store keyed by (container, key).
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(String, String), Bytes>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob exists (test inspection).
    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.blobs
            .lock()
            .contains_key(&(container.to_string(), key.to_string()))
    }

    /// Number of blobs across all containers.
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a blob out-of-band (simulates retention cleanup in tests).
    pub fn evict(&self, container: &str, key: &str) {
        self.blobs
            .lock()
            .remove(&(container.to_string(), key.to_string()));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, container: &str, key: &str, data: Bytes) -> Result<()> {
        self.blobs
            .lock()
            .insert((container.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes> {
        self.blobs
            .lock()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::BlobNotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete(&self, container: &str, key: &str) -> Result<()> {
        self.blobs
            .lock()
            .remove(&(container.to_string(), key.to_string()));
        Ok(())
    }
}

/// In-memory queue retaining sent messages per queue name.
#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent to a queue, in send order (test inspection).
    pub fn messages(&self, queue: &str) -> Vec<String> {
        self.messages.lock().get(queue).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, queue: &str, payload: String) -> Result<()> {
        self.messages
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push(payload);
        Ok(())
    }
}

/// Language model returning fixed responses.
///
/// The completion text and embedding vector are set at construction; every
/// call returns them unchanged. Good enough for wiring tests and the local
/// development mode.
pub struct FixedModel {
    completion: String,
    embedding: Vec<f32>,
}

impl FixedModel {
    /// Model that answers every completion with `completion` and every
    /// embedding request with `embedding`.
    pub fn new(completion: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            completion: completion.into(),
            embedding,
        }
    }
}

impl Default for FixedModel {
    fn default() -> Self {
        Self::new(
            r#"{"sentiment": "Neutral", "score": 0.0}"#,
            vec![0.0, 0.0, 0.0, 0.0],
        )
    }
}

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
        Ok(self.completion.clone())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.embedding.clone())
    }
}

/// HTTP fetcher serving scripted responses keyed by URL.
///
/// `conditional_get` answers with the configured status (default 200 for
/// unknown URLs); `get_text`/`get_bytes` serve configured bodies and fail
/// with a fetch error for anything else.
#[derive(Default)]
pub struct ScriptedFetcher {
    statuses: Mutex<HashMap<String, u16>>,
    bodies: Mutex<HashMap<String, Bytes>>,
    conditional_calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    /// Create a fetcher with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status returned by `conditional_get` for a URL.
    pub fn set_status(&self, url: &str, status: u16) {
        self.statuses.lock().insert(url.to_string(), status);
    }

    /// Script the body served for a URL.
    pub fn set_body(&self, url: &str, body: impl Into<Bytes>) {
        self.bodies.lock().insert(url.to_string(), body.into());
    }

    /// `(url, if_modified_since)` pairs seen by `conditional_get`.
    pub fn conditional_calls(&self) -> Vec<(String, String)> {
        self.conditional_calls.lock().clone()
    }
}

#[async_trait]
impl HttpFetcher for ScriptedFetcher {
    async fn conditional_get(&self, url: &Url, if_modified_since: &str) -> Result<u16> {
        self.conditional_calls
            .lock()
            .push((url.to_string(), if_modified_since.to_string()));
        Ok(self
            .statuses
            .lock()
            .get(url.as_str())
            .copied()
            .unwrap_or(200))
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Fetch(e.to_string()))
    }

    async fn get_bytes(&self, url: &Url) -> Result<Bytes> {
        self.bodies
            .lock()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("no response scripted for {url}")))
    }
}

/// Build a [`Clients`] bundle backed entirely by in-memory services.
///
/// Returns the bundle together with the concrete backends so callers can
/// inspect stored records, blobs, and queue messages.
pub fn memory_clients() -> (
    Clients,
    Arc<MemoryTableStore>,
    Arc<MemoryBlobStore>,
    Arc<MemoryQueue>,
) {
    let tables = Arc::new(MemoryTableStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let queues = Arc::new(MemoryQueue::new());
    let clients = Clients::new(
        tables.clone(),
        blobs.clone(),
        queues.clone(),
        Arc::new(FixedModel::default()),
    );
    (clients, tables, blobs, queues)
}
