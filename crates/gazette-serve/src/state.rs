//! Application state and configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use url::Url;

use gazette_core::{Clients, Entry, HttpFetcher};
use gazette_ingest::{
    epoch, EnrichmentService, FeedChangeDetector, IngestionPipeline, Poller,
};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// Metrics HTTP server port (0 to disable).
    pub metrics_port: u16,

    /// Whether the daily schedule loop runs.
    pub schedule_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `GAZETTE_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `GAZETTE_METRICS_PORT`: Metrics port (default: 9090, 0 disables)
    /// - `GAZETTE_SCHEDULE`: "off" disables the daily trigger
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("GAZETTE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let metrics_port = match std::env::var("GAZETTE_METRICS_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("GAZETTE_METRICS_PORT must be a port number"))?,
            Err(_) => 9090,
        };

        let schedule_enabled = !std::env::var("GAZETTE_SCHEDULE")
            .map(|v| v.eq_ignore_ascii_case("off"))
            .unwrap_or(false);

        tracing::info!(
            bind_addr = %bind_addr,
            metrics_port,
            schedule_enabled,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            metrics_port,
            schedule_enabled,
        })
    }
}

/// Shared application state available to all request handlers and the
/// schedule loop.
#[derive(Clone)]
pub struct AppState {
    /// Injected service clients.
    pub clients: Clients,

    /// Shared HTTP fetcher for feed checks and content fallback.
    pub http: Arc<dyn HttpFetcher>,

    /// Configured feed URLs, loaded once at startup.
    pub feeds: Arc<Vec<Url>>,

    /// Shared "last ingestion" checkpoint. Advances only after a completed
    /// polling sweep.
    pub last_ingestion: Arc<RwLock<DateTime<Utc>>>,

    /// Entries ingested but not yet enriched: the in-process handoff
    /// between the collect and summarize phases.
    pub pending: Arc<Mutex<Vec<Entry>>>,
}

impl AppState {
    /// Create application state over the given clients and feed list.
    pub fn new(clients: Clients, http: Arc<dyn HttpFetcher>, feeds: Vec<Url>) -> Self {
        Self {
            clients,
            http,
            feeds: Arc::new(feeds),
            last_ingestion: Arc::new(RwLock::new(epoch())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build the polling orchestrator.
    pub fn poller(&self) -> Poller {
        Poller::new(
            self.clients.clone(),
            FeedChangeDetector::new(self.http.clone()),
        )
    }

    /// Build the ingestion pipeline.
    pub fn pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(self.clients.clone(), self.http.clone())
    }

    /// Build the enrichment service.
    pub fn enricher(&self) -> EnrichmentService {
        EnrichmentService::new(self.clients.clone(), self.http.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazette_core::memory::{memory_clients, ScriptedFetcher};

    #[test]
    fn checkpoint_starts_at_epoch() {
        let (clients, _, _, _) = memory_clients();
        let state = AppState::new(clients, Arc::new(ScriptedFetcher::new()), Vec::new());
        assert_eq!(state.last_ingestion.read().timestamp(), 0);
    }
}
