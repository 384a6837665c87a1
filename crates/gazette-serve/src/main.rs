//! Gazette server binary.
//!
//! Starts the HTTP trigger surface and the daily schedule loop over an
//! injected client bundle. The table store, blob store, queue, and
//! language model are external services; this binary wires the in-memory
//! backends for local development — production deployments substitute
//! vendor SDK adapters behind the same traits.
//!
//! # Usage
//!
//! ```bash
//! # Local development: seed the feeds config from a file
//! gazette-serve --feeds-config ./feeds.json
//! ```
//!
//! The feeds config file is the same JSON document the blob store holds in
//! production: `{"feeds": ["https://example.com/feed.xml", ...]}`.

use anyhow::Context;
use axum::http::Request;
use bytes::Bytes;
use clap::Parser;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gazette_core::memory::{FixedModel, MemoryBlobStore, MemoryQueue, MemoryTableStore};
use gazette_core::{BlobStore as _, Clients, StorageNames};
use gazette_ingest::{load_feeds_config, ReqwestFetcher};
use gazette_serve::{router, AppState, Config};

/// Gazette feed pipeline server.
#[derive(Parser, Debug)]
#[command(name = "gazette-serve")]
#[command(about = "HTTP trigger surface for the Gazette feed pipeline", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Seed the feeds configuration blob from a local JSON file.
    #[arg(long)]
    feeds_config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if config.metrics_port > 0 {
        let handle = gazette_core::metrics::init_metrics();
        gazette_core::metrics::start_metrics_server(config.metrics_port, handle).await?;
    }

    // Local development wiring; production swaps vendor adapters in.
    let clients = Clients::new(
        Arc::new(MemoryTableStore::new()),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(MemoryQueue::new()),
        Arc::new(FixedModel::default()),
    )
    .with_names(StorageNames::from_env());

    if let Some(path) = &args.feeds_config {
        let body = std::fs::read(path)
            .with_context(|| format!("failed to read feeds config {}", path.display()))?;
        clients
            .blobs
            .put(
                &clients.names.config_container,
                &clients.names.config_blob,
                Bytes::from(body),
            )
            .await?;
        tracing::info!(path = %path.display(), "feeds configuration seeded");
    }

    let feeds = load_feeds_config(&clients)
        .await
        .context("feeds configuration is required at startup")?
        .feeds;

    let http = Arc::new(ReqwestFetcher::new()?);
    let state = AppState::new(clients, http, feeds);

    if config.schedule_enabled {
        tokio::spawn(gazette_serve::schedule::run_daily(state.clone()));
    }

    let app = router(state).layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path()
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "starting server");
    axum::serve(listener, app).await?;

    Ok(())
}
