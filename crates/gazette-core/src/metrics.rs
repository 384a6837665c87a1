//! Prometheus metrics helpers.
//!
//! Centralized recorder setup and the metric names used across Gazette
//! components. Naming follows `component_subject_unit`: `poll_` for the
//! change detector sweep, `ingest_` for the feed/entry pipeline, `enrich_`
//! for the AI enrichment stage.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
///
/// # Panics
///
/// Panics if a recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    register_common_metrics();
    handle
}

/// Like [`init_metrics`] but returns `None` if a recorder is already
/// installed. Useful in tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Serve the `/metrics` endpoint on the given port in a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    Ok(())
}

/// Register descriptions for the metrics recorded across Gazette.
fn register_common_metrics() {
    describe_counter!("poll_feeds_checked_total", "Feed URLs checked for updates");
    describe_counter!(
        "poll_feeds_updated_total",
        "Feed URLs detected as changed and enqueued"
    );
    describe_counter!(
        "poll_check_failures_total",
        "Feed update checks that failed after retry"
    );

    describe_counter!("ingest_feeds_total", "Feeds fully parsed and persisted");
    describe_counter!("ingest_entries_total", "Entries persisted");
    describe_counter!(
        "ingest_entries_skipped_total",
        "Entries skipped because content resolution failed"
    );

    describe_counter!("enrich_entries_total", "Entries enriched");
    describe_counter!(
        "enrich_failures_total",
        "Entries whose enrichment failed and was skipped"
    );
    describe_gauge!(
        "pipeline_last_sweep_timestamp_seconds",
        "Unix timestamp of the last completed polling sweep"
    );
}
