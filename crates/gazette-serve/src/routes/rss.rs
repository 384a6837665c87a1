//! RSS pipeline trigger endpoints.
//!
//! Each trigger runs its phase to completion and answers with a generic
//! success message; fatal configuration errors propagate as failure
//! responses. No request body is expected.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::chain;
use crate::error::ApiError;
use crate::state::AppState;

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome summary.
    pub message: String,
}

/// `POST /api/v1/rss/run` - full poll → ingest → enrich chain.
pub async fn run(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("chain run triggered over HTTP");
    let outcome = chain::run_chain(&state).await?;
    Ok(Json(MessageResponse {
        message: format!(
            "RSS feeds processed successfully: {} checked, {} ingested, {} entries, {} enriched.",
            outcome.checked, outcome.ingested, outcome.entries, outcome.enriched
        ),
    }))
}

/// `POST /api/v1/rss/collect` - ingest every configured feed, skipping
/// change detection and enrichment.
pub async fn collect(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("collect phase triggered over HTTP");
    let outcome = chain::collect(&state, &state.feeds).await?;
    Ok(Json(MessageResponse {
        message: format!(
            "RSS feeds collected successfully: {} feeds, {} entries.",
            outcome.ingested, outcome.entries
        ),
    }))
}

/// `POST /api/v1/rss/summarize` - enrich staged entries without fetching
/// new ones.
pub async fn summarize(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("summarize phase triggered over HTTP");
    let report = chain::summarize(&state).await;
    Ok(Json(MessageResponse {
        message: format!(
            "RSS articles summarized successfully: {} enriched, {} skipped.",
            report.enriched, report.skipped
        ),
    }))
}
