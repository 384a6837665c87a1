//! API route definitions.

mod health;
mod rss;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Triggers
/// - `POST /api/v1/rss/run` - Full poll → ingest → enrich chain
/// - `POST /api/v1/rss/collect` - Ingest all configured feeds only
/// - `POST /api/v1/rss/summarize` - Enrich staged entries only
pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/health", get(health::health_check));

    let api_v1 = Router::new()
        .route("/rss/run", post(rss::run))
        .route("/rss/collect", post(rss::collect))
        .route("/rss/summarize", post(rss::summarize));

    Router::new()
        .merge(public)
        .nest("/api/v1", api_v1)
        .with_state(state)
}
