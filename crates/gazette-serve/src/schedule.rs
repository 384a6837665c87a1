//! Daily schedule loop.
//!
//! Runs the full chain once a day at 06:00 UTC, mirroring an external
//! timer trigger. Outcomes are only logged; no one is watching
//! synchronously.

use chrono::{Duration as ChronoDuration, NaiveTime, Utc};

use crate::chain;
use crate::state::AppState;

/// Hour of day (UTC) at which the scheduled run fires.
const SCHEDULE_HOUR: u32 = 6;

/// Run the chain daily at 06:00 UTC until the process exits.
pub async fn run_daily(state: AppState) {
    loop {
        let wait = duration_until_next_run();
        tracing::info!(seconds = wait.as_secs(), "next scheduled run");
        tokio::time::sleep(wait).await;

        tracing::info!("scheduled chain run starting");
        match chain::run_chain(&state).await {
            Ok(outcome) => tracing::info!(
                checked = outcome.checked,
                ingested = outcome.ingested,
                enriched = outcome.enriched,
                "scheduled chain run complete"
            ),
            Err(e) => tracing::error!(error = %e, "scheduled chain run failed"),
        }
    }
}

/// Time until the next 06:00 UTC.
fn duration_until_next_run() -> std::time::Duration {
    let now = Utc::now();
    let today_run = now
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(SCHEDULE_HOUR, 0, 0).unwrap_or_default())
        .and_utc();
    let next = if today_run > now {
        today_run
    } else {
        today_run + ChronoDuration::days(1)
    };
    (next - now).to_std().unwrap_or(std::time::Duration::ZERO)
}
