//! Duplicate-suppressed failure recording.
//!
//! Batch operations in the pipeline fail soft: an individual feed or entry
//! failure is recorded and the sweep continues. To keep a misbehaving feed
//! from flooding the log on every poll, each distinct failure message is
//! logged at most once per process.

use std::collections::HashSet;
use std::sync::OnceLock;

use parking_lot::Mutex;

static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn seen() -> &'static Mutex<HashSet<String>> {
    SEEN.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Record a failure message, logging it at most once per distinct text.
///
/// Returns `true` if the message was newly recorded (and logged), `false`
/// if the same text had already been recorded by this process.
pub fn record_failure(message: &str) -> bool {
    let newly_seen = seen().lock().insert(message.to_string());
    if newly_seen {
        tracing::error!("{message}");
    } else {
        tracing::trace!(suppressed = true, "{message}");
    }
    newly_seen
}
