//! Drift-resistant interval scheduling.
//!
//! A cycle's sleep is `interval - elapsed`, so the cadence stays anchored to
//! the interval instead of drifting by however long each cycle's work took.

use std::time::Duration;

use tokio::time::Instant;

/// Time left in the current cycle, or `None` when the work already used it up.
pub fn remaining(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|d| !d.is_zero())
}

/// Sleep until `interval` has passed since `cycle_start`.
///
/// Returns immediately when the cycle overran its interval; the next cycle
/// then starts back-to-back. Returns how long it slept.
pub async fn wait_for_next_cycle(interval: Duration, cycle_start: Instant) -> Duration {
    match remaining(interval, cycle_start.elapsed()) {
        Some(sleep) => {
            tokio::time::sleep(sleep).await;
            sleep
        }
        None => {
            tracing::debug!(
                interval_ms = interval.as_millis() as u64,
                "Cycle overran its interval, starting next cycle immediately"
            );
            Duration::ZERO
        }
    }
}
