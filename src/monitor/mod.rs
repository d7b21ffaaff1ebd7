//! Per-source monitor loops.
//!
//! A [`SourceMonitor`] owns one connected fetcher and one [`MetricPlan`]. Each
//! cycle it polls the fetcher, hands the previous and current snapshot to the
//! plan, keeps the current snapshot for the next cycle and sleeps until the
//! next interval boundary.

pub mod mysql;
pub mod redis;

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use storewatch_adapters::{AdapterError, Snapshot, SnapshotFetcher};
use storewatch_sdk::Collector;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::derive::DeriveError;
use crate::scheduler::wait_for_next_cycle;

/// Lifecycle of a source loop.
///
/// A monitor only exists once its source is connected. A source whose
/// connection fails never gets one and ends with [`MonitorExit::ConnectFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Connected, but no snapshot captured yet.
    AwaitingFirstSnapshot,
    /// A previous snapshot exists; every successful fetch emits metrics.
    SteadyState,
    /// The loop has ended.
    Terminated,
}

/// Why a source loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// The initial connection failed; the source is not retried.
    ConnectFailed(String),
    /// The supervisor asked the loop to stop.
    Shutdown,
}

/// The metrics one backend family derives from a pair of snapshots.
pub trait MetricPlan: Send {
    /// Derive and record every metric of one cycle at `timestamp`.
    fn emit(&self, previous: &Snapshot, current: &Snapshot, timestamp: u64);
}

/// Record a derived value, or log why it was skipped.
pub(crate) fn record(collector: &Collector, derived: Result<f64, DeriveError>, timestamp: u64) {
    match derived {
        Ok(value) => collector.put_with_time(value, timestamp),
        Err(e) if e.is_missing() => {
            tracing::trace!(metric = collector.name(), error = %e, "Metric input absent, skipping");
        }
        Err(e) => {
            tracing::warn!(metric = collector.name(), error = %e, "Metric input unparseable, skipping");
        }
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Resolves once shutdown was requested or the supervisor went away.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// The polling loop of one source.
pub struct SourceMonitor<F, P> {
    fetcher: F,
    plan: P,
    interval: Duration,
    previous: Option<Snapshot>,
    state: MonitorState,
}

impl<F: SnapshotFetcher, P: MetricPlan> SourceMonitor<F, P> {
    /// Wrap a connected fetcher and a registered plan.
    pub fn new(fetcher: F, plan: P, interval: Duration) -> Self {
        Self {
            fetcher,
            plan,
            interval,
            previous: None,
            state: MonitorState::AwaitingFirstSnapshot,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Apply one cycle's fetch result.
    ///
    /// A failed fetch (`None`) emits nothing and keeps the previous snapshot.
    /// The first successful fetch only becomes the baseline. Returns `true`
    /// when the plan ran.
    pub fn observe(&mut self, current: Option<Snapshot>, timestamp: u64) -> bool {
        let Some(current) = current else {
            return false;
        };

        let emitted = match &self.previous {
            Some(previous) => {
                self.plan.emit(previous, &current, timestamp);
                true
            }
            None => {
                tracing::debug!(source = self.fetcher.description(), "Baseline snapshot captured");
                self.state = MonitorState::SteadyState;
                false
            }
        };
        self.previous = Some(current);
        emitted
    }

    /// Run cycles until shutdown is signalled.
    ///
    /// Leaves the monitor in [`MonitorState::Terminated`].
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> MonitorExit {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle_start = Instant::now();
            let timestamp = unix_now();

            let current = tokio::select! {
                current = self.fetcher.poll() => current,
                _ = stopped(&mut shutdown) => break,
            };
            self.observe(current, timestamp);

            tokio::select! {
                _ = wait_for_next_cycle(self.interval, cycle_start) => {}
                _ = stopped(&mut shutdown) => break,
            }
        }

        self.state = MonitorState::Terminated;
        tracing::debug!(source = self.fetcher.description(), "Source monitor stopped");
        MonitorExit::Shutdown
    }
}

/// Connect, register the plan, then poll until shutdown.
///
/// A failed connection ends the source for good. Plan registration runs only
/// after the connection succeeded.
pub async fn run_source<F, P, C, R>(
    source: &str,
    connect: C,
    register: R,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> MonitorExit
where
    F: SnapshotFetcher,
    P: MetricPlan,
    C: Future<Output = Result<F, AdapterError>>,
    R: FnOnce() -> P,
{
    tracing::debug!(source, "Connecting");
    let fetcher = tokio::select! {
        connected = connect => match connected {
            Ok(fetcher) => fetcher,
            Err(e) => {
                tracing::error!(source, error = %e, "Failed to connect, source disabled");
                return MonitorExit::ConnectFailed(e.to_string());
            }
        },
        _ = stopped(&mut shutdown) => return MonitorExit::Shutdown,
    };

    tracing::info!(source, interval_secs = interval.as_secs(), "Monitoring source");
    let mut monitor = SourceMonitor::new(fetcher, register(), interval);
    monitor.run(shutdown).await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use storewatch_adapters::{AdapterError, Snapshot, SnapshotFetcher};

    /// Fetcher answering from a fixed script, then failing forever.
    pub struct ScriptedFetcher {
        pub replies: VecDeque<Result<Snapshot, AdapterError>>,
    }

    impl ScriptedFetcher {
        pub fn new(replies: impl IntoIterator<Item = Result<Snapshot, AdapterError>>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        fn description(&self) -> &str {
            "scripted"
        }

        async fn fetch(&mut self) -> Result<Snapshot, AdapterError> {
            self.replies.pop_front().unwrap_or(Err(AdapterError::Timeout))
        }
    }
}
