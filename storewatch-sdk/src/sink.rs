//! The main Sink type for registering series and flushing batches.

use std::sync::Arc;
use std::time::Duration;

use storewatch_types::{Aggregation, MetricBatch, SeriesKey, Tags};

use crate::collector::Collector;
use crate::output::Output;
use crate::state::Registry;

/// The entry point for producing metrics.
///
/// A Sink hands out one [`Collector`] per (metric name, tag set) and
/// periodically drains every series into a [`MetricBatch`] that is written to
/// all configured outputs. Cloning a Sink is cheap and every clone shares
/// the same series registry.
///
/// # Example
///
/// ```rust,no_run
/// use storewatch_sdk::{Aggregation, Output, Sink, Tags};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let sink = Sink::builder()
///         .output(Output::file("metrics.jsonl"))
///         .flush_interval(Duration::from_secs(10))
///         .build();
///
///     let conn = sink.collector("mysql_current_conn", Tags::new(), Aggregation::Sum, 10);
///
///     // Start background flushing
///     let handle = sink.start();
///
///     conn.put_with_time(12.0, 1_700_000_000);
///
///     tokio::time::sleep(Duration::from_secs(15)).await;
///     handle.stop().await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Sink {
    registry: Arc<Registry>,
    outputs: Arc<Vec<Output>>,
    flush_interval: Duration,
}

impl Sink {
    /// Create a sink with no outputs and a 10 second flush interval.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            outputs: Arc::new(Vec::new()),
            flush_interval: Duration::from_secs(10),
        }
    }

    /// Create a builder for configuring the sink.
    pub fn builder() -> SinkBuilder {
        SinkBuilder::new()
    }

    /// Get the collector for a series, registering it on first use.
    ///
    /// Asking again for the same name and tags returns a handle to the
    /// existing series; its original aggregation and interval are kept.
    pub fn collector(
        &self,
        name: &str,
        tags: Tags,
        aggregation: Aggregation,
        interval_secs: u64,
    ) -> Collector {
        let key = SeriesKey::new(name, tags);
        Collector {
            state: self.registry.get_or_create(key, aggregation, interval_secs),
        }
    }

    /// Number of registered series.
    pub fn series_count(&self) -> usize {
        self.registry.series.read().len()
    }

    /// Drain every pending bucket into a batch without emitting it.
    pub fn collect(&self) -> MetricBatch {
        self.registry.collect()
    }

    /// The configured flush interval.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Start background flushing.
    ///
    /// Spawns a tokio task that drains the registry every flush interval and
    /// writes non-empty batches to all outputs. Returns a handle used to stop
    /// it; stopping performs one last flush.
    #[cfg(feature = "tokio")]
    pub fn start(&self) -> FlushHandle {
        use tokio::sync::watch;

        let (stop_tx, stop_rx) = watch::channel(false);
        let sink = self.clone();

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(sink.flush_interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        sink.flush_now().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            sink.flush_now().await;
        });

        FlushHandle { stop_tx, task }
    }

    /// Drain and emit a batch to all outputs immediately.
    ///
    /// Output failures are logged and otherwise ignored; the points of a
    /// failed write are not retried.
    #[cfg(feature = "tokio")]
    pub async fn flush_now(&self) {
        let batch = self.registry.collect();
        if batch.is_empty() {
            return;
        }
        for output in self.outputs.iter() {
            if let Err(e) = output.emit(&batch).await {
                tracing::warn!(output = %output.label(), error = %e, points = batch.len(), "Failed to emit metric batch");
            }
        }
        tracing::debug!(points = batch.len(), "Flushed metric batch");
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a Sink.
#[derive(Debug, Default)]
pub struct SinkBuilder {
    outputs: Vec<Output>,
    flush_interval: Option<Duration>,
}

impl SinkBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; batches will be emitted to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the flush interval.
    ///
    /// Defaults to 10 seconds if not specified.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Build the sink.
    pub fn build(self) -> Sink {
        Sink {
            registry: Arc::new(Registry::default()),
            outputs: Arc::new(self.outputs),
            flush_interval: self.flush_interval.unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// Handle for controlling background flushing.
#[cfg(feature = "tokio")]
pub struct FlushHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "tokio")]
impl FlushHandle {
    /// Stop background flushing and wait for the final flush.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}
