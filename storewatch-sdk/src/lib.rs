//! # storewatch-sdk
//!
//! Metric sink used by the storewatch agent.
//!
//! Producers ask the [`Sink`] for a [`Collector`] per (metric name, tag set)
//! once, then put timestamped values into it every cycle. Values are folded
//! into interval buckets according to the series' [`Aggregation`] and the
//! sink flushes the buckets to its outputs in the background.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storewatch_sdk::{Aggregation, Output, Sink, Tags};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = Sink::builder()
//!         .output(Output::file("metrics.jsonl"))
//!         .flush_interval(Duration::from_secs(10))
//!         .build();
//!
//!     let mut tags = Tags::new();
//!     tags.insert("instance".into(), "db1:3306".into());
//!     let selects = sink.collector("mysql_select_qps", tags, Aggregation::Sum, 10);
//!
//!     let handle = sink.start();
//!     selects.put_with_time(50.0, 1_700_000_000);
//!
//!     // ... the agent runs ...
//!     handle.stop().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **One handle per series**: Registration is idempotent and handles are cheap to clone
//! - **Explicit timestamps**: Every value carries the time its cycle started
//! - **Multiple outputs**: File, TCP, stdout, or custom channel
//! - **Thread-safe**: Use from any thread or async task

mod collector;
mod output;
mod sink;
mod state;

pub use collector::Collector;
pub use output::Output;
pub use sink::{Sink, SinkBuilder};

#[cfg(feature = "tokio")]
pub use sink::FlushHandle;

// Re-export types for convenience
pub use storewatch_types::{Aggregation, MetricBatch, MetricPoint, SeriesKey, Tags};
