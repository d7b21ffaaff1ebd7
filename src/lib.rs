//! # storewatch
//!
//! A periodic metrics agent for MySQL and Redis.
//!
//! For every configured backend the agent samples the server's own runtime
//! statistics on a fixed interval, derives rates and ratios from the raw
//! counters and hands the values to a [`Sink`] that flushes them to its
//! outputs.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          Supervisor                            │
//! │   ┌──────────────────┐  ┌──────────────────┐                   │
//! │   │ SourceMonitor    │  │ SourceMonitor    │  one per source   │
//! │   │ (mysql)          │  │ (redis)          │                   │
//! │   └───────┬──────────┘  └───────┬──────────┘                   │
//! │           │ fetch               │ fetch                        │
//! │           ▼                     ▼                              │
//! │   previous + current snapshot ──▶ derive ──▶ Collector ──▶ Sink│
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: YAML configuration with environment overrides
//! - **[`logging`]**: stdout and rotating file logging
//! - **[`scheduler`]**: drift-resistant interval sleeps
//! - **[`derive`]**: counter deltas, gauges, ratios and section sums
//! - **[`monitor`]**: the per-source loop and the metric plan of each backend
//! - **[`supervisor`]**: spawns and stops the loops
//! - **[`shutdown`]**: SIGINT and SIGTERM handling
//!
//! ## Usage
//!
//! ```bash
//! storewatch --config /etc/storewatch.yaml
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use storewatch::{AgentConfig, Supervisor};
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let config = AgentConfig::load(Path::new("storewatch.yaml")).unwrap();
//! let sink = config.sink.build();
//! let flusher = sink.start();
//!
//! let supervisor = Supervisor::start(&config, &sink);
//! // ... run until asked to stop ...
//! supervisor.shutdown().await;
//! flusher.stop().await;
//! # });
//! ```

pub mod config;
pub mod derive;
pub mod logging;
pub mod monitor;
pub mod scheduler;
pub mod shutdown;
pub mod supervisor;

// Re-export main types for convenience
pub use config::AgentConfig;
pub use derive::DeriveError;
pub use monitor::{MetricPlan, MonitorExit, MonitorState, SourceMonitor};
pub use storewatch_sdk::Sink;
pub use supervisor::Supervisor;
