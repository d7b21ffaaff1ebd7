//! # storewatch-adapters
//!
//! Snapshot fetchers for collecting runtime statistics from storage backends.
//!
//! Every fetcher opens its connection once through a `connect` constructor
//! and then answers repeated [`SnapshotFetcher::fetch`] calls with a fresh
//! [`Snapshot`] of raw server-reported values.
//!
//! ## Supported Systems
//!
//! - **MySQL** (`mysql` feature) - Global status counters and the
//!   connection-limit variables, via `SHOW GLOBAL STATUS` / `SHOW GLOBAL VARIABLES`
//! - **Redis** (`redis` feature) - The `Stats`, `Memory`, `Clients` and
//!   `Keyspace` sections of `INFO`
//!
//! ## Quick Start (Redis)
//!
//! ```rust,no_run
//! # #[cfg(feature = "redis")]
//! # async fn run() -> Result<(), storewatch_adapters::AdapterError> {
//! use storewatch_adapters::redis::{RedisFetcher, RedisOptions};
//! use storewatch_adapters::SnapshotFetcher;
//!
//! let options = RedisOptions::new("127.0.0.1:6379").password("secret");
//! let mut fetcher = RedisFetcher::connect(&options).await?;
//!
//! let snapshot = fetcher.fetch().await?;
//! println!("used_memory = {:?}", snapshot.get("Memory", "used_memory"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod info;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;

pub use error::AdapterError;

// Re-export types for convenience
pub use storewatch_types::{Section, Snapshot};

/// A connected backend that can be sampled repeatedly.
///
/// Implementations issue read-only queries only. A failed fetch must not
/// return a partially filled snapshot: it either yields everything that was
/// asked for or an error.
#[async_trait]
pub trait SnapshotFetcher: Send {
    /// Human-readable identity of the backend, used in logs.
    fn description(&self) -> &str;

    /// Capture one snapshot.
    async fn fetch(&mut self) -> Result<Snapshot, AdapterError>;

    /// Capture one snapshot, logging and swallowing any failure.
    ///
    /// Returns `None` when the fetch failed; the caller treats that as
    /// "no data this cycle".
    async fn poll(&mut self) -> Option<Snapshot> {
        match self.fetch().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(source = self.description(), error = %e, "Snapshot fetch failed");
                None
            }
        }
    }
}
