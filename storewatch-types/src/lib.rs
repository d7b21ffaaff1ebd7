//! # storewatch-types
//!
//! Core types shared by the storewatch agent, its backend adapters and its
//! metric sink.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON output
//! - **Backend agnostic**: A snapshot is a plain section → field → raw text table,
//!   so MySQL status tables and Redis INFO output fit the same container
//! - **Versioned output**: Metric batches include version info for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: serialization of snapshots and batches via serde
//!
//! ## Example
//!
//! ```rust
//! use storewatch_types::Snapshot;
//!
//! let snapshot = Snapshot::builder()
//!     .section("Memory", |s| s.field("used_memory", "500").field("maxmemory", "0"))
//!     .section("Keyspace", |s| s.field("db0", "keys=10,expires=2"))
//!     .build();
//!
//! assert_eq!(snapshot.get("Memory", "used_memory"), Some("500"));
//! assert_eq!(snapshot.len(), 2);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! metric batches to allow consumers to handle format evolution gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod metrics;
mod snapshot;

pub use metrics::*;
pub use snapshot::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the batch format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;
