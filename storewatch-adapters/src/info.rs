//! Parser for the Redis `INFO` text format.
//!
//! ```text
//! # Memory
//! used_memory:500
//! maxmemory:0
//!
//! # Keyspace
//! db0:keys=10,expires=2,avg_ttl=0
//! ```
//!
//! Each `# Header` line opens a section, `field:value` lines fill it. The
//! parser is always compiled so the format can be tested without a server.

use storewatch_types::Snapshot;

use crate::AdapterError;

/// Parse raw `INFO` output into a sectioned snapshot.
///
/// Section names are kept exactly as the server prints them (`Stats`,
/// `Memory`, `Clients`, `Keyspace`). A header followed by no fields still
/// yields an empty section. Values are split at the first `:` only, so
/// values that contain colons survive intact.
///
/// Returns [`AdapterError::Parse`] for a field line that appears before any
/// header or lacks a `:` separator; a malformed reply contributes nothing.
pub fn parse_info(raw: &str) -> Result<Snapshot, AdapterError> {
    let mut snapshot = Snapshot::new();
    let mut current: Option<String> = None;

    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            let name = header.trim().to_string();
            snapshot.open_section(name.clone());
            current = Some(name);
            continue;
        }

        let Some(section) = current.as_deref() else {
            return Err(AdapterError::Parse(format!(
                "line {}: field outside of any section",
                lineno + 1
            )));
        };

        let Some((field, value)) = line.split_once(':') else {
            return Err(AdapterError::Parse(format!(
                "line {}: expected `field:value`, got {:?}",
                lineno + 1,
                line
            )));
        };

        snapshot.insert(section, field, value);
    }

    Ok(snapshot)
}
