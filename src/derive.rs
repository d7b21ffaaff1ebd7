//! Derivation of point-in-time metric values from raw snapshot text.
//!
//! Every function here is pure: it reads raw fields out of one or two
//! snapshots and returns the value to emit, or a [`DeriveError`] saying why
//! the metric has to be skipped this cycle.

use storewatch_types::{Section, Snapshot};
use thiserror::Error;

/// Why a metric could not be derived for a cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    /// A required field is absent from a section.
    #[error("field `{0}` is missing")]
    Missing(String),

    /// A required section is absent from the snapshot.
    #[error("section `{0}` is missing")]
    MissingSection(String),

    /// A field is present but its text is not a usable number.
    #[error("field `{field}` has invalid value `{value}`")]
    Invalid { field: String, value: String },
}

impl DeriveError {
    /// Missing data is expected on some server versions; invalid data is not.
    pub fn is_missing(&self) -> bool {
        matches!(self, DeriveError::Missing(_) | DeriveError::MissingSection(_))
    }
}

/// Look up a section, failing with [`DeriveError::MissingSection`].
pub fn section<'a>(snapshot: &'a Snapshot, name: &str) -> Result<&'a Section, DeriveError> {
    snapshot
        .section(name)
        .ok_or_else(|| DeriveError::MissingSection(name.to_string()))
}

fn raw<'a>(section: &'a Section, field: &str) -> Result<&'a str, DeriveError> {
    section
        .get(field)
        .map(|v| v.trim())
        .ok_or_else(|| DeriveError::Missing(field.to_string()))
}

fn invalid(field: &str, value: &str) -> DeriveError {
    DeriveError::Invalid {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_f64(field: &str, value: &str) -> Result<f64, DeriveError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, value))
}

fn parse_i64(field: &str, value: &str) -> Result<i64, DeriveError> {
    value.parse::<i64>().map_err(|_| invalid(field, value))
}

/// Change of a monotonically increasing counter between two snapshots.
///
/// A counter reset (server restart) yields a negative delta, which is
/// returned unchanged.
pub fn counter_delta(previous: &Section, current: &Section, field: &str) -> Result<f64, DeriveError> {
    let prev = parse_i64(field, raw(previous, field)?)?;
    let cur = parse_i64(field, raw(current, field)?)?;
    Ok((i128::from(cur) - i128::from(prev)) as f64)
}

/// Current value of a field, as reported.
pub fn gauge(current: &Section, field: &str) -> Result<f64, DeriveError> {
    parse_f64(field, raw(current, field)?)
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

/// Percentage of two fields of the same section.
pub fn ratio(current: &Section, numerator: &str, denominator: &str) -> Result<f64, DeriveError> {
    let num = gauge(current, numerator)?;
    let den = gauge(current, denominator)?;
    Ok(percentage(num, den))
}

/// `hits / (hits + misses) * 100`, or 0 before the first lookup.
pub fn hit_rate(current: &Section, hits: &str, misses: &str) -> Result<f64, DeriveError> {
    let hits = gauge(current, hits)?;
    let misses = gauge(current, misses)?;
    Ok(percentage(hits, hits + misses))
}

/// Sum one sub-field across every entry of a section.
///
/// Entries are records such as `keys=10,expires=2,avg_ttl=0`. Entries where
/// the sub-field is absent or unparseable are skipped; a section with no
/// usable entry (including an empty one) sums to 0.
pub fn section_sum(current: &Snapshot, section_name: &str, entry_field: &str) -> Result<f64, DeriveError> {
    let entries = section(current, section_name)?;
    let total = entries
        .values()
        .filter_map(|record| sub_field(record, entry_field))
        .filter_map(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .sum();
    Ok(total)
}

fn sub_field<'a>(record: &'a str, name: &str) -> Option<&'a str> {
    record
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
