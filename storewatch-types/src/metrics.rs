//! Metric point types emitted by the agent and shipped by the sink.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::SCHEMA_VERSION;

/// Tag set identifying a series, e.g. `{"instance": "db1:3306"}`.
pub type Tags = BTreeMap<String, String>;

/// How values that land in the same interval bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Aggregation {
    /// Add every value.
    #[default]
    Sum,
    /// Keep the largest value.
    Max,
    /// Keep the smallest value.
    Min,
    /// Arithmetic mean of all values.
    Avg,
    /// Keep the most recent value.
    Last,
}

/// Identity of one output series: a metric name plus its tag set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesKey {
    /// Metric name, e.g. `mysql_select_qps`.
    pub name: String,

    /// Tags attached to every point of the series.
    pub tags: Tags,
}

impl SeriesKey {
    /// Create a series key.
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

/// One aggregated, timestamped value of a series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricPoint {
    /// Metric name.
    pub name: String,

    /// Series tags.
    pub tags: Tags,

    /// Aggregation applied within the bucket.
    pub aggregation: Aggregation,

    /// Bucket width in seconds.
    pub interval_secs: u64,

    /// Bucket start, Unix seconds.
    pub timestamp: u64,

    /// Aggregated value.
    pub value: f64,

    /// Number of raw values folded into `value`.
    pub samples: u64,
}

/// A group of points flushed together to the sink's outputs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricBatch {
    /// Batch format version, [`SCHEMA_VERSION`] when produced by this crate.
    pub schema: u32,

    /// Unix timestamp in milliseconds when this batch was assembled.
    pub emitted_at_ms: u64,

    /// Points in series order, oldest bucket first within a series.
    pub points: Vec<MetricPoint>,
}

impl MetricBatch {
    /// Create a batch with a specific emission timestamp.
    pub fn with_timestamp(emitted_at_ms: u64, points: Vec<MetricPoint>) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            emitted_at_ms,
            points,
        }
    }

    /// Create a batch stamped with the current time.
    #[cfg(feature = "std")]
    pub fn new(points: Vec<MetricPoint>) -> Self {
        Self::with_timestamp(current_timestamp_ms(), points)
    }

    /// True when the batch was written in a format this crate reads.
    pub fn is_compatible(&self) -> bool {
        self.schema == SCHEMA_VERSION
    }

    /// Check if the batch carries no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points in the batch.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Iterate over the points of one metric name.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricPoint> + 'a {
        self.points.iter().filter(move |p| p.name == name)
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn point(name: &str, value: f64) -> MetricPoint {
        MetricPoint {
            name: name.into(),
            tags: Tags::new(),
            aggregation: Aggregation::Sum,
            interval_secs: 10,
            timestamp: 1_700_000_000,
            value,
            samples: 1,
        }
    }

    #[test]
    fn batch_filters_by_name() {
        let batch = MetricBatch::with_timestamp(
            1,
            vec![point("redis_qps", 10.0), point("redis_keys", 15.0), point("redis_qps", 12.0)],
        );

        assert_eq!(batch.len(), 3);
        let values: Vec<f64> = batch.named("redis_qps").map(|p| p.value).collect();
        assert_eq!(values, vec![10.0, 12.0]);
        assert!(batch.is_compatible());
    }

    #[test]
    fn newer_schema_is_not_compatible() {
        let mut batch = MetricBatch::with_timestamp(1, vec![point("redis_qps", 1.0)]);
        assert_eq!(batch.schema, SCHEMA_VERSION);

        batch.schema = SCHEMA_VERSION + 1;
        assert!(!batch.is_compatible());
    }

    #[test]
    fn series_keys_order_by_name_then_tags() {
        let mut tags = Tags::new();
        tags.insert("server".into(), "b:6379".into());
        let b = SeriesKey::new("redis_qps", tags);

        let mut tags = Tags::new();
        tags.insert("server".into(), "a:6379".into());
        let a = SeriesKey::new("redis_qps", tags);

        assert!(a < b);
        assert!(SeriesKey::new("mysql_max_conn", Tags::new()) < a);
    }

    #[test]
    fn default_aggregation_is_sum() {
        assert_eq!(Aggregation::default(), Aggregation::Sum);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn aggregation_serializes_lowercase() {
        let json = serde_json::to_string(&Aggregation::Avg).unwrap();
        assert_eq!(json, "\"avg\"");
    }
}
