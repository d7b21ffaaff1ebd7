//! Collector handle for putting values into one series.

use std::sync::Arc;

use storewatch_types::{Aggregation, SeriesKey};

use crate::state::SeriesState;

/// A handle for one (metric name, tag set) series.
///
/// Obtain a collector once with [`crate::Sink::collector`] and keep it for
/// as long as the series is produced; clones share the same state.
///
/// # Example
///
/// ```rust
/// use storewatch_sdk::{Aggregation, Sink, Tags};
///
/// let sink = Sink::new();
/// let mut tags = Tags::new();
/// tags.insert("server".into(), "cache1:6379".into());
///
/// let qps = sink.collector("redis_qps", tags, Aggregation::Sum, 10);
/// qps.put_with_time(37.0, 1_700_000_000);
///
/// let batch = sink.collect();
/// assert_eq!(batch.named("redis_qps").count(), 1);
/// ```
#[derive(Clone)]
pub struct Collector {
    pub(crate) state: Arc<SeriesState>,
}

impl Collector {
    /// Put a value stamped with an explicit Unix-seconds timestamp.
    pub fn put_with_time(&self, value: f64, timestamp: u64) {
        self.state.put(value, timestamp);
    }

    /// The series identity.
    pub fn key(&self) -> &SeriesKey {
        &self.state.key
    }

    /// The metric name.
    pub fn name(&self) -> &str {
        &self.state.key.name
    }

    /// The aggregation applied within a bucket.
    pub fn aggregation(&self) -> Aggregation {
        self.state.aggregation
    }

    /// The bucket width in seconds.
    pub fn interval_secs(&self) -> u64 {
        self.state.interval_secs
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("key", &self.state.key)
            .field("aggregation", &self.state.aggregation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Registry;
    use storewatch_types::Tags;

    fn create_collector() -> Collector {
        let registry = Registry::default();
        let state = registry.get_or_create(
            SeriesKey::new("mysql_select_qps", Tags::new()),
            Aggregation::Sum,
            10,
        );
        Collector { state }
    }

    #[test]
    fn test_put_with_time() {
        let collector = create_collector();
        collector.put_with_time(50.0, 1_700_000_000);
        collector.put_with_time(25.0, 1_700_000_010);

        let points = collector.state.drain();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 50.0);
        assert_eq!(points[1].value, 25.0);
    }

    #[test]
    fn clones_share_state() {
        let c1 = create_collector();
        let c2 = c1.clone();
        c1.put_with_time(1.0, 1_700_000_000);
        c2.put_with_time(2.0, 1_700_000_000);

        assert_eq!(c1.state.drain()[0].value, 3.0);
    }

    #[test]
    fn accessors_reflect_registration() {
        let collector = create_collector();
        assert_eq!(collector.name(), "mysql_select_qps");
        assert_eq!(collector.aggregation(), Aggregation::Sum);
        assert_eq!(collector.interval_secs(), 10);
        assert!(collector.key().tags.is_empty());
    }
}
