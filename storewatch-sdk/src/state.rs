//! Internal state management for series and their interval buckets.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use storewatch_types::{Aggregation, MetricBatch, MetricPoint, SeriesKey};

/// Running fold of every value put into one bucket.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    value: f64,
    sum: f64,
    samples: u64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            value,
            sum: value,
            samples: 1,
        }
    }

    fn fold(&mut self, aggregation: Aggregation, value: f64) {
        self.samples += 1;
        self.sum += value;
        self.value = match aggregation {
            Aggregation::Sum => self.sum,
            Aggregation::Max => self.value.max(value),
            Aggregation::Min => self.value.min(value),
            Aggregation::Avg => self.sum / self.samples as f64,
            Aggregation::Last => value,
        };
    }
}

/// Thread-safe state for a single series.
#[derive(Debug)]
pub struct SeriesState {
    pub key: SeriesKey,
    pub aggregation: Aggregation,
    pub interval_secs: u64,
    buckets: Mutex<BTreeMap<u64, Accumulator>>,
}

impl SeriesState {
    fn new(key: SeriesKey, aggregation: Aggregation, interval_secs: u64) -> Self {
        Self {
            key,
            aggregation,
            // A zero-width bucket would divide by zero below.
            interval_secs: interval_secs.max(1),
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Fold a value into the bucket that contains `timestamp` (Unix seconds).
    pub fn put(&self, value: f64, timestamp: u64) {
        let bucket = timestamp - timestamp % self.interval_secs;
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(&bucket) {
            Some(acc) => acc.fold(self.aggregation, value),
            None => {
                buckets.insert(bucket, Accumulator::new(value));
            }
        }
    }

    /// Take every bucket as a point, oldest first.
    pub fn drain(&self) -> Vec<MetricPoint> {
        let buckets = std::mem::take(&mut *self.buckets.lock());
        buckets
            .into_iter()
            .map(|(timestamp, acc)| MetricPoint {
                name: self.key.name.clone(),
                tags: self.key.tags.clone(),
                aggregation: self.aggregation,
                interval_secs: self.interval_secs,
                timestamp,
                value: acc.value,
                samples: acc.samples,
            })
            .collect()
    }
}

/// Every series registered with a sink.
#[derive(Debug, Default)]
pub struct Registry {
    pub series: RwLock<BTreeMap<SeriesKey, Arc<SeriesState>>>,
}

impl Registry {
    /// Register a series or get the existing one.
    ///
    /// The first registration fixes the aggregation and interval; later
    /// calls for the same key share that state.
    pub fn get_or_create(
        &self,
        key: SeriesKey,
        aggregation: Aggregation,
        interval_secs: u64,
    ) -> Arc<SeriesState> {
        // Fast path
        {
            let series = self.series.read();
            if let Some(state) = series.get(&key) {
                return state.clone();
            }
        }

        // Slow path
        let mut series = self.series.write();
        series
            .entry(key.clone())
            .or_insert_with(|| Arc::new(SeriesState::new(key, aggregation, interval_secs)))
            .clone()
    }

    /// Drain every series into one batch.
    pub fn collect(&self) -> MetricBatch {
        let series = self.series.read();
        let points = series.values().flat_map(|s| s.drain()).collect();
        MetricBatch::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storewatch_types::Tags;

    fn key(name: &str) -> SeriesKey {
        let mut tags = Tags::new();
        tags.insert("server".into(), "cache1:6379".into());
        SeriesKey::new(name, tags)
    }

    fn series(aggregation: Aggregation) -> SeriesState {
        SeriesState::new(key("redis_qps"), aggregation, 10)
    }

    #[test]
    fn values_in_same_bucket_are_aggregated() {
        let sum = series(Aggregation::Sum);
        sum.put(1.0, 1_700_000_001);
        sum.put(2.5, 1_700_000_009);

        let points = sum.drain();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, 1_700_000_000);
        assert_eq!(points[0].value, 3.5);
        assert_eq!(points[0].samples, 2);
    }

    #[test]
    fn each_aggregation_folds_as_named() {
        let cases = [
            (Aggregation::Sum, 9.0),
            (Aggregation::Max, 5.0),
            (Aggregation::Min, 1.0),
            (Aggregation::Avg, 3.0),
            (Aggregation::Last, 3.0),
        ];
        for (aggregation, expected) in cases {
            let state = series(aggregation);
            for v in [1.0, 5.0, 3.0] {
                state.put(v, 1_700_000_000);
            }
            assert_eq!(state.drain()[0].value, expected, "{aggregation:?}");
        }
    }

    #[test]
    fn separate_buckets_drain_oldest_first() {
        let state = series(Aggregation::Sum);
        state.put(2.0, 1_700_000_020);
        state.put(1.0, 1_700_000_010);

        let points = state.drain();
        let stamps: Vec<u64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1_700_000_010, 1_700_000_020]);
        assert!(state.drain().is_empty());
    }

    #[test]
    fn negative_values_are_kept() {
        let state = series(Aggregation::Sum);
        state.put(-40.0, 1_700_000_000);
        assert_eq!(state.drain()[0].value, -40.0);
    }

    #[test]
    fn zero_interval_is_treated_as_one_second() {
        let state = SeriesState::new(key("redis_qps"), Aggregation::Sum, 0);
        state.put(1.0, 1_700_000_003);
        assert_eq!(state.interval_secs, 1);
        assert_eq!(state.drain()[0].timestamp, 1_700_000_003);
    }

    #[test]
    fn get_or_create_returns_same_arc_on_second_call() {
        let registry = Registry::default();

        let s1 = registry.get_or_create(key("redis_keys"), Aggregation::Sum, 10);
        let s2 = registry.get_or_create(key("redis_keys"), Aggregation::Max, 30);

        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(s2.aggregation, Aggregation::Sum);
        assert_eq!(s2.interval_secs, 10);
    }

    #[test]
    fn collect_drains_all_series() {
        let registry = Registry::default();
        registry
            .get_or_create(key("redis_keys"), Aggregation::Sum, 10)
            .put(15.0, 1_700_000_000);
        registry
            .get_or_create(key("redis_conn"), Aggregation::Sum, 10)
            .put(3.0, 1_700_000_000);

        let batch = registry.collect();
        assert_eq!(batch.len(), 2);
        assert!(registry.collect().is_empty());
    }

    #[test]
    fn concurrent_puts_are_thread_safe() {
        use std::thread;

        let state = Arc::new(series(Aggregation::Sum));
        let mut handles = vec![];
        for _ in 0..8 {
            let s = state.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.put(1.0, 1_700_000_000);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let points = state.drain();
        assert_eq!(points[0].value, 800.0);
        assert_eq!(points[0].samples, 800);
    }
}
