//! Redis metric plan.
//!
//! Redis already reports instantaneous rates, so every metric here reads the
//! current snapshot only. The previous snapshot still gates the first cycle.

use storewatch_adapters::redis::RedisFetcher;
use storewatch_adapters::Snapshot;
use storewatch_sdk::{Aggregation, Collector, Sink, Tags};
use tokio::sync::watch;

use super::{record, run_source, MetricPlan, MonitorExit};
use crate::config::RedisSourceConfig;
use crate::derive;

/// Plain gauges: (metric, section, field).
const GAUGES: [(&str, &str, &str); 5] = [
    ("redis_qps", "Stats", "instantaneous_ops_per_sec"),
    ("redis_in_flow", "Stats", "instantaneous_input_kbps"),
    ("redis_out_flow", "Stats", "instantaneous_output_kbps"),
    ("redis_mem", "Memory", "used_memory"),
    ("redis_conn", "Clients", "connected_clients"),
];

/// Handles for every metric of one Redis server.
pub struct RedisPlan {
    gauges: Vec<(Collector, &'static str, &'static str)>,
    mem_percent: Collector,
    keys: Collector,
    hit_rate: Collector,
}

impl RedisPlan {
    /// Register the plan's series, tagged `server=server_addr`.
    pub fn register(sink: &Sink, source: &RedisSourceConfig) -> Self {
        let mut tags = Tags::new();
        tags.insert("server".to_string(), source.server_addr.clone());
        let interval = source.collect_interval;
        let collector = |name: &str| sink.collector(name, tags.clone(), Aggregation::Sum, interval);

        Self {
            gauges: GAUGES
                .iter()
                .map(|&(name, section, field)| (collector(name), section, field))
                .collect(),
            mem_percent: collector("redis_mem_percent"),
            keys: collector("redis_keys"),
            hit_rate: collector("redis_hit_rate"),
        }
    }
}

impl MetricPlan for RedisPlan {
    fn emit(&self, _previous: &Snapshot, current: &Snapshot, timestamp: u64) {
        for (collector, section, field) in &self.gauges {
            let value = derive::section(current, section).and_then(|s| derive::gauge(s, field));
            record(collector, value, timestamp);
        }

        record(
            &self.mem_percent,
            derive::section(current, "Memory")
                .and_then(|s| derive::ratio(s, "used_memory", "maxmemory")),
            timestamp,
        );
        record(
            &self.hit_rate,
            derive::section(current, "Stats")
                .and_then(|s| derive::hit_rate(s, "keyspace_hits", "keyspace_misses")),
            timestamp,
        );
        record(
            &self.keys,
            derive::section_sum(current, "Keyspace", "keys"),
            timestamp,
        );
    }
}

/// Monitor one Redis server until shutdown.
pub async fn run(
    source: RedisSourceConfig,
    sink: Sink,
    shutdown: watch::Receiver<bool>,
) -> MonitorExit {
    let options = source.options();
    run_source(
        &source.server_addr,
        RedisFetcher::connect(&options),
        || RedisPlan::register(&sink, &source),
        source.interval(),
        shutdown,
    )
    .await
}
