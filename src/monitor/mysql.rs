//! MySQL metric plan.

use storewatch_adapters::mysql::{MySqlFetcher, STATUS_SECTION, VARIABLES_SECTION};
use storewatch_adapters::Snapshot;
use storewatch_sdk::{Aggregation, Collector, Sink, Tags};
use tokio::sync::watch;

use super::{record, run_source, MetricPlan, MonitorExit};
use crate::config::MySqlSourceConfig;
use crate::derive::{self, DeriveError};

/// Counter-backed rates: (metric, status field).
const RATES: [(&str, &str); 5] = [
    ("mysql_insert_qps", "Com_insert"),
    ("mysql_update_qps", "Com_update"),
    ("mysql_delete_qps", "Com_delete"),
    ("mysql_select_qps", "Com_select"),
    ("mysql_slow_qps", "Slow_queries"),
];

/// Handles for every metric of one MySQL instance.
pub struct MySqlPlan {
    rates: Vec<(Collector, &'static str)>,
    current_conn: Collector,
    max_used_conn: Collector,
    max_conn: Collector,
    conn_usage: Collector,
}

impl MySqlPlan {
    /// Register the plan's series, tagged `instance=host:port`.
    pub fn register(sink: &Sink, source: &MySqlSourceConfig) -> Self {
        let mut tags = Tags::new();
        tags.insert("instance".to_string(), source.instance());
        let interval = source.collect_interval;
        let collector = |name: &str| sink.collector(name, tags.clone(), Aggregation::Sum, interval);

        Self {
            rates: RATES
                .iter()
                .map(|&(name, field)| (collector(name), field))
                .collect(),
            current_conn: collector("mysql_current_conn"),
            max_used_conn: collector("mysql_max_used_conn"),
            max_conn: collector("mysql_max_conn"),
            conn_usage: collector("mysql_conn_usage"),
        }
    }
}

impl MetricPlan for MySqlPlan {
    fn emit(&self, previous: &Snapshot, current: &Snapshot, timestamp: u64) {
        let status = derive::section(current, STATUS_SECTION);
        let variables = derive::section(current, VARIABLES_SECTION);
        let prev_status = derive::section(previous, STATUS_SECTION);

        for (collector, field) in &self.rates {
            let delta = match (&prev_status, &status) {
                (Ok(prev), Ok(cur)) => derive::counter_delta(prev, cur, field),
                (Err(e), _) | (_, Err(e)) => Err(e.clone()),
            };
            record(collector, delta, timestamp);
        }

        let threads = status
            .clone()
            .and_then(|s| derive::gauge(s, "Threads_connected"));
        let max_connections = variables
            .clone()
            .and_then(|v| derive::gauge(v, "max_connections"));

        record(&self.current_conn, threads.clone(), timestamp);
        record(
            &self.max_used_conn,
            status.and_then(|s| derive::gauge(s, "Max_used_connections")),
            timestamp,
        );
        record(&self.max_conn, max_connections.clone(), timestamp);

        let usage: Result<f64, DeriveError> =
            threads.and_then(|t| max_connections.map(|m| derive::percentage(t, m)));
        record(&self.conn_usage, usage, timestamp);
    }
}

/// Monitor one MySQL instance until shutdown.
pub async fn run(
    source: MySqlSourceConfig,
    sink: Sink,
    shutdown: watch::Receiver<bool>,
) -> MonitorExit {
    let instance = source.instance();
    let options = source.options();
    run_source(
        &instance,
        MySqlFetcher::connect(&options),
        || MySqlPlan::register(&sink, &source),
        source.interval(),
        shutdown,
    )
    .await
}
