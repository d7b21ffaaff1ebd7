//! Launches and tears down the per-source monitor loops.

use std::future::Future;

use storewatch_sdk::Sink;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::AgentConfig;
use crate::monitor::{self, MonitorExit};

/// Owns one monitor task per configured source.
///
/// Loops run independently; one failing to connect neither stops the others
/// nor the process.
pub struct Supervisor {
    shutdown_tx: watch::Sender<bool>,
    tasks: JoinSet<(String, MonitorExit)>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            tasks: JoinSet::new(),
        }
    }

    /// Spawn a monitor for every Redis and MySQL source.
    pub fn start(config: &AgentConfig, sink: &Sink) -> Self {
        let mut supervisor = Self::new();

        for source in &config.redis {
            let (source, sink) = (source.clone(), sink.clone());
            supervisor.spawn(format!("redis://{}", source.server_addr), move |shutdown| {
                monitor::redis::run(source, sink, shutdown)
            });
        }

        for source in &config.mysql {
            let (source, sink) = (source.clone(), sink.clone());
            supervisor.spawn(format!("mysql://{}", source.instance()), move |shutdown| {
                monitor::mysql::run(source, sink, shutdown)
            });
        }

        tracing::info!(
            redis = config.redis.len(),
            mysql = config.mysql.len(),
            "Started source monitors"
        );

        supervisor
    }

    /// Spawn one source loop, handing it a receiver of the shutdown signal.
    pub fn spawn<F, Fut>(&mut self, label: impl Into<String>, run: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = MonitorExit> + Send + 'static,
    {
        let label = label.into();
        let run = run(self.shutdown_tx.subscribe());
        self.tasks.spawn(async move { (label, run.await) });
    }

    /// Number of monitor tasks that have not been reaped yet.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every loop to stop and wait for all of them.
    ///
    /// Returns each source's label with the reason its loop ended.
    pub async fn shutdown(mut self) -> Vec<(String, MonitorExit)> {
        let _ = self.shutdown_tx.send(true);

        let mut exits = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((label, exit)) => {
                    tracing::debug!(source = %label, exit = ?exit, "Source monitor exited");
                    exits.push((label, exit));
                }
                Err(e) => tracing::error!(error = %e, "Source monitor task failed"),
            }
        }
        exits
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use storewatch_adapters::info::parse_info;
    use storewatch_adapters::AdapterError;

    use super::*;
    use crate::config::{MySqlSourceConfig, RedisSourceConfig};
    use crate::monitor::mysql::MySqlPlan;
    use crate::monitor::redis::RedisPlan;
    use crate::monitor::testing::ScriptedFetcher;

    fn unreachable_config() -> AgentConfig {
        AgentConfig {
            redis: vec![RedisSourceConfig {
                server_addr: "127.0.0.1:1".into(),
                password: String::new(),
                collect_interval: 10,
            }],
            mysql: vec![MySqlSourceConfig {
                host: "127.0.0.1".into(),
                port: 1,
                username: "root".into(),
                password: String::new(),
                collect_interval: 10,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_config_starts_nothing() {
        let supervisor = Supervisor::start(&AgentConfig::default(), &Sink::new());
        assert!(supervisor.is_empty());
        assert!(supervisor.shutdown().await.is_empty());
    }

    #[tokio::test]
    async fn one_task_per_source() {
        let supervisor = Supervisor::start(&unreachable_config(), &Sink::new());
        assert_eq!(supervisor.len(), 2);
        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_source_runs_alongside_healthy_one() {
        let sink = Sink::new();
        let mut supervisor = Supervisor::new();

        let mysql = unreachable_config().mysql.remove(0);
        let mysql_sink = sink.clone();
        supervisor.spawn("mysql://127.0.0.1:1", move |shutdown| async move {
            monitor::run_source(
                "127.0.0.1:1",
                async { Err::<ScriptedFetcher, _>(AdapterError::Connection("refused".into())) },
                || MySqlPlan::register(&mysql_sink, &mysql),
                Duration::from_secs(10),
                shutdown,
            )
            .await
        });

        let redis = RedisSourceConfig {
            server_addr: "cache1:6379".into(),
            password: String::new(),
            collect_interval: 10,
        };
        let redis_sink = sink.clone();
        let info = parse_info("# Keyspace\r\ndb0:keys=15,expires=0\r\n").unwrap();
        let replies = [Ok(info.clone()), Ok(info.clone()), Ok(info)];
        supervisor.spawn("redis://cache1:6379", move |shutdown| async move {
            monitor::run_source(
                "cache1:6379",
                async { Ok::<_, AdapterError>(ScriptedFetcher::new(replies)) },
                || RedisPlan::register(&redis_sink, &redis),
                Duration::from_secs(10),
                shutdown,
            )
            .await
        });
        assert_eq!(supervisor.len(), 2);

        // Cycles of the healthy source start at 0s, 10s, 20s.
        tokio::time::sleep(Duration::from_secs(25)).await;

        let batch = sink.collect();
        let keys: f64 = batch.named("redis_keys").map(|p| p.value).sum();
        assert_eq!(keys, 30.0);
        assert_eq!(batch.points.iter().filter(|p| p.name.starts_with("mysql_")).count(), 0);

        let mut exits = supervisor.shutdown().await;
        exits.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            exits,
            vec![
                (
                    "mysql://127.0.0.1:1".to_string(),
                    MonitorExit::ConnectFailed("Connection failed: refused".into())
                ),
                ("redis://cache1:6379".to_string(), MonitorExit::Shutdown),
            ]
        );
    }
}
