//! Agent configuration.
//!
//! Loaded from a file (format chosen by extension, usually YAML) and
//! overridden by `STOREWATCH__*` environment variables, e.g.
//! `STOREWATCH__LOG__LEVEL=debug`.
//!
//! ```yaml
//! log:
//!   level: info
//!   path: /var/log/storewatch
//!   rotation: daily
//!   max_files: 7
//! redis:
//!   - server_addr: 127.0.0.1:6379
//!     password: ""
//!     collect_interval: 10
//! mysql:
//!   - host: 127.0.0.1
//!     port: 3306
//!     username: monitor
//!     password: secret
//!     collect_interval: 10
//! sink:
//!   flush_interval: 10
//!   outputs:
//!     - type: file
//!       path: metrics.jsonl
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use storewatch_adapters::mysql::MySqlOptions;
use storewatch_adapters::redis::RedisOptions;
use storewatch_sdk::{Output, Sink};

/// Default path of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "storewatch.yaml";

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "STOREWATCH";

const DEFAULT_COLLECT_INTERVAL: u64 = 10;
const DEFAULT_FLUSH_INTERVAL: u64 = 10;

fn default_collect_interval() -> u64 {
    DEFAULT_COLLECT_INTERVAL
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub log: LogConfig,
    pub redis: Vec<RedisSourceConfig>,
    pub mysql: Vec<MySqlSourceConfig>,
    pub sink: SinkConfig,
}

impl AgentConfig {
    /// Load, merge environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let config: AgentConfig = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config file {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (i, redis) in self.redis.iter().enumerate() {
            ensure!(
                !redis.server_addr.trim().is_empty(),
                "redis[{i}]: server_addr must not be empty"
            );
            ensure!(
                redis.collect_interval >= 1,
                "redis[{i}] ({}): collect_interval must be at least 1 second",
                redis.server_addr
            );
        }
        for (i, mysql) in self.mysql.iter().enumerate() {
            ensure!(
                !mysql.host.trim().is_empty(),
                "mysql[{i}]: host must not be empty"
            );
            ensure!(
                mysql.collect_interval >= 1,
                "mysql[{i}] ({}): collect_interval must be at least 1 second",
                mysql.instance()
            );
        }
        ensure!(
            self.sink.flush_interval >= 1,
            "sink: flush_interval must be at least 1 second"
        );
        Ok(())
    }

    /// Number of configured sources of both families.
    pub fn source_count(&self) -> usize {
        self.redis.len() + self.mysql.len()
    }
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// The `log` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Directory for log files; stdout only when unset.
    pub path: Option<PathBuf>,
    /// File name prefix inside `path`.
    pub file_name: String,
    pub rotation: Rotation,
    /// Rotated files to keep; 0 keeps all.
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
            file_name: "storewatch.log".to_string(),
            rotation: Rotation::Daily,
            max_files: 7,
        }
    }
}

/// One Redis server.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSourceConfig {
    /// `host:port`; also the `server` tag of every metric.
    pub server_addr: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_collect_interval")]
    pub collect_interval: u64,
}

impl RedisSourceConfig {
    pub fn options(&self) -> RedisOptions {
        RedisOptions::new(&self.server_addr)
            .password(&self.password)
            .db(0)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval)
    }
}

/// One MySQL instance.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlSourceConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default = "default_mysql_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_collect_interval")]
    pub collect_interval: u64,
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mysql_user() -> String {
    "root".to_string()
}

impl MySqlSourceConfig {
    /// `host:port`; also the `instance` tag of every metric.
    pub fn instance(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn options(&self) -> MySqlOptions {
        MySqlOptions::builder()
            .host(&self.host)
            .port(self.port)
            .credentials(&self.username, &self.password)
            .build()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval)
    }
}

/// Where flushed metric batches go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    /// Append JSON lines to a file.
    File { path: PathBuf },
    /// Send JSON lines to a TCP collector.
    Tcp { addr: String },
    /// Print JSON lines to stdout.
    Stdout,
}

impl OutputConfig {
    pub fn to_output(&self) -> Output {
        match self {
            OutputConfig::File { path } => Output::file(path),
            OutputConfig::Tcp { addr } => Output::tcp(addr),
            OutputConfig::Stdout => Output::Stdout,
        }
    }
}

/// The `sink` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Seconds between flushes.
    pub flush_interval: u64,
    pub outputs: Vec<OutputConfig>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            outputs: vec![OutputConfig::Stdout],
        }
    }
}

impl SinkConfig {
    /// Build a sink with every configured output.
    pub fn build(&self) -> Sink {
        self.outputs
            .iter()
            .fold(Sink::builder(), |builder, output| {
                builder.output(output.to_output())
            })
            .flush_interval(Duration::from_secs(self.flush_interval))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = yaml(
            r#"
log:
  path: /tmp/storewatch-logs
  rotation: hourly
  max_files: 3
redis:
  - server_addr: 10.0.0.1:6379
    password: secret
    collect_interval: 5
mysql:
  - host: 10.0.0.2
    port: 3307
    username: monitor
    password: pw
    collect_interval: 15
sink:
  flush_interval: 30
  outputs:
    - type: file
      path: metrics.jsonl
    - type: tcp
      addr: collector:2003
"#,
        );

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.log.path, Some(PathBuf::from("/tmp/storewatch-logs")));
        assert_eq!(config.log.rotation, Rotation::Hourly);
        assert_eq!(config.log.max_files, 3);

        assert_eq!(config.redis.len(), 1);
        assert_eq!(config.redis[0].server_addr, "10.0.0.1:6379");
        assert_eq!(config.redis[0].password, "secret");
        assert_eq!(config.redis[0].interval(), Duration::from_secs(5));

        assert_eq!(config.mysql[0].instance(), "10.0.0.2:3307");
        assert_eq!(config.mysql[0].username, "monitor");
        assert_eq!(config.mysql[0].collect_interval, 15);
        assert_eq!(config.source_count(), 2);

        assert_eq!(config.sink.flush_interval, 30);
        assert_eq!(
            config.sink.outputs,
            vec![
                OutputConfig::File {
                    path: PathBuf::from("metrics.jsonl")
                },
                OutputConfig::Tcp {
                    addr: "collector:2003".into()
                },
            ]
        );
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let file = yaml(
            r#"
redis:
  - server_addr: cache:6379
mysql:
  - host: db
"#,
        );

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.redis[0].password, "");
        assert_eq!(config.redis[0].collect_interval, DEFAULT_COLLECT_INTERVAL);
        assert_eq!(config.mysql[0].port, 3306);
        assert_eq!(config.mysql[0].username, "root");
        assert_eq!(config.sink.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.sink.outputs, vec![OutputConfig::Stdout]);
        assert!(config.log.path.is_none());
    }

    #[test]
    fn test_empty_source_lists_are_valid() {
        let file = yaml("sink:\n  flush_interval: 5\n");
        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.source_count(), 0);
    }

    #[test]
    fn test_zero_collect_interval_rejected() {
        let file = yaml(
            r#"
mysql:
  - host: db
    collect_interval: 0
"#,
        );

        let err = AgentConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("collect_interval"));
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let config = AgentConfig {
            sink: SinkConfig {
                flush_interval: 0,
                outputs: vec![],
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_server_addr_rejected() {
        let file = yaml("redis:\n  - server_addr: \"\"\n");
        assert!(AgentConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = AgentConfig::load(Path::new("/nonexistent/storewatch.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/storewatch.yaml"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = yaml("log:\n  level: info\n");
        std::env::set_var("STOREWATCH__LOG__LEVEL", "trace");
        let config = AgentConfig::load(file.path());
        std::env::remove_var("STOREWATCH__LOG__LEVEL");

        assert_eq!(config.unwrap().log.level, "trace");
    }

    #[test]
    fn test_source_options() {
        let mysql = MySqlSourceConfig {
            host: "db".into(),
            port: 3310,
            username: "u".into(),
            password: "p".into(),
            collect_interval: 10,
        };
        assert_eq!(mysql.options().instance(), "db:3310");

        let redis = RedisSourceConfig {
            server_addr: "cache:6380".into(),
            password: String::new(),
            collect_interval: 10,
        };
        assert_eq!(redis.options().server_addr(), "cache:6380");
    }

    #[test]
    fn test_sink_config_build() {
        let sink = SinkConfig {
            flush_interval: 42,
            outputs: vec![OutputConfig::Stdout],
        }
        .build();
        assert_eq!(sink.flush_interval(), Duration::from_secs(42));
    }
}
