//! MySQL adapter using server status and system variables.
//!
//! This adapter samples a MySQL-compatible server with two text-protocol
//! queries per fetch and stores the results in two snapshot sections.
//!
//! ## Sections Collected
//!
//! - **`status`**: statement counters (`Com_insert`, `Com_update`,
//!   `Com_delete`, `Com_select`), `Questions`, `Slow_queries`,
//!   `Threads_connected` and `Max_used_connections`
//! - **`variables`**: `max_connections` and `long_query_time`
//!
//! ## Example
//!
//! ```rust,no_run
//! use storewatch_adapters::mysql::{MySqlFetcher, MySqlOptions};
//! use storewatch_adapters::SnapshotFetcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = MySqlOptions::builder()
//!         .host("db1.internal")
//!         .port(3306)
//!         .credentials("monitor", "secret")
//!         .build();
//!
//!     let mut fetcher = MySqlFetcher::connect(&options).await?;
//!     let snapshot = fetcher.fetch().await?;
//!
//!     println!("selects so far: {:?}", snapshot.get("status", "Com_select"));
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Executor, Row};

use storewatch_types::{Section, Snapshot};

use crate::{AdapterError, SnapshotFetcher};

/// Section holding `SHOW GLOBAL STATUS` rows.
pub const STATUS_SECTION: &str = "status";

/// Section holding `SHOW GLOBAL VARIABLES` rows.
pub const VARIABLES_SECTION: &str = "variables";

const STATUS_SQL: &str = "show global status where Variable_name regexp \
    'Com_insert|Com_update|Com_delete|Com_select|Questions|Slow_queries|Threads_connected|Max_used_connections'";

const VARIABLES_SQL: &str =
    "show global variables where Variable_name regexp 'max_connections|long_query_time'";

/// Connection settings for one MySQL instance.
#[derive(Debug, Clone)]
pub struct MySqlOptions {
    host: String,
    port: u16,
    username: String,
    password: String,
    acquire_timeout: Duration,
}

impl MySqlOptions {
    /// Create a new builder for configuring the options.
    pub fn builder() -> MySqlOptionsBuilder {
        MySqlOptionsBuilder::default()
    }

    /// The `host:port` identity of the instance.
    pub fn instance(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .charset("utf8")
    }
}

/// Builder for MySqlOptions.
#[derive(Debug, Default)]
pub struct MySqlOptionsBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    acquire_timeout: Option<Duration>,
}

impl MySqlOptionsBuilder {
    /// Set the server host (default: "localhost").
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the server port (default: 3306).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username and password for authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set how long a query waits for a pooled connection (default: 10 seconds).
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Build the options.
    pub fn build(self) -> MySqlOptions {
        MySqlOptions {
            host: self.host.unwrap_or_else(|| "localhost".to_string()),
            port: self.port.unwrap_or(3306),
            username: self.username.unwrap_or_else(|| "root".to_string()),
            password: self.password.unwrap_or_default(),
            acquire_timeout: self.acquire_timeout.unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// A connected MySQL instance.
#[derive(Debug, Clone)]
pub struct MySqlFetcher {
    pool: MySqlPool,
    description: String,
}

impl MySqlFetcher {
    /// Open the pool and verify the server accepts the credentials.
    ///
    /// The pool keeps a single connection and re-establishes it on its own
    /// if the server drops it between samples.
    pub async fn connect(options: &MySqlOptions) -> Result<Self, AdapterError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(options.connect_options())
            .await?;

        Ok(Self {
            pool,
            description: format!("mysql://{}", options.instance()),
        })
    }

    async fn query_section(&self, sql: &str) -> Result<Section, AdapterError> {
        let rows = (&self.pool).fetch_all(sql).await?;
        rows_to_section(&rows)
    }
}

#[async_trait]
impl SnapshotFetcher for MySqlFetcher {
    fn description(&self) -> &str {
        &self.description
    }

    async fn fetch(&mut self) -> Result<Snapshot, AdapterError> {
        let status = self.query_section(STATUS_SQL).await?;
        let variables = self.query_section(VARIABLES_SQL).await?;

        let mut snapshot = Snapshot::new();
        snapshot.sections.insert(STATUS_SECTION.to_string(), status);
        snapshot.sections.insert(VARIABLES_SECTION.to_string(), variables);
        Ok(snapshot)
    }
}

// Any row that fails to decode fails the whole query.
fn rows_to_section(rows: &[MySqlRow]) -> Result<Section, AdapterError> {
    let mut section = Section::new();
    for row in rows {
        let name: String = row.try_get(0)?;
        let value: String = row.try_get(1)?;
        section.insert(name, value);
    }
    Ok(section)
}
