//! Redis adapter using the `INFO` command.
//!
//! One `INFO stats memory clients keyspace` round trip per fetch; the reply
//! is parsed by [`crate::info::parse_info`]. The connection is held by a
//! [`ConnectionManager`], so a dropped socket or a server restart fails only
//! the fetch in flight and the next fetch runs on a fresh connection.
//!
//! ## Sections Collected
//!
//! - **Stats**: instantaneous ops/sec and network throughput, keyspace hits/misses
//! - **Memory**: `used_memory`, `maxmemory`
//! - **Clients**: `connected_clients`
//! - **Keyspace**: one `dbN` entry per logical database (`keys=..,expires=..`)

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::IntoConnectionInfo;

use storewatch_types::Snapshot;

use crate::info::parse_info;
use crate::{AdapterError, SnapshotFetcher};

/// Sections requested from `INFO`.
pub const INFO_SECTIONS: [&str; 4] = ["stats", "memory", "clients", "keyspace"];

const DEFAULT_PORT: u16 = 6379;

/// Connection settings for one Redis server.
#[derive(Debug, Clone)]
pub struct RedisOptions {
    server_addr: String,
    password: Option<String>,
    db: i64,
}

impl RedisOptions {
    /// Options for a server given as `host:port` (port defaults to 6379).
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            password: None,
            db: 0,
        }
    }

    /// Authenticate with a password. An empty password means no `AUTH`.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Select a logical database (default: 0).
    pub fn db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// The configured `host:port`.
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    fn host_port(&self) -> Result<(String, u16), AdapterError> {
        let addr = self.server_addr.trim();
        let invalid =
            || AdapterError::Config(format!("invalid server address {:?}", self.server_addr));

        // `[v6]:port` or `[v6]`
        if let Some(rest) = addr.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => DEFAULT_PORT,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse::<u16>().ok())
                    .ok_or_else(invalid)?,
            };
            return Ok((host.to_string(), port));
        }

        match addr.rsplit_once(':') {
            // Bare IPv6 address without a port.
            Some((host, _)) if host.contains(':') => Ok((addr.to_string(), DEFAULT_PORT)),
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid())?;
                Ok((host.to_string(), port))
            }
            None => Ok((addr.to_string(), DEFAULT_PORT)),
        }
    }

    fn client(&self) -> Result<redis::Client, AdapterError> {
        let (host, port) = self.host_port()?;
        let mut info = (host, port).into_connection_info()?;
        info.redis.password = self.password.clone();
        info.redis.db = self.db;
        Ok(redis::Client::open(info)?)
    }
}

/// A connected Redis server.
#[derive(Clone)]
pub struct RedisFetcher {
    conn: ConnectionManager,
    description: String,
}

impl RedisFetcher {
    /// Open a managed connection (authenticating and selecting the db).
    ///
    /// Later failures trigger a reconnect in the background; only this
    /// initial connection has to succeed.
    pub async fn connect(options: &RedisOptions) -> Result<Self, AdapterError> {
        let client = options.client()?;
        let conn = client.get_connection_manager().await?;

        Ok(Self {
            conn,
            description: format!("redis://{}", options.server_addr),
        })
    }
}

#[async_trait]
impl SnapshotFetcher for RedisFetcher {
    fn description(&self) -> &str {
        &self.description
    }

    async fn fetch(&mut self) -> Result<Snapshot, AdapterError> {
        let mut cmd = redis::cmd("INFO");
        for section in INFO_SECTIONS {
            cmd.arg(section);
        }
        let raw: String = cmd.query_async(&mut self.conn).await?;
        parse_info(&raw)
    }
}

impl std::fmt::Debug for RedisFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisFetcher")
            .field("description", &self.description)
            .finish()
    }
}
