//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when collecting a snapshot from a backend.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Query or command failed after the connection was established.
    #[error("Query failed: {0}")]
    Query(String),

    /// Failed to decode or parse a response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Invalid connection settings.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for AdapterError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => AdapterError::Timeout,
            sqlx::Error::Io(e) => AdapterError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => AdapterError::Connection(e.to_string()),
            sqlx::Error::Configuration(e) => AdapterError::Config(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                AdapterError::Parse(err.to_string())
            }
            sqlx::Error::Database(db) => {
                // ER_ACCESS_DENIED_ERROR
                if db.code().as_deref() == Some("28000") {
                    AdapterError::Auth(db.message().to_string())
                } else {
                    AdapterError::Query(db.message().to_string())
                }
            }
            other => AdapterError::Query(other.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for AdapterError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.kind() == redis::ErrorKind::AuthenticationFailed {
            AdapterError::Auth(err.to_string())
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            AdapterError::Connection(err.to_string())
        } else if err.kind() == redis::ErrorKind::TypeError {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Query(err.to_string())
        }
    }
}
