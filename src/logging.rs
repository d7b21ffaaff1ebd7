//! Logging setup: stdout always, plus a rotating log file when configured.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation as AppenderRotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogConfig, Rotation};

impl From<Rotation> for AppenderRotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Daily => AppenderRotation::DAILY,
            Rotation::Hourly => AppenderRotation::HOURLY,
            Rotation::Never => AppenderRotation::NEVER,
        }
    }
}

/// `RUST_LOG` when set, otherwise the configured level.
fn filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level {:?}", config.level)),
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped and must be held
/// for as long as the process logs.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(filter(config)?);

    let Some(dir) = &config.path else {
        tracing_subscriber::registry()
            .with(stdout_layer)
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(None);
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.file_name);
    if config.max_files > 0 {
        builder = builder.max_log_files(config.max_files);
    }
    let appender = builder
        .build(dir)
        .with_context(|| format!("Failed to open log directory {}", dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter(config)?),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_maps_to_appender() {
        assert_eq!(AppenderRotation::from(Rotation::Daily), AppenderRotation::DAILY);
        assert_eq!(AppenderRotation::from(Rotation::Hourly), AppenderRotation::HOURLY);
        assert_eq!(AppenderRotation::from(Rotation::Never), AppenderRotation::NEVER);
    }

    #[test]
    fn invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "storewatch=notalevel".into(),
            ..Default::default()
        };
        assert!(filter(&config).is_err());
    }

    #[test]
    fn file_logging_creates_directory_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            path: Some(dir.path().to_path_buf()),
            rotation: Rotation::Never,
            ..Default::default()
        };

        let guard = init(&config).unwrap();
        assert!(guard.is_some());
        tracing::info!("written to file");
        drop(guard);

        assert!(dir.path().join("storewatch.log").exists());
    }
}
