//! Process termination signals.
//!
//! The agent stops on Ctrl+C and, on Unix, on SIGTERM as sent by service
//! managers and container runtimes.

use anyhow::Result;

/// Installed signal handlers, waiting for the first termination request.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register the handlers. Signals arriving after this are not lost, even
    /// before [`recv`](Self::recv) is awaited.
    pub fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Wait for SIGINT or SIGTERM and return the name of the one received.
    pub async fn recv(&mut self) -> Result<&'static str> {
        #[cfg(unix)]
        let terminate = self.terminate.recv();

        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                Ok("SIGINT")
            }
            _ = terminate => Ok("SIGTERM"),
        }
    }
}
