//! Output backends for emitting metric batches.

use std::path::PathBuf;

use storewatch_types::MetricBatch;

/// Output destination for metric batches.
#[derive(Debug)]
pub enum Output {
    /// Append batches to a file, one JSON document per line.
    File(PathBuf),

    /// Send batches to a TCP server as newline-delimited JSON.
    Tcp(String),

    /// Write batches to standard output as JSON lines.
    Stdout,

    /// Send batches through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    #[cfg(feature = "tokio")]
    Channel(tokio::sync::mpsc::Sender<MetricBatch>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use storewatch_sdk::Output;
    ///
    /// let output = Output::file("metrics.jsonl");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use storewatch_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    /// ```
    #[cfg(feature = "tokio")]
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<MetricBatch>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Emit a batch to this output.
    #[cfg(feature = "tokio")]
    pub(crate) async fn emit(&self, batch: &MetricBatch) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;

        match self {
            Output::File(path) => {
                let mut line = serde_json::to_vec(batch)?;
                line.push(b'\n');
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                file.write_all(&line).await?;
                file.flush().await?;
            }
            Output::Tcp(addr) => {
                use tokio::net::TcpStream;

                let mut line = serde_json::to_vec(batch)?;
                line.push(b'\n');
                let mut stream = TcpStream::connect(addr).await?;
                stream.write_all(&line).await?;
            }
            Output::Stdout => {
                let mut line = serde_json::to_vec(batch)?;
                line.push(b'\n');
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&line).await?;
                stdout.flush().await?;
            }
            Output::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                let _ = tx.try_send(batch.clone());
            }
        }
        Ok(())
    }

    /// Short label used in logs.
    pub fn label(&self) -> String {
        match self {
            Output::File(path) => format!("file:{}", path.display()),
            Output::Tcp(addr) => format!("tcp:{addr}"),
            Output::Stdout => "stdout".to_string(),
            #[cfg(feature = "tokio")]
            Output::Channel(_) => "channel".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storewatch_types::{Aggregation, MetricPoint, Tags};

    fn batch(value: f64) -> MetricBatch {
        MetricBatch::with_timestamp(
            1_700_000_000_000,
            vec![MetricPoint {
                name: "redis_keys".into(),
                tags: Tags::new(),
                aggregation: Aggregation::Sum,
                interval_secs: 10,
                timestamp: 1_700_000_000,
                value,
                samples: 1,
            }],
        )
    }

    #[tokio::test]
    async fn file_output_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let output = Output::file(&path);

        output.emit(&batch(15.0)).await.unwrap();
        output.emit(&batch(16.0)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<MetricBatch> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].points[0].value, 16.0);
    }

    #[tokio::test]
    async fn channel_output_forwards_batches() {
        let (output, mut rx) = Output::channel(4);
        output.emit(&batch(15.0)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, batch(15.0));
    }

    #[tokio::test]
    async fn tcp_output_to_closed_port_errors() {
        let output = Output::tcp("127.0.0.1:1");
        assert!(output.emit(&batch(1.0)).await.is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(Output::file("/tmp/m.jsonl").label(), "file:/tmp/m.jsonl");
        assert_eq!(Output::tcp("sink:2003").label(), "tcp:sink:2003");
        assert_eq!(Output::Stdout.label(), "stdout");
    }
}
