use std::fmt;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::export::{ExportError, ExportResult, LogExporter};
use crate::resource::Resource;

use super::LogRecord;

/// Hook invoked with every emitted (and severity-accepted) log record.
#[async_trait]
pub trait LogProcessor: Send + Sync + fmt::Debug {
    /// Called with each record. Runs on the emitting thread; must not block.
    fn emit(&self, record: LogRecord);

    /// Wait until every record received so far has been exported.
    async fn force_flush(&self) -> ExportResult;

    /// Flush, then release the exporter. Subsequent records are discarded.
    async fn shutdown(&self) -> ExportResult;
}

enum LogMessage {
    Export(LogRecord),
    Flush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
}

/// A [`LogProcessor`] that exports each record as soon as it is emitted
/// (the synchronous-per-record baseline; batching would be a different
/// processor behind the same trait).
#[derive(Debug)]
pub struct SimpleLogProcessor {
    sender: mpsc::UnboundedSender<LogMessage>,
}

impl SimpleLogProcessor {
    /// Create the processor and spawn its export task. Must be called
    /// within a Tokio runtime.
    pub fn new(mut exporter: Box<dyn LogExporter>, resource: &Resource) -> Self {
        exporter.set_resource(resource);
        let (sender, mut receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    LogMessage::Export(record) => {
                        if let Err(err) = exporter.export(vec![record]).await {
                            tracing::warn!(
                                name: "simple_log_processor.export_failed",
                                error = %err,
                                "dropping log record after export failure"
                            );
                        }
                    }
                    LogMessage::Flush(ack) => {
                        let _ = ack.send(Ok(()));
                    }
                    LogMessage::Shutdown(ack) => {
                        exporter.shutdown();
                        let _ = ack.send(Ok(()));
                        break;
                    }
                }
            }
        });

        SimpleLogProcessor { sender }
    }

    async fn round_trip(
        &self,
        make: impl FnOnce(oneshot::Sender<ExportResult>) -> LogMessage,
    ) -> ExportResult {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(make(ack))
            .map_err(|_| ExportError::Shutdown)?;
        done.await.map_err(|_| ExportError::Shutdown)?
    }
}

#[async_trait]
impl LogProcessor for SimpleLogProcessor {
    fn emit(&self, record: LogRecord) {
        if self.sender.send(LogMessage::Export(record)).is_err() {
            tracing::debug!(
                name: "simple_log_processor.after_shutdown",
                "log record discarded after processor shutdown"
            );
        }
    }

    async fn force_flush(&self) -> ExportResult {
        self.round_trip(LogMessage::Flush).await
    }

    async fn shutdown(&self) -> ExportResult {
        self.round_trip(LogMessage::Shutdown).await
    }
}

impl fmt::Debug for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogMessage::Export(_) => f.write_str("Export"),
            LogMessage::Flush(_) => f.write_str("Flush"),
            LogMessage::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}
