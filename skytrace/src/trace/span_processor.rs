use std::fmt;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::export::{ExportError, ExportResult, SpanExporter};
use crate::resource::Resource;

use super::SpanData;

/// Hook invoked with every finalized span.
///
/// `on_end` runs synchronously on the thread that closed the span and must
/// not block; delivery happens on the processor's own task.
#[async_trait]
pub trait SpanProcessor: Send + Sync + fmt::Debug {
    /// Called with the finalized span data when a span closes.
    fn on_end(&self, span: SpanData);

    /// Wait until every span received so far has been exported.
    async fn force_flush(&self) -> ExportResult;

    /// Flush, then release the exporter. Subsequent spans are discarded.
    async fn shutdown(&self) -> ExportResult;
}

enum SpanMessage {
    Export(SpanData),
    Flush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
}

/// A [`SpanProcessor`] that exports each span as soon as it finishes.
///
/// The caller only enqueues; a dedicated task owns the exporter and performs
/// the network I/O, so closing a span never blocks the serving path. Export
/// failures are logged and the span is dropped — telemetry failures stay off
/// the request path.
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    sender: mpsc::UnboundedSender<SpanMessage>,
}

impl SimpleSpanProcessor {
    /// Create the processor and spawn its export task. Must be called
    /// within a Tokio runtime.
    pub fn new(mut exporter: Box<dyn SpanExporter>, resource: &Resource) -> Self {
        exporter.set_resource(resource);
        let (sender, mut receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    SpanMessage::Export(span) => {
                        if let Err(err) = exporter.export(vec![span]).await {
                            tracing::warn!(
                                name: "simple_span_processor.export_failed",
                                error = %err,
                                "dropping span after export failure"
                            );
                        }
                    }
                    SpanMessage::Flush(ack) => {
                        // Queue drained in order; everything before us is out.
                        let _ = ack.send(Ok(()));
                    }
                    SpanMessage::Shutdown(ack) => {
                        exporter.shutdown();
                        let _ = ack.send(Ok(()));
                        break;
                    }
                }
            }
        });

        SimpleSpanProcessor { sender }
    }

    async fn round_trip(
        &self,
        make: impl FnOnce(oneshot::Sender<ExportResult>) -> SpanMessage,
    ) -> ExportResult {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(make(ack))
            .map_err(|_| ExportError::Shutdown)?;
        done.await.map_err(|_| ExportError::Shutdown)?
    }
}

#[async_trait]
impl SpanProcessor for SimpleSpanProcessor {
    fn on_end(&self, span: SpanData) {
        if !span.span_context.is_sampled() {
            return;
        }
        if self.sender.send(SpanMessage::Export(span)).is_err() {
            tracing::debug!(
                name: "simple_span_processor.after_shutdown",
                "span discarded after processor shutdown"
            );
        }
    }

    async fn force_flush(&self) -> ExportResult {
        self.round_trip(SpanMessage::Flush).await
    }

    async fn shutdown(&self) -> ExportResult {
        self.round_trip(SpanMessage::Shutdown).await
    }
}

impl fmt::Debug for SpanMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanMessage::Export(_) => f.write_str("Export"),
            SpanMessage::Flush(_) => f.write_str("Flush"),
            SpanMessage::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}
