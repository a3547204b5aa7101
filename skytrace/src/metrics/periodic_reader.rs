use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::export::{ExportError, ExportResult, MetricExporter};

use super::MeterProvider;

enum ReaderMessage {
    Flush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
}

/// Periodically snapshots every instrument of a [`MeterProvider`] and hands
/// the cumulative state to a [`MetricExporter`].
///
/// Snapshots are taken on a dedicated task; instrument updates are never
/// blocked by a slow exporter. `shutdown` performs one final export so no
/// increments recorded before shutdown are lost.
pub struct PeriodicMetricReader {
    sender: mpsc::Sender<ReaderMessage>,
}

impl PeriodicMetricReader {
    /// Spawn the reader task. Must be called within a Tokio runtime.
    pub fn start(
        provider: MeterProvider,
        mut exporter: Box<dyn MetricExporter>,
        interval: Duration,
    ) -> Self {
        exporter.set_resource(provider.resource());
        let (sender, mut receiver) = mpsc::channel(4);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so the first export
            // happens one interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        export_once(&provider, exporter.as_mut()).await;
                    }
                    message = receiver.recv() => match message {
                        Some(ReaderMessage::Flush(ack)) => {
                            export_once(&provider, exporter.as_mut()).await;
                            let _ = ack.send(Ok(()));
                        }
                        Some(ReaderMessage::Shutdown(ack)) => {
                            export_once(&provider, exporter.as_mut()).await;
                            exporter.shutdown();
                            let _ = ack.send(Ok(()));
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        PeriodicMetricReader { sender }
    }

    /// Snapshot and export immediately.
    pub async fn force_flush(&self) -> ExportResult {
        self.round_trip(ReaderMessage::Flush).await
    }

    /// Perform a final export and stop the reader task.
    pub async fn shutdown(&self) -> ExportResult {
        self.round_trip(ReaderMessage::Shutdown).await
    }

    async fn round_trip(
        &self,
        make: impl FnOnce(oneshot::Sender<ExportResult>) -> ReaderMessage,
    ) -> ExportResult {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(make(ack))
            .await
            .map_err(|_| ExportError::Shutdown)?;
        done.await.map_err(|_| ExportError::Shutdown)?
    }
}

async fn export_once(provider: &MeterProvider, exporter: &mut dyn MetricExporter) {
    let batch = provider.snapshot();
    if batch.is_empty() {
        return;
    }
    if let Err(err) = exporter.export(batch).await {
        tracing::warn!(
            name: "periodic_metric_reader.export_failed",
            error = %err,
            "metric snapshot not delivered; will retry next interval"
        );
    }
}

impl fmt::Debug for PeriodicMetricReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PeriodicMetricReader")
    }
}
