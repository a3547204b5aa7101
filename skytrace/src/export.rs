//! Exporter traits implemented by signal sinks.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::logs::LogRecord;
use crate::metrics::MetricData;
use crate::resource::Resource;
use crate::trace::SpanData;

/// Errors returned by exporters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The payload could not reach the sink.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The payload could not be encoded for the wire.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// The exporter (or its owning processor) has already been shut down.
    #[error("exporter is shut down")]
    Shutdown,
}

/// Result of an export or flush operation.
pub type ExportResult = Result<(), ExportError>;

/// A sink for finalized spans.
///
/// Exporters are owned by a single processor task, hence `&mut self`;
/// synchronization is the processor's concern, not the exporter's.
#[async_trait]
pub trait SpanExporter: fmt::Debug + Send + 'static {
    /// Export a batch of finalized spans.
    async fn export(&mut self, batch: Vec<SpanData>) -> ExportResult;

    /// Set the resource describing the producing entity. Called once,
    /// before the first export.
    fn set_resource(&mut self, _resource: &Resource) {}

    /// Release any held connections. No exports follow a shutdown.
    fn shutdown(&mut self) {}
}

#[async_trait]
impl SpanExporter for Box<dyn SpanExporter> {
    async fn export(&mut self, batch: Vec<SpanData>) -> ExportResult {
        self.as_mut().export(batch).await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.as_mut().set_resource(resource);
    }

    fn shutdown(&mut self) {
        self.as_mut().shutdown();
    }
}

/// A sink for emitted log records.
#[async_trait]
pub trait LogExporter: fmt::Debug + Send + 'static {
    /// Export a batch of log records.
    async fn export(&mut self, batch: Vec<LogRecord>) -> ExportResult;

    /// Set the resource describing the producing entity.
    fn set_resource(&mut self, _resource: &Resource) {}

    /// Release any held connections. No exports follow a shutdown.
    fn shutdown(&mut self) {}
}

#[async_trait]
impl LogExporter for Box<dyn LogExporter> {
    async fn export(&mut self, batch: Vec<LogRecord>) -> ExportResult {
        self.as_mut().export(batch).await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.as_mut().set_resource(resource);
    }

    fn shutdown(&mut self) {
        self.as_mut().shutdown();
    }
}

/// A sink for counter snapshots.
#[async_trait]
pub trait MetricExporter: fmt::Debug + Send + 'static {
    /// Export a cumulative snapshot of every instrument.
    async fn export(&mut self, batch: Vec<MetricData>) -> ExportResult;

    /// Set the resource describing the producing entity.
    fn set_resource(&mut self, _resource: &Resource) {}

    /// Release any held connections. No exports follow a shutdown.
    fn shutdown(&mut self) {}
}
