//! Severity-filtered log records with trace correlation.
//!
//! Records below the provider's minimum severity (default
//! [`Severity::Debug`], i.e. everything passes) are dropped before they
//! reach any processor. Records emitted under a [`Context`] with an active
//! span carry that span's trace and span ids, which is what lets a log
//! line be joined to the trace it was produced in.

mod log_processor;
mod record;

pub use log_processor::{LogProcessor, SimpleLogProcessor};
pub use record::{LogRecord, Severity};

use std::sync::Arc;

use crate::context::Context;
use crate::export::{ExportResult, LogExporter};
use crate::resource::Resource;

#[derive(Debug)]
struct LoggerProviderInner {
    resource: Resource,
    min_severity: Severity,
    processors: Vec<Box<dyn LogProcessor>>,
}

/// Owner of log processors, the minimum severity and the log-side resource.
#[derive(Clone, Debug)]
pub struct LoggerProvider {
    inner: Arc<LoggerProviderInner>,
}

impl LoggerProvider {
    /// Create a [`LoggerProviderBuilder`].
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder {
            resource: Resource::empty(),
            min_severity: Severity::Debug,
            exporters: Vec::new(),
            processors: Vec::new(),
        }
    }

    /// Obtain a logger backed by this provider.
    pub fn logger(&self) -> Logger {
        Logger {
            provider: self.clone(),
        }
    }

    /// The resource attached to every record from this provider.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// Wait until every record emitted so far has been exported.
    pub async fn force_flush(&self) -> ExportResult {
        for processor in &self.inner.processors {
            processor.force_flush().await?;
        }
        Ok(())
    }

    /// Flush and shut down all log processors.
    pub async fn shutdown(&self) -> ExportResult {
        for processor in &self.inner.processors {
            processor.shutdown().await?;
        }
        Ok(())
    }
}

/// Builder for [`LoggerProvider`].
#[derive(Debug)]
pub struct LoggerProviderBuilder {
    resource: Resource,
    min_severity: Severity,
    exporters: Vec<Box<dyn LogExporter>>,
    processors: Vec<Box<dyn LogProcessor>>,
}

impl LoggerProviderBuilder {
    /// Set the resource identifying the producing entity.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Drop records below this severity before they reach any processor.
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Install a [`SimpleLogProcessor`] exporting each record to `exporter`
    /// as soon as it is emitted.
    pub fn with_simple_exporter(mut self, exporter: impl LogExporter) -> Self {
        self.exporters.push(Box::new(exporter));
        self
    }

    /// Install a pre-built log processor.
    pub fn with_log_processor(mut self, processor: impl LogProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Build the provider. Must be called within a Tokio runtime: simple
    /// processors spawn their export task here.
    pub fn build(self) -> LoggerProvider {
        let mut processors = self.processors;
        for exporter in self.exporters {
            processors.push(Box::new(SimpleLogProcessor::new(exporter, &self.resource)));
        }

        LoggerProvider {
            inner: Arc::new(LoggerProviderInner {
                resource: self.resource,
                min_severity: self.min_severity,
                processors,
            }),
        }
    }
}

/// Emits [`LogRecord`]s under an explicit [`Context`].
#[derive(Clone, Debug)]
pub struct Logger {
    provider: LoggerProvider,
}

impl Logger {
    /// Emit a message at the given severity, attaching the active span's
    /// trace identity from `cx` if one is present.
    ///
    /// Message formatting happens at the call site (`format!`); by the time
    /// a record exists its body is final.
    pub fn log(&self, cx: &Context, severity: Severity, body: impl Into<String>) {
        let mut record = LogRecord::new(severity, body);
        if let Some(span_context) = cx.span_context().filter(|sc| sc.is_valid()) {
            record.trace_id = Some(span_context.trace_id());
            record.span_id = Some(span_context.span_id());
        }
        self.emit(record);
    }

    /// Emit a pre-built record, applying the severity filter.
    pub fn emit(&self, record: LogRecord) {
        if record.severity < self.provider.inner.min_severity {
            return;
        }
        for processor in &self.provider.inner.processors {
            processor.emit(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryLogExporter, IncrementIdGenerator, InMemorySpanExporter};
    use crate::trace::TracerProvider;
    use crate::{Context, Resource};

    fn provider(exporter: InMemoryLogExporter, min: Severity) -> LoggerProvider {
        LoggerProvider::builder()
            .with_resource(Resource::empty())
            .with_min_severity(min)
            .with_simple_exporter(exporter)
            .build()
    }

    #[tokio::test]
    async fn below_minimum_severity_is_dropped() {
        let exporter = InMemoryLogExporter::default();
        let logs = provider(exporter.clone(), Severity::Warn);

        let logger = logs.logger();
        logger.log(&Context::new(), Severity::Debug, "dropped");
        logger.log(&Context::new(), Severity::Info, "dropped");
        logger.log(&Context::new(), Severity::Warn, "kept");
        logger.log(&Context::new(), Severity::Error, "kept");
        logs.force_flush().await.unwrap();

        let records = exporter.exported_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.body == "kept"));
    }

    #[tokio::test]
    async fn default_minimum_is_debug() {
        let exporter = InMemoryLogExporter::default();
        let logs = provider(exporter.clone(), Severity::Debug);

        logs.logger().log(&Context::new(), Severity::Debug, "kept");
        logs.force_flush().await.unwrap();
        assert_eq!(exporter.exported_records().len(), 1);
    }

    #[tokio::test]
    async fn active_span_identity_is_attached() {
        let exporter = InMemoryLogExporter::default();
        let logs = provider(exporter.clone(), Severity::Debug);

        let traces = TracerProvider::builder()
            .with_id_generator(IncrementIdGenerator::new())
            .with_simple_exporter(InMemorySpanExporter::default())
            .build();
        let span = traces.tracer().start_span("op", &Context::new());
        let cx = Context::new().with_span(&span);

        logs.logger().log(&cx, Severity::Info, "inside span");
        logs.logger().log(&Context::new(), Severity::Info, "outside");
        logs.force_flush().await.unwrap();

        let records = exporter.exported_records();
        assert_eq!(records[0].trace_id, Some(span.span_context().trace_id()));
        assert_eq!(records[0].span_id, Some(span.span_context().span_id()));
        assert_eq!(records[1].trace_id, None);
        span.end();
    }
}
