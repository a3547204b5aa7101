use std::time::Duration;

use crate::export::{ExportResult, LogExporter, MetricExporter, SpanExporter};
use crate::logs::{Logger, LoggerProvider, Severity};
use crate::metrics::{Meter, MeterProvider, PeriodicMetricReader};
use crate::resource::Resource;
use crate::trace::{Tracer, TracerProvider};

const DEFAULT_METRIC_INTERVAL: Duration = Duration::from_secs(1);

/// The explicitly constructed telemetry pipeline of one process.
///
/// Owns the three signal providers. Binaries build exactly one of these
/// before request handling starts, hand clones of the tracer/meter/logger
/// to whatever emits signals, and call [`TelemetryPipeline::shutdown`] once
/// when the process stops — flushing every signal still in flight.
///
/// Nothing here is registered globally; a second pipeline in the same
/// process (as tests do freely) is completely independent.
#[derive(Debug)]
pub struct TelemetryPipeline {
    resource: Resource,
    tracer_provider: TracerProvider,
    meter_provider: MeterProvider,
    metric_reader: Option<PeriodicMetricReader>,
    logger_provider: LoggerProvider,
}

impl TelemetryPipeline {
    /// Create a [`TelemetryPipelineBuilder`].
    pub fn builder() -> TelemetryPipelineBuilder {
        TelemetryPipelineBuilder {
            resource: Resource::empty(),
            span_exporters: Vec::new(),
            metric_exporter: None,
            metric_interval: DEFAULT_METRIC_INTERVAL,
            log_exporters: Vec::new(),
            min_severity: Severity::Debug,
        }
    }

    /// The resource identity shared by all three providers.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Obtain a tracer.
    pub fn tracer(&self) -> Tracer {
        self.tracer_provider.tracer()
    }

    /// Obtain a meter.
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter()
    }

    /// Obtain a logger.
    pub fn logger(&self) -> Logger {
        self.logger_provider.logger()
    }

    /// The trace-side provider.
    pub fn tracer_provider(&self) -> &TracerProvider {
        &self.tracer_provider
    }

    /// The metrics-side provider.
    pub fn meter_provider(&self) -> &MeterProvider {
        &self.meter_provider
    }

    /// The log-side provider.
    pub fn logger_provider(&self) -> &LoggerProvider {
        &self.logger_provider
    }

    /// Flush every signal currently in flight.
    pub async fn force_flush(&self) -> ExportResult {
        self.tracer_provider.force_flush().await?;
        if let Some(reader) = &self.metric_reader {
            reader.force_flush().await?;
        }
        self.logger_provider.force_flush().await
    }

    /// Flush and shut down, provider by provider: traces, then metrics,
    /// then logs. Safe to call once; signals emitted afterwards are
    /// discarded.
    pub async fn shutdown(&self) -> ExportResult {
        self.tracer_provider.shutdown().await?;
        if let Some(reader) = &self.metric_reader {
            reader.shutdown().await?;
        }
        self.logger_provider.shutdown().await
    }
}

/// Builder for [`TelemetryPipeline`].
#[derive(Debug)]
pub struct TelemetryPipelineBuilder {
    resource: Resource,
    span_exporters: Vec<Box<dyn SpanExporter>>,
    metric_exporter: Option<Box<dyn MetricExporter>>,
    metric_interval: Duration,
    log_exporters: Vec<Box<dyn LogExporter>>,
    min_severity: Severity,
}

impl TelemetryPipelineBuilder {
    /// Set the resource identity shared by every provider.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Export each finished span to `exporter` as soon as it closes.
    pub fn with_span_exporter(mut self, exporter: impl SpanExporter) -> Self {
        self.span_exporters.push(Box::new(exporter));
        self
    }

    /// Export counter snapshots to `exporter` on the configured interval.
    pub fn with_metric_exporter(mut self, exporter: impl MetricExporter) -> Self {
        self.metric_exporter = Some(Box::new(exporter));
        self
    }

    /// Interval between counter snapshots (default 1s).
    pub fn with_metric_interval(mut self, interval: Duration) -> Self {
        self.metric_interval = interval;
        self
    }

    /// Export each log record to `exporter` as soon as it is emitted.
    pub fn with_log_exporter(mut self, exporter: impl LogExporter) -> Self {
        self.log_exporters.push(Box::new(exporter));
        self
    }

    /// Drop log records below this severity (default [`Severity::Debug`]).
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Build the pipeline. Must be called within a Tokio runtime; the
    /// processors and the metric reader spawn their tasks here, before any
    /// request handling starts.
    pub fn build(self) -> TelemetryPipeline {
        let mut tracer_builder = TracerProvider::builder().with_resource(self.resource.clone());
        for exporter in self.span_exporters {
            tracer_builder = tracer_builder.with_simple_exporter(exporter);
        }
        let tracer_provider = tracer_builder.build();

        let meter_provider = MeterProvider::new(self.resource.clone());
        let metric_reader = self.metric_exporter.map(|exporter| {
            PeriodicMetricReader::start(meter_provider.clone(), exporter, self.metric_interval)
        });

        let mut logger_builder = LoggerProvider::builder()
            .with_resource(self.resource.clone())
            .with_min_severity(self.min_severity);
        for exporter in self.log_exporters {
            logger_builder = logger_builder.with_simple_exporter(exporter);
        }
        let logger_provider = logger_builder.build();

        TelemetryPipeline {
            resource: self.resource,
            tracer_provider,
            meter_provider,
            metric_reader,
            logger_provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryLogExporter, InMemoryMetricExporter, InMemorySpanExporter};
    use crate::{Context, KeyValue};

    #[tokio::test]
    async fn pipeline_routes_all_three_signals() {
        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();
        let logs = InMemoryLogExporter::default();

        let pipeline = TelemetryPipeline::builder()
            .with_resource(
                Resource::builder()
                    .with_service_name("gateway")
                    .with_deployment_environment("dev")
                    .build(),
            )
            .with_span_exporter(spans.clone())
            .with_metric_exporter(metrics.clone())
            .with_metric_interval(Duration::from_secs(3600))
            .with_log_exporter(logs.clone())
            .build();

        let cx = Context::new();
        let span = pipeline.tracer().start_span("request", &cx);
        let cx = cx.with_span(&span);
        pipeline
            .meter()
            .u64_counter("incoming.requests")
            .build()
            .add(1, &[KeyValue::new("route", "/")]);
        pipeline.logger().log(&cx, Severity::Info, "handled");
        span.end();

        pipeline.force_flush().await.unwrap();

        assert_eq!(spans.exported_spans().len(), 1);
        assert_eq!(logs.exported_records().len(), 1);
        assert_eq!(metrics.exported_batches().len(), 1);

        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn pipeline_without_exporters_discards_quietly() {
        let pipeline = TelemetryPipeline::builder().build();
        let span = pipeline.tracer().start_span("request", &Context::new());
        pipeline
            .logger()
            .log(&Context::new(), Severity::Info, "unrouted");
        span.end();
        pipeline.shutdown().await.unwrap();
    }
}
