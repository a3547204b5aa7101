//! The always-on console sink: decodes payloads back into SDK types and
//! prints them with the stdout exporters.

use async_trait::async_trait;

use skytrace::export::{
    ExportResult, LogExporter as _, MetricExporter as _, SpanExporter as _,
};
use skytrace::Resource;
use skytrace_proto::{LogsPayload, MetricsPayload, TracesPayload};

use crate::pipeline::Sink;

fn payload_resource(resource: Option<&skytrace_proto::Resource>) -> Resource {
    resource.map(Resource::from).unwrap_or_default()
}

/// Prints every trace payload to stdout.
#[derive(Debug, Default)]
pub struct DebugTraceSink;

#[async_trait]
impl Sink<TracesPayload> for DebugTraceSink {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn deliver(&mut self, payload: &TracesPayload) -> ExportResult {
        let mut spans = Vec::with_capacity(payload.spans.len());
        for record in &payload.spans {
            match skytrace::trace::SpanData::try_from(record) {
                Ok(span) => spans.push(span),
                Err(err) => tracing::warn!(
                    name: "debug_sink.bad_span",
                    error = %err,
                    "skipping span that does not decode"
                ),
            }
        }
        // A fresh exporter per payload: each producer's resource header is
        // printed with its own batch.
        let mut exporter = skytrace_stdout::SpanExporter::default();
        exporter.set_resource(&payload_resource(payload.resource.as_ref()));
        exporter.export(spans).await
    }
}

/// Prints every metrics payload to stdout.
#[derive(Debug, Default)]
pub struct DebugMetricSink;

#[async_trait]
impl Sink<MetricsPayload> for DebugMetricSink {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn deliver(&mut self, payload: &MetricsPayload) -> ExportResult {
        let batch = payload
            .metrics
            .iter()
            .map(skytrace::metrics::MetricData::from)
            .collect();
        let mut exporter = skytrace_stdout::MetricExporter::default();
        exporter.set_resource(&payload_resource(payload.resource.as_ref()));
        exporter.export(batch).await
    }
}

/// Prints every logs payload to stdout.
#[derive(Debug, Default)]
pub struct DebugLogSink;

#[async_trait]
impl Sink<LogsPayload> for DebugLogSink {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn deliver(&mut self, payload: &LogsPayload) -> ExportResult {
        let mut records = Vec::with_capacity(payload.records.len());
        for record in &payload.records {
            match skytrace::logs::LogRecord::try_from(record) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(
                    name: "debug_sink.bad_log_record",
                    error = %err,
                    "skipping log record that does not decode"
                ),
            }
        }
        let mut exporter = skytrace_stdout::LogExporter::default();
        exporter.set_resource(&payload_resource(payload.resource.as_ref()));
        exporter.export(records).await
    }
}
