//! Telemetry pipeline wiring for the demo binaries.

use skytrace::{Resource, TelemetryPipeline};
use skytrace_exporter::{HttpLogExporter, HttpMetricExporter, HttpSpanExporter};

use crate::config;

/// Build the pipeline for one service.
///
/// With a collector endpoint configured, all three signal types ship to it
/// over the HTTP transport. Without one the service still produces
/// telemetry, printed to stdout — handy when running a single service
/// outside the composed stack.
///
/// Must be called within a Tokio runtime, before request handling starts.
pub fn init_pipeline(service_name: &'static str) -> TelemetryPipeline {
    let resource = Resource::builder()
        .with_service_name(service_name)
        .with_deployment_environment(config::with_default(config::SKYTRACE_ENVIRONMENT, "dev"))
        .build();

    let builder = TelemetryPipeline::builder().with_resource(resource);
    match config::optional(config::SKYTRACE_COLLECTOR_ENDPOINT) {
        Some(endpoint) => builder
            .with_span_exporter(HttpSpanExporter::new(endpoint.clone()))
            .with_metric_exporter(HttpMetricExporter::new(endpoint.clone()))
            .with_log_exporter(HttpLogExporter::new(endpoint)),
        None => builder
            .with_span_exporter(skytrace_stdout::SpanExporter::default())
            .with_metric_exporter(skytrace_stdout::MetricExporter::default())
            .with_log_exporter(skytrace_stdout::LogExporter::default()),
    }
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_carries_service_identity() {
        temp_env::with_vars_unset(
            [config::SKYTRACE_COLLECTOR_ENDPOINT, config::SKYTRACE_ENVIRONMENT],
            || {
                let runtime = tokio::runtime::Runtime::new().unwrap();
                runtime.block_on(async {
                    let pipeline = init_pipeline("gateway");
                    assert_eq!(
                        pipeline.resource().service_name().as_deref(),
                        Some("gateway")
                    );
                    assert_eq!(
                        pipeline
                            .resource()
                            .get(skytrace::DEPLOYMENT_ENVIRONMENT)
                            .map(|v| v.to_string())
                            .as_deref(),
                        Some("dev")
                    );
                    pipeline.shutdown().await.unwrap();
                });
            },
        );
    }
}
