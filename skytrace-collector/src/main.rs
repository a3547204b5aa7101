use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skytrace_collector::config::CollectorConfig;
use skytrace_collector::ingest;
use skytrace_collector::pipeline::{Pipelines, SignalPipeline};
use skytrace_collector::retry::RetryPolicy;
use skytrace_collector::sinks::{
    DebugLogSink, DebugMetricSink, DebugTraceSink, LogBackendSink, PrometheusSink,
    PrometheusState, TraceBackendSink,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CollectorConfig::from_env()?;
    tracing::info!(
        name: "collector.starting",
        binary_listen = %config.binary_listen,
        http_listen = %config.http_listen,
        prometheus_listen = %config.prometheus_listen,
        trace_backend = %config.trace_backend,
        log_backend = %config.log_backend,
        "starting collector"
    );

    let prometheus = PrometheusState::new();

    let pipelines = Arc::new(Pipelines {
        traces: SignalPipeline::new("traces")
            .with_sink(
                TraceBackendSink::new(config.trace_backend.clone()),
                RetryPolicy::default(),
            )
            .with_sink(DebugTraceSink, RetryPolicy::default()),
        metrics: SignalPipeline::new("metrics")
            .with_sink(PrometheusSink::new(prometheus.clone()), RetryPolicy::default())
            .with_sink(DebugMetricSink, RetryPolicy::default()),
        logs: SignalPipeline::new("logs")
            .with_sink(
                LogBackendSink::new(config.log_backend.clone()),
                RetryPolicy::default(),
            )
            .with_sink(DebugLogSink, RetryPolicy::default()),
    });

    let binary_listener = TcpListener::bind(config.binary_listen).await?;
    let http_listener = TcpListener::bind(config.http_listen).await?;
    let prometheus_listener = TcpListener::bind(config.prometheus_listen).await?;

    tokio::spawn(ingest::run_binary_listener(
        binary_listener,
        pipelines.clone(),
    ));
    tokio::spawn(ingest::run_http_listener(http_listener, pipelines.clone()));
    tokio::spawn(prometheus.serve(prometheus_listener));

    tokio::signal::ctrl_c().await?;
    tracing::info!(name: "collector.stopping", "shutting down on interrupt");
    Ok(())
}
