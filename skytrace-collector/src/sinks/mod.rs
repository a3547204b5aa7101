//! Delivery targets for the fan-out stage.

mod debug;
mod log_backend;
mod prometheus;
mod trace_backend;

pub use debug::{DebugLogSink, DebugMetricSink, DebugTraceSink};
pub use log_backend::LogBackendSink;
pub use prometheus::{PrometheusSink, PrometheusState};
pub use trace_backend::TraceBackendSink;
