//! Telemetry core for the skytrace pipeline.
//!
//! This crate provides the building blocks instrumented services use to
//! produce signals:
//!
//! - [`trace`]: spans, tracers and span processors
//! - [`metrics`]: monotonic counters with attribute-keyed sub-totals
//! - [`logs`]: severity-filtered log records with trace correlation
//! - [`propagation`]: `traceparent` header injection/extraction
//!
//! There is no global state. An explicit [`Context`] carries the active
//! span identity through call chains, and providers are owned by a
//! [`TelemetryPipeline`] that the embedding binary constructs before it
//! starts serving and shuts down (flushing all signals) when it stops:
//!
//! ```no_run
//! use skytrace::{logs::Severity, Context, KeyValue, Resource, TelemetryPipeline};
//!
//! # async fn run() {
//! let resource = Resource::builder()
//!     .with_service_name("iss-distance-service")
//!     .with_deployment_environment("dev")
//!     .build();
//! let pipeline = TelemetryPipeline::builder()
//!     .with_resource(resource)
//!     .build();
//!
//! let tracer = pipeline.tracer();
//! let cx = Context::new();
//! let mut span = tracer.start_span("handle-request", &cx);
//! span.set_attribute(KeyValue::new("http.route", "/"));
//! let cx = cx.with_span(&span);
//! pipeline.logger().log(&cx, Severity::Info, "handling request");
//! span.end();
//!
//! pipeline.shutdown().await.unwrap();
//! # }
//! ```

mod common;
mod context;
mod pipeline;
mod resource;

pub mod export;
pub mod logs;
pub mod metrics;
pub mod propagation;
pub mod trace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use common::{Key, KeyValue, Value};
pub use context::Context;
pub use pipeline::{TelemetryPipeline, TelemetryPipelineBuilder};
pub use resource::{Resource, ResourceBuilder, DEPLOYMENT_ENVIRONMENT, SERVICE_NAME};
