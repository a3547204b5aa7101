//! The four demo services: a frontend relaying through a gateway to a
//! geolocator and an ISS-distance lookup, every hop instrumented with the
//! skytrace pipeline and linked into one trace per user request.
//!
//! Each service is a small hyper server around one handler struct. The
//! handler extracts the inbound trace context, opens its server span,
//! counts the request, threads an explicit [`skytrace::Context`] through
//! its helpers, and injects `traceparent` into every outbound call.

pub mod config;
pub mod distance;
pub mod frontend;
pub mod gateway;
pub mod geo;
pub mod http;
pub mod iss;
pub mod telemetry;

use thiserror::Error;

/// Failures inside the demo services.
///
/// None of these are fatal to a process: configuration errors abort
/// startup in `main`, everything else degrades to a logged fallback or a
/// 4xx response.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An outbound request could not be completed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// An upstream answered with a non-success status.
    #[error("upstream answered {0}")]
    UpstreamStatus(u16),

    /// An upstream answered 200 with a body we cannot use.
    #[error("upstream payload malformed: {0}")]
    MalformedUpstream(String),

    /// A required environment variable is missing.
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
}
