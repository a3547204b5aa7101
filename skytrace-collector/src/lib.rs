//! The skytrace collector.
//!
//! A pure forwarding process: it accepts signal payloads over two
//! concurrently available transports (length-prefixed binary frames on one
//! port, JSON over HTTP with permissive CORS on another), runs them through
//! an — in this configuration empty — processor stage, and fans each signal
//! type out to its configured sinks:
//!
//! | signal  | primary sink                              | secondary |
//! |---------|-------------------------------------------|-----------|
//! | traces  | trace backend over the binary transport   | stdout    |
//! | metrics | Prometheus-style pull endpoint            | stdout    |
//! | logs    | log backend over HTTP, path-namespaced    | stdout    |
//!
//! Every sink owns its queue, its delivery task and its retry state.
//! A dead backend stalls only its own queue: ingestion and the other
//! sinks keep going, and delivery to the dead backend is retried with
//! exponential backoff instead of being dropped.

pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod retry;
pub mod sinks;

pub use config::{CollectorConfig, ConfigError};
pub use pipeline::{Pipelines, Processor, SignalPipeline};
