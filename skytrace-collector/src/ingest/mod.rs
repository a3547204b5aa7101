//! The two concurrently available ingestion transports.

mod binary;
mod http;

pub use binary::run_binary_listener;
pub use http::run_http_listener;
