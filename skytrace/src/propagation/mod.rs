//! Carrying trace identity across network hops.
//!
//! The [`TraceContextPropagator`] serializes the active span context into
//! the `traceparent` request header and parses it back on the receiving
//! side. Absent or malformed headers extract to an empty [`Context`] — an
//! uninstrumented caller never breaks an instrumented callee, the request
//! simply starts a new root trace.
//!
//! [`Context`]: crate::Context

mod trace_context;

pub use trace_context::{TraceContextPropagator, TRACEPARENT_HEADER};

use std::collections::HashMap;

/// Injects string values into a carrier (typically outbound request headers).
pub trait Injector {
    /// Set a key and value on the carrier.
    fn set(&mut self, key: &str, value: String);
}

/// Extracts string values from a carrier (typically inbound request headers).
pub trait Extractor {
    /// Get the value for a key, if present.
    fn get(&self, key: &str) -> Option<&str>;

    /// All keys present on the carrier.
    fn keys(&self) -> Vec<&str>;
}

impl Injector for HashMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl Extractor for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect()
    }
}

/// Helper for injecting the trace identity into HTTP request headers.
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the header map. Does nothing if the key or
    /// value are not valid header inputs.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = http::header::HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Helper for extracting the trace identity from HTTP request headers.
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the header map. Non-ASCII values read as
    /// absent.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}
