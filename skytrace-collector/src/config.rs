//! Environment-driven collector configuration.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

/// Listen address for the binary/streaming transport.
pub const SKYTRACE_BINARY_LISTEN: &str = "SKYTRACE_BINARY_LISTEN";
/// Listen address for the text/HTTP transport.
pub const SKYTRACE_HTTP_LISTEN: &str = "SKYTRACE_HTTP_LISTEN";
/// Listen address for the Prometheus-style scrape endpoint.
pub const SKYTRACE_PROMETHEUS_LISTEN: &str = "SKYTRACE_PROMETHEUS_LISTEN";
/// `host:port` of the trace backend (binary transport, no transport security).
pub const SKYTRACE_TRACE_BACKEND: &str = "SKYTRACE_TRACE_BACKEND";
/// Base URL of the log backend's push API.
pub const SKYTRACE_LOG_BACKEND: &str = "SKYTRACE_LOG_BACKEND";

const DEFAULT_BINARY_LISTEN: &str = "0.0.0.0:4317";
const DEFAULT_HTTP_LISTEN: &str = "0.0.0.0:4318";
const DEFAULT_PROMETHEUS_LISTEN: &str = "0.0.0.0:8889";
const DEFAULT_TRACE_BACKEND: &str = "127.0.0.1:4321";
const DEFAULT_LOG_BACKEND: &str = "http://127.0.0.1:3100";

/// Errors from resolving the collector configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An address variable did not parse as `host:port`.
    #[error("invalid listen address in {variable}: {value:?}")]
    InvalidAddress {
        /// The offending environment variable.
        variable: &'static str,
        /// Its unparsable value.
        value: String,
    },
}

/// Resolved collector configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Bind address of the binary/streaming ingestion transport.
    pub binary_listen: SocketAddr,
    /// Bind address of the text/HTTP ingestion transport.
    pub http_listen: SocketAddr,
    /// Bind address of the metrics scrape endpoint.
    pub prometheus_listen: SocketAddr,
    /// `host:port` of the trace backend.
    pub trace_backend: String,
    /// Base URL of the log backend.
    pub log_backend: String,
}

impl CollectorConfig {
    /// Resolve the configuration from the environment, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(CollectorConfig {
            binary_listen: addr_var(SKYTRACE_BINARY_LISTEN, DEFAULT_BINARY_LISTEN)?,
            http_listen: addr_var(SKYTRACE_HTTP_LISTEN, DEFAULT_HTTP_LISTEN)?,
            prometheus_listen: addr_var(SKYTRACE_PROMETHEUS_LISTEN, DEFAULT_PROMETHEUS_LISTEN)?,
            trace_backend: env::var(SKYTRACE_TRACE_BACKEND)
                .unwrap_or_else(|_| DEFAULT_TRACE_BACKEND.to_string()),
            log_backend: env::var(SKYTRACE_LOG_BACKEND)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_LOG_BACKEND.to_string()),
        })
    }
}

fn addr_var(variable: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let value = env::var(variable).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        variable,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        temp_env::with_vars_unset(
            [
                SKYTRACE_BINARY_LISTEN,
                SKYTRACE_HTTP_LISTEN,
                SKYTRACE_PROMETHEUS_LISTEN,
                SKYTRACE_TRACE_BACKEND,
                SKYTRACE_LOG_BACKEND,
            ],
            || {
                let config = CollectorConfig::from_env().unwrap();
                assert_eq!(config.binary_listen.port(), 4317);
                assert_eq!(config.http_listen.port(), 4318);
                assert_eq!(config.prometheus_listen.port(), 8889);
                assert_eq!(config.trace_backend, "127.0.0.1:4321");
                assert_eq!(config.log_backend, "http://127.0.0.1:3100");
            },
        );
    }

    #[test]
    fn environment_overrides_defaults() {
        temp_env::with_vars(
            [
                (SKYTRACE_BINARY_LISTEN, Some("127.0.0.1:9999")),
                (SKYTRACE_LOG_BACKEND, Some("http://loki:3100/")),
            ],
            || {
                let config = CollectorConfig::from_env().unwrap();
                assert_eq!(config.binary_listen.port(), 9999);
                // Trailing slash is normalized away.
                assert_eq!(config.log_backend, "http://loki:3100");
            },
        );
    }

    #[test]
    fn invalid_address_is_an_error() {
        temp_env::with_var(SKYTRACE_HTTP_LISTEN, Some("not-an-addr"), || {
            assert!(matches!(
                CollectorConfig::from_env(),
                Err(ConfigError::InvalidAddress {
                    variable: SKYTRACE_HTTP_LISTEN,
                    ..
                })
            ));
        });
    }
}
