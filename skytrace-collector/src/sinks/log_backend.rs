use async_trait::async_trait;

use skytrace::export::{ExportError, ExportResult};
use skytrace_proto::LogsPayload;

use crate::pipeline::Sink;

/// Path under the log backend's base URL accepting pushed payloads.
pub const LOG_PUSH_PATH: &str = "/skytrace/v1/logs";

/// Forwards log payloads to the log backend's push API as JSON, namespaced
/// under [`LOG_PUSH_PATH`].
#[derive(Debug)]
pub struct LogBackendSink {
    client: reqwest::Client,
    url: String,
}

impl LogBackendSink {
    /// Create a sink for the backend at `base_url`, e.g.
    /// `http://loki:3100`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        LogBackendSink {
            client: reqwest::Client::new(),
            url: format!("{}{}", base.trim_end_matches('/'), LOG_PUSH_PATH),
        }
    }
}

#[async_trait]
impl Sink<LogsPayload> for LogBackendSink {
    fn name(&self) -> &'static str {
        "log-backend"
    }

    async fn deliver(&mut self, payload: &LogsPayload) -> ExportResult {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|err| ExportError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExportError::Transport(format!(
                "log backend answered {status}"
            )))
        }
    }
}
