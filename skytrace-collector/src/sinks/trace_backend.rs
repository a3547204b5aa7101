use async_trait::async_trait;
use tokio::net::TcpStream;

use skytrace::export::{ExportError, ExportResult};
use skytrace_proto::framing::{self, Ack};
use skytrace_proto::{export_request, ExportRequest, TracesPayload};

use crate::pipeline::Sink;

/// Forwards trace payloads to the trace backend over the binary transport
/// (plain TCP, no transport security), reconnecting on failure.
#[derive(Debug)]
pub struct TraceBackendSink {
    addr: String,
    stream: Option<TcpStream>,
}

impl TraceBackendSink {
    /// Create a sink for the backend at `addr` (`host:port`). The
    /// connection is established lazily on first delivery.
    pub fn new(addr: impl Into<String>) -> Self {
        TraceBackendSink {
            addr: addr.into(),
            stream: None,
        }
    }

    async fn send(&mut self, request: &ExportRequest) -> Result<(), ExportError> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|err| ExportError::Transport(format!("{}: {err}", self.addr)))?;
            self.stream = Some(stream);
        }
        // Just connected or reusing; either way present here.
        let stream = self.stream.as_mut().expect("connection established above");

        let result = async {
            framing::write_frame(stream, request).await?;
            framing::read_ack(stream).await
        }
        .await;

        match result {
            Ok(Ack::Ok) => Ok(()),
            Ok(Ack::Error) => {
                // The backend saw the frame and said no; the connection is
                // still usable.
                Err(ExportError::Transport(format!(
                    "{} rejected the payload",
                    self.addr
                )))
            }
            Err(err) => {
                self.stream = None;
                Err(ExportError::Transport(format!("{}: {err}", self.addr)))
            }
        }
    }
}

#[async_trait]
impl Sink<TracesPayload> for TraceBackendSink {
    fn name(&self) -> &'static str {
        "trace-backend"
    }

    async fn deliver(&mut self, payload: &TracesPayload) -> ExportResult {
        let request = ExportRequest {
            payload: Some(export_request::Payload::Traces(payload.clone())),
        };
        self.send(&request).await
    }
}
