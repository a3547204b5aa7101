//! Exporters shipping signals from an instrumented service to a skytrace
//! collector over the text/HTTP transport.
//!
//! Each exporter POSTs the JSON encoding of its payload to
//! `<endpoint>/v1/{traces,metrics,logs}`. A failed export is reported back
//! to the owning processor, which logs and drops — the serving path of the
//! instrumented process is never blocked or failed by telemetry delivery.

use async_trait::async_trait;
use serde::Serialize;

use skytrace::export::{ExportError, ExportResult, LogExporter, MetricExporter, SpanExporter};
use skytrace::logs::LogRecord;
use skytrace::metrics::MetricData;
use skytrace::trace::SpanData;
use skytrace::Resource;
use skytrace_proto::transform;

/// Default collector ingestion endpoint (text/HTTP transport).
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://localhost:4318";

#[derive(Clone, Debug)]
struct HttpSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSender {
    fn new(endpoint: impl Into<String>) -> Self {
        HttpSender {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> ExportResult {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| ExportError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExportError::Transport(format!(
                "collector answered {status} for {url}"
            )))
        }
    }
}

/// Ships finalized spans to the collector's `/v1/traces` route.
#[derive(Clone, Debug)]
pub struct HttpSpanExporter {
    sender: HttpSender,
    resource: Resource,
}

impl HttpSpanExporter {
    /// Create an exporter targeting the given collector endpoint, e.g.
    /// `http://localhost:4318`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpSpanExporter {
            sender: HttpSender::new(endpoint),
            resource: Resource::empty(),
        }
    }
}

#[async_trait]
impl SpanExporter for HttpSpanExporter {
    async fn export(&mut self, batch: Vec<SpanData>) -> ExportResult {
        let payload = transform::traces_payload(&self.resource, &batch);
        self.sender.post_json("/v1/traces", &payload).await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

/// Ships log records to the collector's `/v1/logs` route.
#[derive(Clone, Debug)]
pub struct HttpLogExporter {
    sender: HttpSender,
    resource: Resource,
}

impl HttpLogExporter {
    /// Create an exporter targeting the given collector endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpLogExporter {
            sender: HttpSender::new(endpoint),
            resource: Resource::empty(),
        }
    }
}

#[async_trait]
impl LogExporter for HttpLogExporter {
    async fn export(&mut self, batch: Vec<LogRecord>) -> ExportResult {
        let payload = transform::logs_payload(&self.resource, &batch);
        self.sender.post_json("/v1/logs", &payload).await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

/// Ships counter snapshots to the collector's `/v1/metrics` route.
#[derive(Clone, Debug)]
pub struct HttpMetricExporter {
    sender: HttpSender,
    resource: Resource,
}

impl HttpMetricExporter {
    /// Create an exporter targeting the given collector endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpMetricExporter {
            sender: HttpSender::new(endpoint),
            resource: Resource::empty(),
        }
    }
}

#[async_trait]
impl MetricExporter for HttpMetricExporter {
    async fn export(&mut self, batch: Vec<MetricData>) -> ExportResult {
        let payload = transform::metrics_payload(&self.resource, &batch);
        self.sender.post_json("/v1/metrics", &payload).await
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;
    use tokio::net::TcpListener;

    type Captured = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    /// Minimal collector stand-in: capture every POST, answer 200.
    async fn spawn_capture_server() -> (String, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));

        let requests = captured.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let requests = requests.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        async move {
                            let path = req.uri().path().to_string();
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            requests.lock().unwrap().push((path, body.to_vec()));
                            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(
                                b"{}",
                            ))))
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn span_exporter_posts_traces_payload() {
        let (endpoint, captured) = spawn_capture_server().await;
        let mut exporter = HttpSpanExporter::new(endpoint);
        exporter.set_resource(
            &Resource::builder()
                .with_service_name("gateway")
                .build(),
        );

        let span = SpanData {
            span_context: skytrace::trace::SpanContext::new(
                skytrace::trace::TraceId::from(1u128),
                skytrace::trace::SpanId::from(2u64),
                skytrace::trace::TraceFlags::SAMPLED,
                false,
            ),
            parent_span_id: skytrace::trace::SpanId::INVALID,
            name: "request".into(),
            start_time: SystemTime::now(),
            end_time: SystemTime::now(),
            status: skytrace::trace::Status::Ok,
            attributes: Vec::new(),
        };
        exporter.export(vec![span]).await.unwrap();

        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "/v1/traces");
        let payload: skytrace_proto::TracesPayload =
            serde_json::from_slice(&requests[0].1).unwrap();
        assert_eq!(
            payload.resource.unwrap().service_name(),
            Some("gateway")
        );
        assert_eq!(payload.spans.len(), 1);
        assert_eq!(payload.spans[0].name, "request");
    }

    #[tokio::test]
    async fn log_exporter_posts_logs_payload() {
        let (endpoint, captured) = spawn_capture_server().await;
        let mut exporter = HttpLogExporter::new(format!("{endpoint}/"));

        exporter
            .export(vec![LogRecord::new(
                skytrace::logs::Severity::Warn,
                "No location given",
            )])
            .await
            .unwrap();

        let requests = captured.lock().unwrap();
        assert_eq!(requests[0].0, "/v1/logs");
        let payload: skytrace_proto::LogsPayload = serde_json::from_slice(&requests[0].1).unwrap();
        assert_eq!(payload.records[0].body, "No location given");
        assert_eq!(payload.records[0].severity_number, 13);
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_transport_error() {
        // Port 9 (discard) is not listening.
        let mut exporter = HttpMetricExporter::new("http://127.0.0.1:9");
        let result = exporter
            .export(vec![MetricData {
                name: "incoming.requests".into(),
                description: "".into(),
                points: Vec::new(),
            }])
            .await;
        assert!(matches!(result, Err(ExportError::Transport(_))));
    }
}
