//! Pull-based metrics sink: keeps the latest cumulative sums and serves
//! them in the Prometheus text exposition format.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use skytrace::export::ExportResult;
use skytrace_proto::{any_value, MetricsPayload};

use crate::pipeline::Sink;

/// One exposed series: metric name + label set.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    labels: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Registry {
    /// Help text per metric name.
    help: BTreeMap<String, String>,
    /// Latest cumulative value per series.
    series: BTreeMap<SeriesKey, u64>,
}

/// Shared state between the [`PrometheusSink`] (writer) and the scrape
/// endpoint (reader).
#[derive(Clone, Debug, Default)]
pub struct PrometheusState {
    registry: Arc<Mutex<Registry>>,
}

impl PrometheusState {
    /// Create empty state.
    pub fn new() -> Self {
        PrometheusState::default()
    }

    /// Record the latest cumulative sums from one payload. The collector is
    /// a relay, not a store: only the newest value per series is kept.
    pub fn record(&self, payload: &MetricsPayload) {
        let job = payload
            .resource
            .as_ref()
            .and_then(|resource| resource.service_name())
            .unwrap_or("unknown")
            .to_string();

        let mut registry = self.registry.lock().expect("metric registry poisoned");
        for metric in &payload.metrics {
            let name = sanitize_name(&metric.name);
            if !metric.description.is_empty() {
                registry
                    .help
                    .entry(name.clone())
                    .or_insert_with(|| metric.description.clone());
            }
            for point in &metric.points {
                let mut labels = vec![("job".to_string(), job.clone())];
                for kv in &point.attributes {
                    labels.push((sanitize_label(&kv.key), label_value(kv)));
                }
                labels.sort();
                registry.series.insert(
                    SeriesKey {
                        name: name.clone(),
                        labels,
                    },
                    point.value,
                );
            }
        }
    }

    /// Render the text exposition served on `/metrics`.
    pub fn render(&self) -> String {
        let registry = self.registry.lock().expect("metric registry poisoned");
        let mut out = String::new();
        let mut current_name: Option<&str> = None;

        for (key, value) in registry.series.iter() {
            if current_name != Some(key.name.as_str()) {
                current_name = Some(key.name.as_str());
                if let Some(help) = registry.help.get(&key.name) {
                    let _ = writeln!(out, "# HELP {} {}", key.name, escape_help(help));
                }
                let _ = writeln!(out, "# TYPE {} counter", key.name);
            }
            let labels = key
                .labels
                .iter()
                .map(|(name, value)| format!("{name}=\"{}\"", escape_label_value(value)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{}{{{labels}}} {value}", key.name);
        }
        out
    }

    /// Serve the scrape endpoint on `listener` until the process exits.
    pub async fn serve(self, listener: TcpListener) {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::warn!(
                        name: "prometheus.accept_failed",
                        error = %err,
                        "failed to accept scrape connection"
                    );
                    continue;
                }
            };
            let state = self.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(scrape_response(&state, &req)) }
                });
                if let Err(err) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    tracing::debug!(
                        name: "prometheus.connection_error",
                        error = %err,
                        "scrape connection ended with error"
                    );
                }
            });
        }
    }
}

fn scrape_response(state: &PrometheusState, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    if req.uri().path() != "/metrics" {
        let mut response = Response::new(Full::new(Bytes::from_static(b"not found")));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return response;
    }
    let body = state.render();
    Response::builder()
        .header("content-type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(body)))
        .expect("static response")
}

/// The sink side: feeds the shared state from delivered payloads.
#[derive(Debug)]
pub struct PrometheusSink {
    state: PrometheusState,
}

impl PrometheusSink {
    /// Create a sink writing to `state`.
    pub fn new(state: PrometheusState) -> Self {
        PrometheusSink { state }
    }
}

#[async_trait]
impl Sink<MetricsPayload> for PrometheusSink {
    fn name(&self) -> &'static str {
        "prometheus"
    }

    async fn deliver(&mut self, payload: &MetricsPayload) -> ExportResult {
        self.state.record(payload);
        Ok(())
    }
}

/// Counter metric names get the conventional `_total` suffix; characters
/// outside `[a-zA-Z0-9_:]` become underscores.
fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    if !sanitized.ends_with("_total") {
        sanitized.push_str("_total");
    }
    sanitized
}

fn sanitize_label(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

fn label_value(kv: &skytrace_proto::KeyValue) -> String {
    match kv.value.as_ref().and_then(|v| v.kind.as_ref()) {
        Some(any_value::Kind::StringValue(s)) => s.clone(),
        Some(any_value::Kind::BoolValue(b)) => b.to_string(),
        Some(any_value::Kind::IntValue(i)) => i.to_string(),
        Some(any_value::Kind::DoubleValue(d)) => d.to_string(),
        None => String::new(),
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use skytrace_proto::{AnyValue, KeyValue, MetricRecord, NumberDataPoint, Resource};

    fn payload(job: &str, value: u64) -> MetricsPayload {
        MetricsPayload {
            resource: Some(Resource {
                attributes: vec![KeyValue::new("service.name", AnyValue::string(job))],
            }),
            metrics: vec![MetricRecord {
                name: "iss.requests".into(),
                description: "the number of requests made to iss endpoint".into(),
                points: vec![NumberDataPoint {
                    attributes: vec![KeyValue::new("response.status", AnyValue::int(200))],
                    value,
                    time_unix_nano: 0,
                }],
            }],
        }
    }

    #[test]
    fn exposition_contains_help_type_and_series() {
        let state = PrometheusState::new();
        state.record(&payload("iss-distance-service", 7));

        let text = state.render();
        assert!(text.contains("# HELP iss_requests_total the number of requests made to iss endpoint"));
        assert!(text.contains("# TYPE iss_requests_total counter"));
        assert!(text.contains(
            "iss_requests_total{job=\"iss-distance-service\",response_status=\"200\"} 7"
        ));
    }

    #[test]
    fn newer_snapshot_replaces_older_value() {
        let state = PrometheusState::new();
        state.record(&payload("svc", 7));
        state.record(&payload("svc", 9));

        let text = state.render();
        assert!(text.contains("} 9"));
        assert!(!text.contains("} 7"));
    }

    #[test]
    fn different_jobs_keep_separate_series() {
        let state = PrometheusState::new();
        state.record(&payload("a", 1));
        state.record(&payload("b", 2));

        let text = state.render();
        assert!(text.contains("job=\"a\""));
        assert!(text.contains("job=\"b\""));
    }

    #[test]
    fn names_and_labels_are_sanitized() {
        assert_eq!(sanitize_name("incoming.requests"), "incoming_requests_total");
        assert_eq!(sanitize_name("0weird"), "_0weird_total");
        assert_eq!(sanitize_name("already_total"), "already_total");
        assert_eq!(sanitize_label("response.status"), "response_status");
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label_value("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
