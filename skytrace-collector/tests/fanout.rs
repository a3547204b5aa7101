//! End-to-end collector tests: dual-transport ingestion, independent
//! fan-out, and retry-not-drop when a backend is down.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use skytrace_collector::pipeline::{Pipelines, SignalPipeline};
use skytrace_collector::retry::RetryPolicy;
use skytrace_collector::sinks::{LogBackendSink, PrometheusSink, PrometheusState, TraceBackendSink};
use skytrace_proto::framing::{self, Ack};
use skytrace_proto::{
    export_request, AnyValue, ExportRequest, KeyValue, LogRecord, LogsPayload, MetricRecord,
    MetricsPayload, NumberDataPoint, Resource, SpanRecord, StatusCode, TracesPayload,
};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay_ms: 5,
        max_delay_ms: 20,
        jitter_ms: 0,
    }
}

fn resource(service: &str) -> Resource {
    Resource {
        attributes: vec![KeyValue::new("service.name", AnyValue::string(service))],
    }
}

fn traces_payload(name: &str) -> TracesPayload {
    TracesPayload {
        resource: Some(resource("gateway")),
        spans: vec![SpanRecord {
            trace_id: "00000000000000000000000000000001".into(),
            span_id: "0000000000000002".into(),
            parent_span_id: String::new(),
            name: name.into(),
            start_time_unix_nano: 1,
            end_time_unix_nano: 2,
            status: StatusCode::Ok as i32,
            attributes: Vec::new(),
        }],
    }
}

fn logs_payload(body: &str) -> LogsPayload {
    LogsPayload {
        resource: Some(resource("gateway")),
        records: vec![LogRecord {
            time_unix_nano: 1,
            severity_number: 9,
            body: body.into(),
            trace_id: String::new(),
            span_id: String::new(),
            attributes: Vec::new(),
        }],
    }
}

fn metrics_payload(value: u64) -> MetricsPayload {
    MetricsPayload {
        resource: Some(resource("gateway")),
        metrics: vec![MetricRecord {
            name: "incoming.requests".into(),
            description: "the number of requests made to the service".into(),
            points: vec![NumberDataPoint {
                attributes: Vec::new(),
                value,
                time_unix_nano: 1,
            }],
        }],
    }
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// A stand-in trace backend speaking the framed binary protocol.
async fn spawn_frame_backend(listener: TcpListener) -> Arc<Mutex<Vec<ExportRequest>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let sink = sink.clone();
            tokio::spawn(async move {
                while let Ok(Some(request)) = framing::read_frame(&mut stream).await {
                    sink.lock().unwrap().push(request);
                    if framing::write_ack(&mut stream, Ack::Ok).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    received
}

/// A stand-in log backend capturing JSON pushes.
async fn spawn_log_backend() -> (String, Arc<Mutex<Vec<(String, Vec<u8>)>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = received.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let sink = sink.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let sink = sink.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        sink.lock().unwrap().push((path, body.to_vec()));
                        Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"ok"))))
                    }
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{addr}"), received)
}

#[tokio::test]
async fn http_ingestion_dispatches_and_allows_cross_origin() {
    let (log_backend_url, log_received) = spawn_log_backend().await;

    let pipelines = Arc::new(Pipelines {
        traces: SignalPipeline::new("traces"),
        metrics: SignalPipeline::new("metrics"),
        logs: SignalPipeline::new("logs")
            .with_sink(LogBackendSink::new(log_backend_url), fast_policy()),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(skytrace_collector::ingest::run_http_listener(
        listener, pipelines,
    ));

    let client = reqwest::Client::new();

    // Preflight.
    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/v1/logs"))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), 204);
    assert_eq!(
        preflight
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    // A valid payload is accepted and fanned out.
    let response = client
        .post(format!("http://{addr}/v1/logs"))
        .json(&logs_payload("hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    wait_for(|| !log_received.lock().unwrap().is_empty()).await;
    {
        let received = log_received.lock().unwrap();
        assert_eq!(received[0].0, "/skytrace/v1/logs");
        let payload: LogsPayload = serde_json::from_slice(&received[0].1).unwrap();
        assert_eq!(payload.records[0].body, "hello");
    }

    // Garbage is rejected without killing the listener.
    let bad = client
        .post(format!("http://{addr}/v1/traces"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);

    let wrong_path = client
        .post(format!("http://{addr}/v1/profiles"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_path.status(), 404);

    let wrong_method = client
        .get(format!("http://{addr}/v1/logs"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 405);
}

#[tokio::test]
async fn binary_ingestion_reaches_the_trace_backend() {
    let backend_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_addr = backend_listener.local_addr().unwrap();
    let backend_received = spawn_frame_backend(backend_listener).await;

    let pipelines = Arc::new(Pipelines {
        traces: SignalPipeline::new("traces").with_sink(
            TraceBackendSink::new(backend_addr.to_string()),
            fast_policy(),
        ),
        metrics: SignalPipeline::new("metrics"),
        logs: SignalPipeline::new("logs"),
    });

    let ingest_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ingest_addr = ingest_listener.local_addr().unwrap();
    tokio::spawn(skytrace_collector::ingest::run_binary_listener(
        ingest_listener,
        pipelines,
    ));

    let mut producer = TcpStream::connect(ingest_addr).await.unwrap();
    let request = ExportRequest {
        payload: Some(export_request::Payload::Traces(traces_payload("relayed"))),
    };
    framing::write_frame(&mut producer, &request).await.unwrap();
    assert_eq!(framing::read_ack(&mut producer).await.unwrap(), Ack::Ok);

    wait_for(|| !backend_received.lock().unwrap().is_empty()).await;
    let received = backend_received.lock().unwrap();
    match &received[0].payload {
        Some(export_request::Payload::Traces(payload)) => {
            assert_eq!(payload.spans[0].name, "relayed");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn dead_trace_backend_does_not_affect_logs_and_metrics() {
    // Reserve a port for the trace backend, then close it so connections
    // fail until the backend "comes up" later.
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let trace_backend_addr = reserved.local_addr().unwrap();
    drop(reserved);

    let (log_backend_url, log_received) = spawn_log_backend().await;
    let prometheus = PrometheusState::new();

    let pipelines = Arc::new(Pipelines {
        traces: SignalPipeline::new("traces").with_sink(
            TraceBackendSink::new(trace_backend_addr.to_string()),
            fast_policy(),
        ),
        metrics: SignalPipeline::new("metrics")
            .with_sink(PrometheusSink::new(prometheus.clone()), fast_policy()),
        logs: SignalPipeline::new("logs")
            .with_sink(LogBackendSink::new(log_backend_url), fast_policy()),
    });

    pipelines.dispatch_request(ExportRequest {
        payload: Some(export_request::Payload::Traces(traces_payload("stuck"))),
    });
    pipelines.dispatch_request(ExportRequest {
        payload: Some(export_request::Payload::Logs(logs_payload("still flowing"))),
    });
    pipelines.dispatch_request(ExportRequest {
        payload: Some(export_request::Payload::Metrics(metrics_payload(3))),
    });

    // Logs and metrics deliver while the trace backend is down.
    wait_for(|| !log_received.lock().unwrap().is_empty()).await;
    wait_for(|| prometheus.render().contains("incoming_requests_total")).await;

    // Bring the trace backend up on the reserved address: the payload was
    // being retried, not dropped, so it arrives now.
    let backend_listener = TcpListener::bind(trace_backend_addr).await.unwrap();
    let backend_received = spawn_frame_backend(backend_listener).await;

    wait_for(|| !backend_received.lock().unwrap().is_empty()).await;
    let received = backend_received.lock().unwrap();
    match &received[0].payload {
        Some(export_request::Payload::Traces(payload)) => {
            assert_eq!(payload.spans[0].name, "stuck");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn scrape_endpoint_serves_recorded_series() {
    let prometheus = PrometheusState::new();
    prometheus.record(&metrics_payload(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(prometheus.clone().serve(listener));

    let body = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("# TYPE incoming_requests_total counter"));
    assert!(body.contains("incoming_requests_total{job=\"gateway\"} 5"));

    let missing = reqwest::get(format!("http://{addr}/other")).await.unwrap();
    assert_eq!(missing.status(), 404);
}
