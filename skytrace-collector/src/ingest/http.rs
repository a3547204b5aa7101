//! Text/HTTP ingestion: JSON payloads on `/v1/{traces,metrics,logs}`, with
//! permissive cross-origin access so browser-based producers can post
//! directly.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use skytrace_proto::{export_request, ExportRequest};

use crate::pipeline::Pipelines;

/// Accept HTTP producers on `listener` until the process exits.
pub async fn run_http_listener(listener: TcpListener, pipelines: Arc<Pipelines>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(
                    name: "ingest.http_accept_failed",
                    error = %err,
                    "failed to accept producer connection"
                );
                continue;
            }
        };
        let pipelines = pipelines.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let pipelines = pipelines.clone();
                async move { Ok::<_, Infallible>(handle_request(req, &pipelines).await) }
            });
            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(
                    name: "ingest.http_connection_ended",
                    error = %err,
                    "producer connection ended with error"
                );
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    pipelines: &Pipelines,
) -> Response<Full<Bytes>> {
    if req.method() == Method::OPTIONS {
        return cors(preflight_response());
    }

    let path = req.uri().path().to_string();
    if req.method() != Method::POST {
        return cors(status_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "only POST is accepted",
        ));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return cors(status_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to read body: {err}"),
            ))
        }
    };

    let request = match path.as_str() {
        "/v1/traces" => serde_json::from_slice(&body).map(|payload| ExportRequest {
            payload: Some(export_request::Payload::Traces(payload)),
        }),
        "/v1/metrics" => serde_json::from_slice(&body).map(|payload| ExportRequest {
            payload: Some(export_request::Payload::Metrics(payload)),
        }),
        "/v1/logs" => serde_json::from_slice(&body).map(|payload| ExportRequest {
            payload: Some(export_request::Payload::Logs(payload)),
        }),
        _ => return cors(status_response(StatusCode::NOT_FOUND, "unknown signal path")),
    };

    match request {
        Ok(request) => {
            pipelines.dispatch_request(request);
            cors(status_response(StatusCode::OK, "{}"))
        }
        Err(err) => {
            tracing::debug!(
                name: "ingest.http_bad_payload",
                path = %path,
                error = %err,
                "rejecting payload that does not decode"
            );
            cors(status_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid payload: {err}"),
            ))
        }
    }
}

fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-methods",
        http::HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        http::HeaderValue::from_static("content-type"),
    );
    response
}

fn status_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
}

fn cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    response.headers_mut().insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );
    response
}
