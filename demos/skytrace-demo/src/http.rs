//! Shared HTTP plumbing: the serving loop, context propagation helpers and
//! response builders.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;

use skytrace::propagation::{HeaderExtractor, HeaderInjector, TraceContextPropagator};
use skytrace::Context;

/// A service's request handler.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one request. Body is already collected; infallible — errors
    /// are encoded as responses.
    async fn handle(&self, parts: http::request::Parts, body: Bytes) -> Response<Full<Bytes>>;
}

/// Accept connections on `listener` and dispatch to `handler` until the
/// process exits.
pub async fn serve<H: Handler>(listener: TcpListener, handler: Arc<H>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(
                    name: "serve.accept_failed",
                    error = %err,
                    "failed to accept connection"
                );
                continue;
            }
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let handler = handler.clone();
                async move {
                    let (parts, body) = req.into_parts();
                    let body = match body.collect().await {
                        Ok(collected) => collected.to_bytes(),
                        Err(err) => {
                            tracing::debug!(
                                name: "serve.body_read_failed",
                                error = %err,
                                "failed to read request body"
                            );
                            Bytes::new()
                        }
                    };
                    Ok::<_, Infallible>(handler.handle(parts, body).await)
                }
            });
            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(
                    name: "serve.connection_ended",
                    error = %err,
                    "connection ended with error"
                );
            }
        });
    }
}

/// Extract the caller's trace context from inbound request headers.
pub fn extract_context(parts: &http::request::Parts) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(&parts.headers))
}

/// Build outbound headers carrying `cx`'s active span identity.
///
/// Called before the outbound request is dispatched, while the span behind
/// `cx` is still open.
pub fn inject_headers(cx: &Context) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    TraceContextPropagator::new().inject_context(cx, &mut HeaderInjector(&mut headers));
    headers
}

/// Decode query parameters into a map (last occurrence wins).
pub fn query_params(parts: &http::request::Parts) -> HashMap<String, String> {
    parts
        .uri
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a `application/x-www-form-urlencoded` body into a map.
pub fn form_params(body: &Bytes) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// A plain-text response.
pub fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.into())));
    *response.status_mut() = status;
    response
}

/// A JSON response.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(encoded) => {
            let mut response = Response::new(Full::new(Bytes::from(encoded)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                "content-type",
                http::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(err) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode response: {err}"),
        ),
    }
}

/// An HTML response (always 200, the frontend's contract).
pub fn html_response(body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response.headers_mut().insert(
        "content-type",
        http::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}
