//! The gateway: relays a location query to the geolocator, feeds the
//! resolved coordinates to the ISS distance service, and returns the
//! distance to the caller. Trace context is injected into both outbound
//! hops, so the whole relay shows up as one trace.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use skytrace::logs::{Logger, Severity};
use skytrace::metrics::Counter;
use skytrace::trace::{Status, Tracer};
use skytrace::{Context, KeyValue, TelemetryPipeline};

use crate::distance::Coordinates;
use crate::http::{extract_context, inject_headers, query_params, text_response, Handler};
use crate::iss::DistanceResponse;
use crate::ServiceError;

/// Handler state of the gateway.
pub struct Gateway {
    pipeline: TelemetryPipeline,
    tracer: Tracer,
    logger: Logger,
    incoming_requests: Counter,
    client: reqwest::Client,
    geolocator_url: String,
    iss_distance_url: String,
}

enum Relay {
    /// The chain succeeded; pass the distance response through.
    Success(DistanceResponse),
    /// A downstream answered non-success; relay its status and body.
    Downstream(StatusCode, String),
}

impl Gateway {
    /// Wire the handler onto a pipeline and the two downstream base URLs.
    pub fn new(
        pipeline: TelemetryPipeline,
        geolocator_url: String,
        iss_distance_url: String,
    ) -> std::sync::Arc<Self> {
        let incoming_requests = pipeline
            .meter()
            .u64_counter("incoming.requests")
            .with_description("the number of requests made to the service")
            .build();

        std::sync::Arc::new(Gateway {
            tracer: pipeline.tracer(),
            logger: pipeline.logger(),
            incoming_requests,
            pipeline,
            client: reqwest::Client::new(),
            geolocator_url,
            iss_distance_url,
        })
    }

    /// The owned pipeline, for flushing and shutdown.
    pub fn pipeline(&self) -> &TelemetryPipeline {
        &self.pipeline
    }

    async fn relay(&self, cx: &Context, location: &str) -> Result<Relay, ServiceError> {
        let response = self
            .client
            .get(&self.geolocator_url)
            .headers(inject_headers(cx))
            .query(&[("location", location)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(Relay::Downstream(status, response.text().await?));
        }
        let coordinates: Coordinates = response.json().await?;

        let response = self
            .client
            .get(&self.iss_distance_url)
            .headers(inject_headers(cx))
            .query(&[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(Relay::Downstream(status, response.text().await?));
        }

        Ok(Relay::Success(response.json().await?))
    }
}

#[async_trait]
impl Handler for Gateway {
    async fn handle(&self, parts: http::request::Parts, _body: Bytes) -> Response<Full<Bytes>> {
        let parent_cx = extract_context(&parts);
        let mut span = self.tracer.start_span("gateway-request", &parent_cx);
        let cx = parent_cx.with_span(&span);
        self.incoming_requests.add(1, &[]);

        let params = query_params(&parts);
        let Some(location) = params.get("location").filter(|v| !v.is_empty()) else {
            self.logger.log(&cx, Severity::Warn, "No location given");
            span.set_status(Status::Error);
            span.end();
            return text_response(StatusCode::BAD_REQUEST, "No location given");
        };

        match self.relay(&cx, location).await {
            Ok(Relay::Success(distance)) => {
                span.end();
                crate::http::json_response(StatusCode::OK, &distance)
            }
            Ok(Relay::Downstream(status, body)) => {
                self.logger.log(
                    &cx,
                    Severity::Warn,
                    format!("downstream answered {status} for location {location:?}"),
                );
                span.set_attribute(KeyValue::new("response.status", status.as_u16()));
                span.set_status(Status::Error);
                span.end();
                text_response(status, body)
            }
            Err(err) => {
                self.logger
                    .log(&cx, Severity::Error, format!("relay failed: {err}"));
                span.set_attribute(KeyValue::new("error.detail", err.to_string()));
                span.set_status(Status::Error);
                span.end();
                text_response(StatusCode::BAD_GATEWAY, "upstream services unavailable")
            }
        }
    }
}
