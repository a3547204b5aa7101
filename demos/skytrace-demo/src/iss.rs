//! The ISS distance service: given a latitude/longitude, answers with the
//! great-circle distance to the current ISS position.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use skytrace::logs::{Logger, Severity};
use skytrace::metrics::Counter;
use skytrace::trace::{Status, Tracer};
use skytrace::{Context, KeyValue, TelemetryPipeline};

use crate::distance::{self, Coordinates};
use crate::http::{extract_context, json_response, query_params, text_response, Handler};
use crate::ServiceError;

/// Response body of a successful distance lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct DistanceResponse {
    /// Great-circle distance in kilometres.
    pub distance: f64,
    /// The ISS position the distance was computed against.
    pub location: Coordinates,
}

#[derive(Debug, Deserialize)]
struct IssNowResponse {
    iss_position: Option<IssPosition>,
}

#[derive(Debug, Deserialize)]
struct IssPosition {
    // The upstream API serializes coordinates as strings.
    latitude: String,
    longitude: String,
}

/// Handler state of the ISS distance service.
pub struct IssDistanceService {
    pipeline: TelemetryPipeline,
    tracer: Tracer,
    logger: Logger,
    incoming_requests: Counter,
    iss_requests: Counter,
    client: reqwest::Client,
    iss_api_url: String,
}

impl IssDistanceService {
    /// Wire the handler onto a pipeline and the ISS API endpoint.
    pub fn new(pipeline: TelemetryPipeline, iss_api_url: String) -> std::sync::Arc<Self> {
        let meter = pipeline.meter();
        let incoming_requests = meter
            .u64_counter("incoming.requests")
            .with_description("the number of requests made to the service")
            .build();
        let iss_requests = meter
            .u64_counter("iss.requests")
            .with_description("the number of requests made to iss endpoint")
            .build();

        std::sync::Arc::new(IssDistanceService {
            tracer: pipeline.tracer(),
            logger: pipeline.logger(),
            incoming_requests,
            iss_requests,
            pipeline,
            client: reqwest::Client::new(),
            iss_api_url,
        })
    }

    /// The owned pipeline, for flushing and shutdown.
    pub fn pipeline(&self) -> &TelemetryPipeline {
        &self.pipeline
    }

    /// Current ISS position, falling back to (0, 0) when the upstream is
    /// unavailable — a degraded answer beats a cascading failure.
    async fn iss_position(&self, cx: &Context) -> Coordinates {
        let mut span = self.tracer.start_span("fetch-iss-position", cx);
        let cx = cx.with_span(&span);

        match self.fetch_iss_position(&mut span).await {
            Ok(position) => {
                span.end();
                position
            }
            Err(err) => {
                self.logger.log(
                    &cx,
                    Severity::Error,
                    format!("ISS position lookup failed: {err}"),
                );
                span.set_attribute(KeyValue::new("error.detail", err.to_string()));
                span.set_status(Status::Error);
                span.end();
                Coordinates {
                    latitude: 0.0,
                    longitude: 0.0,
                }
            }
        }
    }

    async fn fetch_iss_position(
        &self,
        span: &mut skytrace::trace::Span,
    ) -> Result<Coordinates, ServiceError> {
        let response = self.client.get(&self.iss_api_url).send().await?;
        let status = response.status().as_u16();
        self.iss_requests
            .add(1, &[KeyValue::new("response.status", status)]);
        span.set_attribute(KeyValue::new("response.status", status));

        if !response.status().is_success() {
            return Err(ServiceError::UpstreamStatus(status));
        }

        let body: IssNowResponse = response.json().await?;
        let position = body
            .iss_position
            .ok_or_else(|| ServiceError::MalformedUpstream("iss_position missing".into()))?;
        let latitude = position
            .latitude
            .parse::<f64>()
            .map_err(|_| ServiceError::MalformedUpstream(format!("latitude {:?}", position.latitude)))?;
        let longitude = position
            .longitude
            .parse::<f64>()
            .map_err(|_| ServiceError::MalformedUpstream(format!("longitude {:?}", position.longitude)))?;

        Ok(Coordinates {
            latitude,
            longitude,
        })
    }
}

#[async_trait]
impl Handler for IssDistanceService {
    async fn handle(&self, parts: http::request::Parts, _body: Bytes) -> Response<Full<Bytes>> {
        let parent_cx = extract_context(&parts);
        let mut span = self.tracer.start_span("iss-distance-request", &parent_cx);
        let cx = parent_cx.with_span(&span);
        self.incoming_requests.add(1, &[]);

        let params = query_params(&parts);
        let latitude = params.get("latitude").and_then(|v| v.parse::<f64>().ok());
        let longitude = params.get("longitude").and_then(|v| v.parse::<f64>().ok());

        let (latitude, longitude) = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => (latitude, longitude),
            _ => {
                self.logger
                    .log(&cx, Severity::Warn, "No latitude/longitude given");
                span.set_status(Status::Error);
                span.end();
                return text_response(StatusCode::BAD_REQUEST, "No latitude/longitude given");
            }
        };

        let iss_location = self.iss_position(&cx).await;
        let location = Coordinates {
            latitude,
            longitude,
        };
        let distance = distance::distance_km(&location, &iss_location);
        self.logger.log(
            &cx,
            Severity::Info,
            format!("ISS is {distance} km from ({latitude}, {longitude})"),
        );
        span.end();

        json_response(
            StatusCode::OK,
            &DistanceResponse {
                distance,
                location: iss_location,
            },
        )
    }
}
