//! The geolocator service: resolves a free-form location string to
//! coordinates via a geocoding HTTP API.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;

use skytrace::logs::{Logger, Severity};
use skytrace::metrics::Counter;
use skytrace::trace::{Status, Tracer};
use skytrace::{Context, KeyValue, TelemetryPipeline};

use crate::distance::Coordinates;
use crate::http::{extract_context, json_response, query_params, text_response, Handler};
use crate::ServiceError;

const USER_AGENT: &str = "skytrace-demo/0.1";

#[derive(Debug, Deserialize)]
struct GeocoderPlace {
    // The geocoder serializes coordinates as strings.
    lat: String,
    lon: String,
}

/// Handler state of the geolocator service.
pub struct GeolocatorService {
    pipeline: TelemetryPipeline,
    tracer: Tracer,
    logger: Logger,
    incoming_requests: Counter,
    client: reqwest::Client,
    geocoder_url: String,
}

impl GeolocatorService {
    /// Wire the handler onto a pipeline and the geocoder endpoint.
    pub fn new(pipeline: TelemetryPipeline, geocoder_url: String) -> std::sync::Arc<Self> {
        let incoming_requests = pipeline
            .meter()
            .u64_counter("incoming.requests")
            .with_description("the number of requests made to the service")
            .build();

        std::sync::Arc::new(GeolocatorService {
            tracer: pipeline.tracer(),
            logger: pipeline.logger(),
            incoming_requests,
            pipeline,
            client: reqwest::Client::new(),
            geocoder_url,
        })
    }

    /// The owned pipeline, for flushing and shutdown.
    pub fn pipeline(&self) -> &TelemetryPipeline {
        &self.pipeline
    }

    /// Geocode `place`. `Ok(None)` means the geocoder answered but found
    /// nothing.
    async fn coordinates_for_location(
        &self,
        cx: &Context,
        place: &str,
    ) -> Result<Option<Coordinates>, ServiceError> {
        let mut span = self
            .tracer
            .start_span("getting-coordinates-for-location", cx);
        span.set_attribute(KeyValue::new("location.query", place.to_string()));

        let result = self.lookup(place).await;
        match &result {
            Ok(Some(_)) => span.end(),
            Ok(None) => {
                // Recorded as an error on the span, a 404 for the caller.
                span.set_status(Status::Error);
                span.end();
            }
            Err(err) => {
                span.set_attribute(KeyValue::new("error.detail", err.to_string()));
                span.set_status(Status::Error);
                span.end();
            }
        }
        result
    }

    async fn lookup(&self, place: &str) -> Result<Option<Coordinates>, ServiceError> {
        let response = self
            .client
            .get(&self.geocoder_url)
            .header("user-agent", USER_AGENT)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::UpstreamStatus(status.as_u16()));
        }

        let places: Vec<GeocoderPlace> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        let latitude = place
            .lat
            .parse::<f64>()
            .map_err(|_| ServiceError::MalformedUpstream(format!("lat {:?}", place.lat)))?;
        let longitude = place
            .lon
            .parse::<f64>()
            .map_err(|_| ServiceError::MalformedUpstream(format!("lon {:?}", place.lon)))?;

        Ok(Some(Coordinates {
            latitude,
            longitude,
        }))
    }
}

#[async_trait]
impl Handler for GeolocatorService {
    async fn handle(&self, parts: http::request::Parts, _body: Bytes) -> Response<Full<Bytes>> {
        let parent_cx = extract_context(&parts);
        let mut span = self.tracer.start_span("geolocator-request", &parent_cx);
        let cx = parent_cx.with_span(&span);
        self.incoming_requests.add(1, &[]);

        let params = query_params(&parts);
        let Some(location) = params.get("location").filter(|v| !v.is_empty()) else {
            self.logger.log(&cx, Severity::Warn, "No location given");
            span.set_status(Status::Error);
            span.end();
            return text_response(StatusCode::BAD_REQUEST, "No location given");
        };

        match self.coordinates_for_location(&cx, location).await {
            Ok(Some(coordinates)) => {
                span.end();
                json_response(StatusCode::OK, &coordinates)
            }
            Ok(None) => {
                self.logger.log(
                    &cx,
                    Severity::Warn,
                    format!("no coordinates found for location {location:?}"),
                );
                span.set_status(Status::Error);
                span.end();
                text_response(
                    StatusCode::NOT_FOUND,
                    format!("No coordinates found for location '{location}'"),
                )
            }
            Err(err) => {
                // Local recovery: the lookup failure stays a 404 for the
                // caller instead of cascading as a 5xx.
                self.logger.log(
                    &cx,
                    Severity::Error,
                    format!("geocoder lookup failed: {err}"),
                );
                span.set_attribute(KeyValue::new("error.detail", err.to_string()));
                span.set_status(Status::Error);
                span.end();
                text_response(
                    StatusCode::NOT_FOUND,
                    format!("No coordinates found for location '{location}'"),
                )
            }
        }
    }
}
