//! The frontend: a single HTML page with a location form. Submitting the
//! form relays through the gateway and renders the distance (or the
//! upstream error) into the page. The page itself always answers 200.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response};

use skytrace::logs::{Logger, Severity};
use skytrace::metrics::Counter;
use skytrace::trace::{Status, Tracer};
use skytrace::{Context, KeyValue, TelemetryPipeline};

use crate::http::{extract_context, form_params, html_response, inject_headers, Handler};
use crate::iss::DistanceResponse;
use crate::ServiceError;

/// Handler state of the frontend.
pub struct Frontend {
    pipeline: TelemetryPipeline,
    tracer: Tracer,
    logger: Logger,
    incoming_requests: Counter,
    client: reqwest::Client,
    gateway_url: String,
}

/// What the page renders below the form.
enum Outcome {
    Empty,
    Distance { location: String, response: DistanceResponse },
    Error { message: String },
}

impl Frontend {
    /// Wire the handler onto a pipeline and the gateway base URL.
    pub fn new(pipeline: TelemetryPipeline, gateway_url: String) -> std::sync::Arc<Self> {
        let incoming_requests = pipeline
            .meter()
            .u64_counter("incoming.requests")
            .with_description("the number of requests made to the service")
            .build();

        std::sync::Arc::new(Frontend {
            tracer: pipeline.tracer(),
            logger: pipeline.logger(),
            incoming_requests,
            pipeline,
            client: reqwest::Client::new(),
            gateway_url,
        })
    }

    /// The owned pipeline, for flushing and shutdown.
    pub fn pipeline(&self) -> &TelemetryPipeline {
        &self.pipeline
    }

    async fn lookup(&self, cx: &Context, location: &str) -> Result<Outcome, ServiceError> {
        let response = self
            .client
            .get(&self.gateway_url)
            .headers(inject_headers(cx))
            .query(&[("location", location)])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(Outcome::Distance {
                location: location.to_string(),
                response: response.json().await?,
            })
        } else {
            Ok(Outcome::Error {
                message: response.text().await?,
            })
        }
    }
}

#[async_trait]
impl Handler for Frontend {
    async fn handle(&self, parts: http::request::Parts, body: Bytes) -> Response<Full<Bytes>> {
        let parent_cx = extract_context(&parts);
        let mut span = self.tracer.start_span("frontend-request", &parent_cx);
        let cx = parent_cx.with_span(&span);
        self.incoming_requests.add(1, &[]);

        let outcome = if parts.method == Method::POST {
            match form_params(&body).get("location").filter(|v| !v.is_empty()) {
                Some(location) => match self.lookup(&cx, location).await {
                    Ok(outcome) => {
                        if let Outcome::Error { message } = &outcome {
                            self.logger.log(
                                &cx,
                                Severity::Warn,
                                format!("gateway reported: {message}"),
                            );
                            span.set_status(Status::Error);
                        }
                        outcome
                    }
                    Err(err) => {
                        self.logger
                            .log(&cx, Severity::Error, format!("gateway unreachable: {err}"));
                        span.set_attribute(KeyValue::new("error.detail", err.to_string()));
                        span.set_status(Status::Error);
                        Outcome::Error {
                            message: "gateway unavailable".to_string(),
                        }
                    }
                },
                None => {
                    self.logger.log(&cx, Severity::Warn, "No location given");
                    span.set_status(Status::Error);
                    Outcome::Error {
                        message: "No location given".to_string(),
                    }
                }
            }
        } else {
            Outcome::Empty
        };

        span.end();
        html_response(render_page(&outcome))
    }
}

fn render_page(outcome: &Outcome) -> String {
    let result = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Distance { location, response } => format!(
            "<p>The ISS is <strong>{} km</strong> away from {} \
             (currently above {:.4}, {:.4}).</p>",
            response.distance,
            escape_html(location),
            response.location.latitude,
            response.location.longitude,
        ),
        Outcome::Error { message } => {
            format!("<p class=\"error\">{}</p>", escape_html(message))
        }
    };

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>ISS distance</title></head>\n\
         <body>\n\
         <h1>How far away is the ISS?</h1>\n\
         <form method=\"post\">\n\
         <input type=\"text\" name=\"location\" placeholder=\"Enter a location\">\n\
         <button type=\"submit\">Check</button>\n\
         </form>\n\
         {result}\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
