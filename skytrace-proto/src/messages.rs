//! Payload messages. Field numbers are frozen; add, never renumber.

use serde::{Deserialize, Serialize};

/// A single scalar value.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct AnyValue {
    /// The value; `None` encodes an empty value.
    #[prost(oneof = "any_value::Kind", tags = "1, 2, 3, 4")]
    pub kind: Option<any_value::Kind>,
}

/// Nested message and enum types in `AnyValue`.
pub mod any_value {
    use serde::{Deserialize, Serialize};

    /// The kinds of scalar attribute values.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    pub enum Kind {
        /// A string value.
        #[prost(string, tag = "1")]
        StringValue(String),
        /// A boolean value.
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        /// A signed integer value.
        #[prost(int64, tag = "3")]
        IntValue(i64),
        /// A double value.
        #[prost(double, tag = "4")]
        DoubleValue(f64),
    }
}

/// A key-value attribute pair.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct KeyValue {
    /// Attribute name.
    #[prost(string, tag = "1")]
    pub key: String,
    /// Attribute value.
    #[prost(message, optional, tag = "2")]
    pub value: Option<AnyValue>,
}

/// Identity of the producing entity, attached to every payload.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct Resource {
    /// Resource attributes (`service.name`, `deployment.environment`, ...).
    #[prost(message, repeated, tag = "1")]
    pub attributes: Vec<KeyValue>,
}

/// Outcome of the operation a span covered.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum StatusCode {
    /// No status recorded; readers treat this as OK.
    Unspecified = 0,
    /// The operation completed as intended.
    Ok = 1,
    /// The operation failed or was aborted.
    Error = 2,
}

/// One finalized span.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Trace id as 32 lowercase hex characters.
    #[prost(string, tag = "1")]
    pub trace_id: String,
    /// Span id as 16 lowercase hex characters.
    #[prost(string, tag = "2")]
    pub span_id: String,
    /// Parent span id; empty for a root span.
    #[prost(string, tag = "3")]
    pub parent_span_id: String,
    /// Operation name.
    #[prost(string, tag = "4")]
    pub name: String,
    /// Start time, nanoseconds since the Unix epoch.
    #[prost(uint64, tag = "5")]
    pub start_time_unix_nano: u64,
    /// End time, nanoseconds since the Unix epoch.
    #[prost(uint64, tag = "6")]
    pub end_time_unix_nano: u64,
    /// Outcome ([`StatusCode`]).
    #[prost(enumeration = "StatusCode", tag = "7")]
    pub status: i32,
    /// Span attributes, unique by key.
    #[prost(message, repeated, tag = "8")]
    pub attributes: Vec<KeyValue>,
}

/// Spans of one producer, grouped under its resource.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct TracesPayload {
    /// The producing entity.
    #[prost(message, optional, tag = "1")]
    pub resource: Option<Resource>,
    /// Finalized spans.
    #[prost(message, repeated, tag = "2")]
    pub spans: Vec<SpanRecord>,
}

/// One attribute combination's running total.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct NumberDataPoint {
    /// The attribute combination this sub-total is keyed by.
    #[prost(message, repeated, tag = "1")]
    pub attributes: Vec<KeyValue>,
    /// Cumulative value.
    #[prost(uint64, tag = "2")]
    pub value: u64,
    /// Snapshot time, nanoseconds since the Unix epoch.
    #[prost(uint64, tag = "3")]
    pub time_unix_nano: u64,
}

/// Cumulative snapshot of one counter instrument.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Instrument name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Human-readable description.
    #[prost(string, tag = "2")]
    pub description: String,
    /// One point per attribute combination.
    #[prost(message, repeated, tag = "3")]
    pub points: Vec<NumberDataPoint>,
}

/// Counter snapshots of one producer, grouped under its resource.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct MetricsPayload {
    /// The producing entity.
    #[prost(message, optional, tag = "1")]
    pub resource: Option<Resource>,
    /// Instrument snapshots.
    #[prost(message, repeated, tag = "2")]
    pub metrics: Vec<MetricRecord>,
}

/// One emitted log line.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission time, nanoseconds since the Unix epoch.
    #[prost(uint64, tag = "1")]
    pub time_unix_nano: u64,
    /// Severity on the conventional numeric scale (DEBUG=5 .. ERROR=17).
    #[prost(uint32, tag = "2")]
    pub severity_number: u32,
    /// The formatted message.
    #[prost(string, tag = "3")]
    pub body: String,
    /// Trace id of the active span at emission time; empty if none.
    #[prost(string, tag = "4")]
    pub trace_id: String,
    /// Span id of the active span at emission time; empty if none.
    #[prost(string, tag = "5")]
    pub span_id: String,
    /// Additional attributes.
    #[prost(message, repeated, tag = "6")]
    pub attributes: Vec<KeyValue>,
}

/// Log records of one producer, grouped under its resource.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct LogsPayload {
    /// The producing entity.
    #[prost(message, optional, tag = "1")]
    pub resource: Option<Resource>,
    /// Emitted records.
    #[prost(message, repeated, tag = "2")]
    pub records: Vec<LogRecord>,
}

/// Envelope sent on the binary transport; exactly one payload per frame.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct ExportRequest {
    /// The signal payload.
    #[prost(oneof = "export_request::Payload", tags = "1, 2, 3")]
    pub payload: Option<export_request::Payload>,
}

/// Nested message and enum types in `ExportRequest`.
pub mod export_request {
    use serde::{Deserialize, Serialize};

    /// The three signal payloads.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    pub enum Payload {
        /// A batch of finalized spans.
        #[prost(message, tag = "1")]
        Traces(super::TracesPayload),
        /// A batch of counter snapshots.
        #[prost(message, tag = "2")]
        Metrics(super::MetricsPayload),
        /// A batch of log records.
        #[prost(message, tag = "3")]
        Logs(super::LogsPayload),
    }
}

impl AnyValue {
    /// Wrap a string value.
    pub fn string(value: impl Into<String>) -> Self {
        AnyValue {
            kind: Some(any_value::Kind::StringValue(value.into())),
        }
    }

    /// Wrap an integer value.
    pub fn int(value: i64) -> Self {
        AnyValue {
            kind: Some(any_value::Kind::IntValue(value)),
        }
    }
}

impl KeyValue {
    /// Build a pair from a key and a wrapped value.
    pub fn new(key: impl Into<String>, value: AnyValue) -> Self {
        KeyValue {
            key: key.into(),
            value: Some(value),
        }
    }
}

impl Resource {
    /// The value of the `service.name` attribute, if present.
    pub fn service_name(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|kv| kv.key == skytrace::SERVICE_NAME)
            .and_then(|kv| kv.value.as_ref())
            .and_then(|v| match &v.kind {
                Some(any_value::Kind::StringValue(s)) => Some(s.as_str()),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    fn sample_request() -> ExportRequest {
        ExportRequest {
            payload: Some(export_request::Payload::Traces(TracesPayload {
                resource: Some(Resource {
                    attributes: vec![KeyValue::new(
                        "service.name",
                        AnyValue::string("gateway"),
                    )],
                }),
                spans: vec![SpanRecord {
                    trace_id: "0000000000000000000000000000002a".into(),
                    span_id: "000000000000002b".into(),
                    parent_span_id: String::new(),
                    name: "request".into(),
                    start_time_unix_nano: 1,
                    end_time_unix_nano: 2,
                    status: StatusCode::Ok as i32,
                    attributes: vec![KeyValue::new("http.route", AnyValue::string("/"))],
                }],
            })),
        }
    }

    #[test]
    fn prost_round_trip() {
        let request = sample_request();
        let bytes = request.encode_to_vec();
        let decoded = ExportRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn json_round_trip() {
        let request = sample_request();
        let json = serde_json::to_string(&request).unwrap();
        let decoded: ExportRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn resource_service_name_lookup() {
        let resource = Resource {
            attributes: vec![
                KeyValue::new("deployment.environment", AnyValue::string("dev")),
                KeyValue::new("service.name", AnyValue::string("frontend")),
            ],
        };
        assert_eq!(resource.service_name(), Some("frontend"));
        assert_eq!(Resource::default().service_name(), None);
    }
}
