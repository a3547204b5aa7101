//! Conversions between the SDK's signal types and the wire messages.
//!
//! SDK → wire is infallible and used by exporters; wire → SDK validates id
//! fields and is used by the collector's debug sink.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{
    any_value, AnyValue, KeyValue, LogRecord, LogsPayload, MetricRecord, MetricsPayload,
    NumberDataPoint, ProtoError, Resource, SpanRecord, StatusCode, TracesPayload,
};

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

fn from_unix_nanos(nanos: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos)
}

impl From<&skytrace::Value> for AnyValue {
    fn from(value: &skytrace::Value) -> Self {
        let kind = match value {
            skytrace::Value::Bool(v) => any_value::Kind::BoolValue(*v),
            skytrace::Value::I64(v) => any_value::Kind::IntValue(*v),
            skytrace::Value::F64(v) => any_value::Kind::DoubleValue(*v),
            skytrace::Value::String(v) => any_value::Kind::StringValue(v.to_string()),
        };
        AnyValue { kind: Some(kind) }
    }
}

impl From<&AnyValue> for skytrace::Value {
    fn from(value: &AnyValue) -> Self {
        match &value.kind {
            Some(any_value::Kind::BoolValue(v)) => skytrace::Value::Bool(*v),
            Some(any_value::Kind::IntValue(v)) => skytrace::Value::I64(*v),
            Some(any_value::Kind::DoubleValue(v)) => skytrace::Value::F64(*v),
            Some(any_value::Kind::StringValue(v)) => skytrace::Value::String(v.clone().into()),
            // An empty value decodes as an empty string.
            None => skytrace::Value::String("".into()),
        }
    }
}

impl From<&skytrace::KeyValue> for KeyValue {
    fn from(kv: &skytrace::KeyValue) -> Self {
        KeyValue {
            key: kv.key.to_string(),
            value: Some(AnyValue::from(&kv.value)),
        }
    }
}

impl From<&KeyValue> for skytrace::KeyValue {
    fn from(kv: &KeyValue) -> Self {
        let value = kv
            .value
            .as_ref()
            .map(skytrace::Value::from)
            .unwrap_or(skytrace::Value::String("".into()));
        skytrace::KeyValue::new(kv.key.clone(), value)
    }
}

fn attributes_to_wire(attributes: &[skytrace::KeyValue]) -> Vec<KeyValue> {
    attributes.iter().map(KeyValue::from).collect()
}

fn attributes_from_wire(attributes: &[KeyValue]) -> Vec<skytrace::KeyValue> {
    attributes.iter().map(skytrace::KeyValue::from).collect()
}

impl From<&skytrace::Resource> for Resource {
    fn from(resource: &skytrace::Resource) -> Self {
        let mut attributes: Vec<KeyValue> = resource
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.to_string(),
                value: Some(AnyValue::from(value)),
            })
            .collect();
        attributes.sort_by(|a, b| a.key.cmp(&b.key));
        Resource { attributes }
    }
}

impl From<&Resource> for skytrace::Resource {
    fn from(resource: &Resource) -> Self {
        let mut builder = skytrace::Resource::builder();
        for kv in &resource.attributes {
            builder = builder.with_attribute(skytrace::KeyValue::from(kv));
        }
        builder.build()
    }
}

impl From<&skytrace::trace::SpanData> for SpanRecord {
    fn from(span: &skytrace::trace::SpanData) -> Self {
        let parent_span_id = if span.parent_span_id == skytrace::trace::SpanId::INVALID {
            String::new()
        } else {
            span.parent_span_id.to_string()
        };
        SpanRecord {
            trace_id: span.span_context.trace_id().to_string(),
            span_id: span.span_context.span_id().to_string(),
            parent_span_id,
            name: span.name.to_string(),
            start_time_unix_nano: unix_nanos(span.start_time),
            end_time_unix_nano: unix_nanos(span.end_time),
            status: match span.status {
                skytrace::trace::Status::Ok => StatusCode::Ok as i32,
                skytrace::trace::Status::Error => StatusCode::Error as i32,
            },
            attributes: attributes_to_wire(&span.attributes),
        }
    }
}

impl TryFrom<&SpanRecord> for skytrace::trace::SpanData {
    type Error = ProtoError;

    fn try_from(record: &SpanRecord) -> Result<Self, ProtoError> {
        let trace_id = skytrace::trace::TraceId::from_hex(&record.trace_id)
            .map_err(|_| ProtoError::InvalidId(record.trace_id.clone()))?;
        let span_id = skytrace::trace::SpanId::from_hex(&record.span_id)
            .map_err(|_| ProtoError::InvalidId(record.span_id.clone()))?;
        let parent_span_id = if record.parent_span_id.is_empty() {
            skytrace::trace::SpanId::INVALID
        } else {
            skytrace::trace::SpanId::from_hex(&record.parent_span_id)
                .map_err(|_| ProtoError::InvalidId(record.parent_span_id.clone()))?
        };

        Ok(skytrace::trace::SpanData {
            span_context: skytrace::trace::SpanContext::new(
                trace_id,
                span_id,
                skytrace::trace::TraceFlags::SAMPLED,
                true,
            ),
            parent_span_id,
            name: record.name.clone().into(),
            start_time: from_unix_nanos(record.start_time_unix_nano),
            end_time: from_unix_nanos(record.end_time_unix_nano),
            status: if record.status == StatusCode::Error as i32 {
                skytrace::trace::Status::Error
            } else {
                skytrace::trace::Status::Ok
            },
            attributes: attributes_from_wire(&record.attributes),
        })
    }
}

/// Build a traces payload from a batch of finalized spans.
pub fn traces_payload(
    resource: &skytrace::Resource,
    batch: &[skytrace::trace::SpanData],
) -> TracesPayload {
    TracesPayload {
        resource: Some(Resource::from(resource)),
        spans: batch.iter().map(SpanRecord::from).collect(),
    }
}

impl From<&skytrace::logs::LogRecord> for LogRecord {
    fn from(record: &skytrace::logs::LogRecord) -> Self {
        LogRecord {
            time_unix_nano: unix_nanos(record.timestamp),
            severity_number: record.severity.as_u8() as u32,
            body: record.body.clone(),
            trace_id: record.trace_id.map(|id| id.to_string()).unwrap_or_default(),
            span_id: record.span_id.map(|id| id.to_string()).unwrap_or_default(),
            attributes: attributes_to_wire(&record.attributes),
        }
    }
}

impl TryFrom<&LogRecord> for skytrace::logs::LogRecord {
    type Error = ProtoError;

    fn try_from(record: &LogRecord) -> Result<Self, ProtoError> {
        let trace_id = if record.trace_id.is_empty() {
            None
        } else {
            Some(
                skytrace::trace::TraceId::from_hex(&record.trace_id)
                    .map_err(|_| ProtoError::InvalidId(record.trace_id.clone()))?,
            )
        };
        let span_id = if record.span_id.is_empty() {
            None
        } else {
            Some(
                skytrace::trace::SpanId::from_hex(&record.span_id)
                    .map_err(|_| ProtoError::InvalidId(record.span_id.clone()))?,
            )
        };

        Ok(skytrace::logs::LogRecord {
            timestamp: from_unix_nanos(record.time_unix_nano),
            severity: skytrace::logs::Severity::from_u8(record.severity_number.min(255) as u8),
            body: record.body.clone(),
            trace_id,
            span_id,
            attributes: attributes_from_wire(&record.attributes),
        })
    }
}

/// Build a logs payload from a batch of emitted records.
pub fn logs_payload(
    resource: &skytrace::Resource,
    batch: &[skytrace::logs::LogRecord],
) -> LogsPayload {
    LogsPayload {
        resource: Some(Resource::from(resource)),
        records: batch.iter().map(LogRecord::from).collect(),
    }
}

impl From<&skytrace::metrics::MetricData> for MetricRecord {
    fn from(metric: &skytrace::metrics::MetricData) -> Self {
        MetricRecord {
            name: metric.name.to_string(),
            description: metric.description.to_string(),
            points: metric
                .points
                .iter()
                .map(|point| NumberDataPoint {
                    attributes: attributes_to_wire(&point.attributes),
                    value: point.value,
                    time_unix_nano: unix_nanos(point.time),
                })
                .collect(),
        }
    }
}

impl From<&MetricRecord> for skytrace::metrics::MetricData {
    fn from(record: &MetricRecord) -> Self {
        skytrace::metrics::MetricData {
            name: record.name.clone().into(),
            description: record.description.clone().into(),
            points: record
                .points
                .iter()
                .map(|point| skytrace::metrics::DataPoint {
                    attributes: attributes_from_wire(&point.attributes),
                    value: point.value,
                    time: from_unix_nanos(point.time_unix_nano),
                })
                .collect(),
        }
    }
}

/// Build a metrics payload from a cumulative snapshot.
pub fn metrics_payload(
    resource: &skytrace::Resource,
    batch: &[skytrace::metrics::MetricData],
) -> MetricsPayload {
    MetricsPayload {
        resource: Some(Resource::from(resource)),
        metrics: batch.iter().map(MetricRecord::from).collect(),
    }
}
