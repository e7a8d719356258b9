//! OTLP ingestion adapter.
//!
//! Converts OTLP protobuf trace data into [`SpanNode`]s:
//! - span ids are hex-encoded
//! - attribute values are flattened to strings (compound values become JSON
//!   text)
//! - resource-level attributes are merged in as defaults where the span does
//!   not set the key
//!
//! This is the only module aware of `opentelemetry-proto`; the pipeline
//! itself consumes [`SpanNode`] regardless of origin.

use chrono::{DateTime, Utc};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::trace::v1::Span;
use serde_json::Value as JsonValue;

use super::{AttributeMap, SpanNode, SpanStatus};

/// OTLP event name carrying recorded exceptions.
const EXCEPTION_EVENT: &str = "exception";

// ============================================================================
// REQUEST CONVERSION
// ============================================================================

/// Convert an OTLP export request into span nodes.
///
/// Walks every resource/scope group in the request. Resource attributes are
/// merged into each span as defaults, so identity attributes recorded at the
/// resource level (e.g. `user.id`) remain visible to the pipeline.
pub fn spans_from_otlp(request: &ExportTraceServiceRequest) -> Vec<SpanNode> {
    let mut spans = Vec::new();

    for resource_spans in &request.resource_spans {
        let resource_attrs = resource_spans
            .resource
            .as_ref()
            .map(|r| flatten_attributes(&r.attributes))
            .unwrap_or_default();

        for scope_spans in &resource_spans.scope_spans {
            for otlp_span in &scope_spans.spans {
                let mut span = SpanNode::from_otlp(otlp_span);
                span.attributes.merge_defaults(&resource_attrs);
                spans.push(span);
            }
        }
    }

    spans
}

// ============================================================================
// SPAN CONVERSION
// ============================================================================

impl SpanNode {
    /// Convert a single OTLP span, without resource context.
    pub fn from_otlp(span: &Span) -> Self {
        let error_count = span
            .events
            .iter()
            .filter(|e| e.name == EXCEPTION_EVENT)
            .count() as u32;

        Self {
            span_id: hex::encode(&span.span_id),
            start: nanos_to_datetime(span.start_time_unix_nano),
            status: span
                .status
                .as_ref()
                .map(|s| status_from_code(s.code))
                .unwrap_or_default(),
            error_count,
            attributes: flatten_attributes(&span.attributes),
        }
    }
}

fn status_from_code(code: i32) -> SpanStatus {
    match code {
        1 => SpanStatus::Ok,
        2 => SpanStatus::Error,
        _ => SpanStatus::Unset,
    }
}

fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::try_from(nanos).unwrap_or(i64::MAX))
}

// ============================================================================
// ATTRIBUTE FLATTENING
// ============================================================================

fn flatten_attributes(attrs: &[KeyValue]) -> AttributeMap {
    let mut map = AttributeMap::new();
    for kv in attrs {
        if let Some(value) = &kv.value {
            map.insert(&kv.key, value_to_string(value));
        }
    }
    map
}

/// Stringify an OTLP attribute value.
///
/// Scalars use their natural text form; arrays and kv-lists are serialized
/// as JSON so downstream JSON parsing can recover the structure.
fn value_to_string(value: &AnyValue) -> String {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => s.clone(),
        Some(any_value::Value::BoolValue(b)) => b.to_string(),
        Some(any_value::Value::IntValue(i)) => i.to_string(),
        Some(any_value::Value::DoubleValue(d)) => d.to_string(),
        Some(any_value::Value::ArrayValue(arr)) => {
            let values: Vec<String> = arr.values.iter().map(value_to_string).collect();
            serde_json::to_string(&values).unwrap_or_default()
        }
        Some(any_value::Value::KvlistValue(kvlist)) => {
            let map: serde_json::Map<String, JsonValue> = kvlist
                .values
                .iter()
                .filter_map(|kv| {
                    kv.value
                        .as_ref()
                        .map(|v| (kv.key.clone(), JsonValue::String(value_to_string(v))))
                })
                .collect();
            serde_json::to_string(&map).unwrap_or_default()
        }
        Some(any_value::Value::BytesValue(b)) => hex::encode(b),
        None => String::new(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
