//! Span classification.
//!
//! Partitions incoming spans into generation spans (model calls) and tool
//! spans (tool executions). Everything else is irrelevant to conversation
//! reconstruction and is dropped without complaint.

use crate::domain::spans::SpanNode;

use super::keys;

/// Operation names that mark a model call.
const GENERATION_OPS: &[&str] = &[
    "chat",
    "generate_text",
    "text_completion",
    "generate_content",
    "generate_object",
];

/// Operation name that marks a tool execution.
const TOOL_OP: &str = "execute_tool";

/// Payload attributes whose presence implies a model call when the
/// operation name is missing.
const MESSAGE_PAYLOAD_KEYS: &[&str] = &[
    keys::GEN_AI_INPUT_MESSAGES,
    keys::GEN_AI_REQUEST_MESSAGES,
    keys::GEN_AI_OUTPUT_MESSAGES,
    keys::GEN_AI_RESPONSE_TEXT,
];

// ============================================================================
// PARTITIONING
// ============================================================================

/// Split spans into (generation spans, tool spans), each sorted ascending by
/// start time.
///
/// The sort is stable, so spans sharing a start timestamp keep their input
/// order. Empty input yields two empty lists.
pub(crate) fn partition_spans(spans: &[SpanNode]) -> (Vec<&SpanNode>, Vec<&SpanNode>) {
    let mut generations = Vec::new();
    let mut tools = Vec::new();

    for span in spans {
        if is_generation_span(span) {
            generations.push(span);
        } else if is_tool_span(span) {
            tools.push(span);
        }
    }

    generations.sort_by_key(|s| s.start);
    tools.sort_by_key(|s| s.start);
    (generations, tools)
}

// ============================================================================
// PREDICATES
// ============================================================================

/// Check if a span represents one model call.
///
/// Priority 1 is the operation name; when a span carries one, it alone
/// decides. Spans without an operation name fall back to payload-attribute
/// presence (older SDKs set the message attributes but no operation name).
pub(crate) fn is_generation_span(span: &SpanNode) -> bool {
    if let Some(op) = span.attributes.get(keys::GEN_AI_OPERATION_NAME) {
        return GENERATION_OPS.contains(&op);
    }
    MESSAGE_PAYLOAD_KEYS
        .iter()
        .any(|key| span.attributes.contains_key(key))
}

/// Check if a span represents one tool execution.
pub(crate) fn is_tool_span(span: &SpanNode) -> bool {
    match span.attributes.get(keys::GEN_AI_OPERATION_NAME) {
        Some(op) => op == TOOL_OP,
        None => span.attributes.contains_key(keys::GEN_AI_TOOL_NAME),
    }
}

// ============================================================================
// TESTS
// ============================================================================
