//! Conversation Reconstruction Pipeline
//!
//! Converts a flat, unordered collection of GenAI spans into an ordered,
//! deduplicated sequence of conversation messages.
//!
//! # The Problem
//!
//! An agent trace interleaves model calls and tool executions as sibling
//! spans with no explicit conversation structure:
//! - A model call's message payload carries the full prompt history, not
//!   just the new user input.
//! - Tool executions sit between model calls and must be re-attached to the
//!   exchange whose reply they produced.
//! - Streaming retries and framework re-emission duplicate message content
//!   across spans.
//!
//! # Pipeline Stages
//!
//! ```text
//! 1. CLASSIFY   generation spans vs tool spans, sorted by start time
//! 2. EXTRACT    last user / assistant text from message payload attributes
//! 3. BUILD      one turn per generation span + tool calls in its window
//! 4. MERGE      forward orphaned tool calls to the next completed exchange
//! 5. PROJECT    flatten to messages, dedup by (role, content), sort by time
//! ```
//!
//! Every stage is defensive: malformed payloads fall back to raw text or
//! legacy attributes, absent attributes produce no content, and the pipeline
//! as a whole cannot fail.

mod classify;
mod content;
mod project;
mod turns;
mod types;

use crate::domain::spans::SpanNode;

// Re-exports for public API
pub use types::{ConversationMessage, MessageRole, ToolCall};

// ============================================================================
// ATTRIBUTE KEYS
// ============================================================================

pub(crate) mod keys {
    // GenAI core
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

    // Message payloads
    pub const GEN_AI_INPUT_MESSAGES: &str = "gen_ai.input.messages";
    pub const GEN_AI_REQUEST_MESSAGES: &str = "gen_ai.request.messages";
    pub const GEN_AI_OUTPUT_MESSAGES: &str = "gen_ai.output.messages";

    // Legacy response fields
    pub const GEN_AI_RESPONSE_TEXT: &str = "gen_ai.response.text";
    pub const GEN_AI_RESPONSE_OBJECT: &str = "gen_ai.response.object";

    // Tool
    pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
    pub const GEN_AI_TOOL_STATUS: &str = "gen_ai.tool.status";

    // Token usage
    pub const GEN_AI_USAGE_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";
    pub const GEN_AI_COST_TOTAL_TOKENS: &str = "gen_ai.cost.total_tokens";

    // User identity
    pub const USER_ID: &str = "user.id";
    pub const USER_EMAIL: &str = "user.email";
    pub const USER_USERNAME: &str = "user.username";
    pub const USER_IP: &str = "user.ip";
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Reconstruct a conversation from a span collection.
///
/// Spans may arrive in any order; irrelevant spans (neither model calls nor
/// tool executions) are ignored. The result is sorted ascending by
/// timestamp, with assistant replies ordered directly after their user
/// prompt, and deduplicated on (role, content) with the first occurrence
/// winning.
///
/// # Example
///
/// ```
/// use threadline::{SpanNode, MessageRole, reconstruct_conversation};
/// use chrono::DateTime;
///
/// let span = SpanNode::new("a1b2", DateTime::from_timestamp(1, 0).unwrap())
///     .with_attr("gen_ai.operation.name", "chat")
///     .with_attr("gen_ai.input.messages", r#"[{"role":"user","content":"hi"}]"#)
///     .with_attr("gen_ai.output.messages", r#"[{"role":"assistant","content":"hello"}]"#);
///
/// let messages = reconstruct_conversation(&[span]);
/// assert_eq!(messages[0].role, MessageRole::User);
/// assert_eq!(messages[1].role, MessageRole::Assistant);
/// ```
pub fn reconstruct_conversation(spans: &[SpanNode]) -> Vec<ConversationMessage> {
    let (generations, tools) = classify::partition_spans(spans);
    tracing::debug!(
        spans = spans.len(),
        generations = generations.len(),
        tools = tools.len(),
        "reconstructing conversation"
    );

    let built = turns::build_turns(&generations, &tools);
    let merged = turns::merge_turns(built);
    project::project_messages(&merged)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
