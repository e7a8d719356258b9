//! Conversation pipeline types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::spans::SpanNode;

// ============================================================================
// MESSAGE ROLE
// ============================================================================

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Role name as used in message ids and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

// ============================================================================
// TOOL CALL
// ============================================================================

/// A tool invocation attributed to a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    /// Tool name from the execution span.
    pub name: String,
    /// Originating tool span.
    pub span_id: String,
    /// True when the span recorded an explicit failure.
    pub has_error: bool,
}

// ============================================================================
// CONVERSATION MESSAGE
// ============================================================================

/// A display-ready conversation message.
///
/// Created once by the projector and immutable afterwards. Assistant
/// messages carry the turn's tool calls and token usage; user messages carry
/// the caller identity when the trace recorded one.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    /// Stable identifier: `"{span_id}-{role}"`.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Assistant messages get the span start plus one millisecond so they
    /// sort directly after their user prompt.
    pub timestamp: DateTime<Utc>,
    /// Originating generation span.
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
}

// ============================================================================
// CONVERSATION TURN (pipeline intermediate)
// ============================================================================

/// One reconstructed exchange unit: a generation span plus the user input,
/// assistant output, and tool calls attributed to it.
///
/// Built once per generation span, consumed by merging and projection.
#[derive(Debug)]
pub(crate) struct ConversationTurn<'a> {
    pub(crate) span: &'a SpanNode,
    pub(crate) tool_calls: Vec<ToolCall>,
    pub(crate) user_text: Option<String>,
    pub(crate) assistant_text: Option<String>,
    pub(crate) user_identity: Option<String>,
    pub(crate) total_tokens: Option<i64>,
}

impl ConversationTurn<'_> {
    #[inline]
    pub(crate) fn has_user_text(&self) -> bool {
        self.user_text.is_some()
    }

    #[inline]
    pub(crate) fn has_assistant_text(&self) -> bool {
        self.assistant_text.is_some()
    }

    #[inline]
    pub(crate) fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
