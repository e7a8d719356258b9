//! Generation-span content extraction.
//!
//! Parses a model call's message payload attributes into plain user and
//! assistant text. Extraction is best-effort throughout: bad JSON degrades
//! to the raw attribute string (user side) or to the legacy response
//! attributes (assistant side), and absence is simply "no content".
//!
//! ## Extraction Priority
//!
//! - **User**: `gen_ai.input.messages`, then legacy `gen_ai.request.messages`
//! - **Assistant**: `gen_ai.output.messages`, then legacy
//!   `gen_ai.response.text`, then legacy `gen_ai.response.object`

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::spans::AttributeMap;

use super::keys;

const ROLE_USER: &str = "user";
const ROLE_ASSISTANT: &str = "assistant";

/// Identity keys in precedence order.
const USER_IDENTITY_KEYS: &[&str] = &[
    keys::USER_ID,
    keys::USER_EMAIL,
    keys::USER_USERNAME,
    keys::USER_IP,
];

// ============================================================================
// PAYLOAD SHAPES
// ============================================================================

/// One message object inside a payload array.
///
/// SDK versions disagree on the content shape, so both `content` and the
/// Gemini-style `parts` list are modeled; [`RawChatMessage::extract_text`]
/// picks per the variant that is present.
#[derive(Debug, Deserialize)]
struct RawChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<MessageContent>,
    #[serde(default)]
    parts: Option<Vec<MessagePart>>,
}

/// Content shapes observed across SDK versions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Array of content blocks, each carrying a `text` field.
    Blocks(Vec<JsonValue>),
    /// Anything else (structured output, nulls). Never yields text.
    Other(JsonValue),
}

/// One entry of a `parts` list.
#[derive(Debug, Deserialize)]
struct MessagePart {
    #[serde(rename = "type", default)]
    part_type: Option<String>,
    #[serde(default)]
    content: JsonValue,
    #[serde(default)]
    text: JsonValue,
}

impl MessagePart {
    /// Text of a `type: "text"` part, preferring `content` over `text`.
    fn text_value(&self) -> Option<&str> {
        if self.part_type.as_deref() != Some("text") {
            return None;
        }
        self.content.as_str().or_else(|| self.text.as_str())
    }
}

impl RawChatMessage {
    fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    /// Check whether the message carries any content or parts at all.
    fn has_payload(&self) -> bool {
        if let Some(parts) = &self.parts
            && !parts.is_empty()
        {
            return true;
        }
        match &self.content {
            Some(MessageContent::Text(s)) => !s.is_empty(),
            Some(MessageContent::Blocks(blocks)) => !blocks.is_empty(),
            Some(MessageContent::Other(value)) => !value.is_null(),
            None => false,
        }
    }

    /// Extract plain text. A present `parts` list takes precedence over
    /// `content`; empty results count as no text.
    fn extract_text(&self) -> Option<String> {
        if let Some(parts) = &self.parts {
            let text = parts
                .iter()
                .filter_map(MessagePart::text_value)
                .collect::<Vec<_>>()
                .join("\n");
            return (!text.is_empty()).then_some(text);
        }

        match &self.content {
            Some(MessageContent::Text(text)) if !text.is_empty() => Some(text.clone()),
            Some(MessageContent::Blocks(blocks)) => blocks
                .first()
                .and_then(|block| block.get("text"))
                .and_then(JsonValue::as_str)
                .filter(|text| !text.is_empty())
                .map(String::from),
            _ => None,
        }
    }
}

// ============================================================================
// PAYLOAD PARSING
// ============================================================================

/// Parse a payload attribute as a JSON array of messages.
///
/// Returns `None` when the value is not a JSON array; elements that are not
/// message objects are skipped individually so one odd entry does not poison
/// the rest.
fn parse_messages(raw: &str, context: &str) -> Option<Vec<RawChatMessage>> {
    let values: Vec<JsonValue> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::trace!(
                context,
                error = %e,
                preview = %truncate_for_log(raw, 100),
                "payload is not a JSON message array"
            );
            return None;
        }
    };

    Some(
        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::trace!(context, error = %e, "skipping malformed message entry");
                    None
                }
            })
            .collect(),
    )
}

/// Truncate a string for logging purposes (UTF-8 safe).
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

// ============================================================================
// USER CONTENT
// ============================================================================

/// Extract the user prompt of a model call.
///
/// Selects the last `user` message with a non-empty payload. When the
/// attribute does not parse as a message array, the raw attribute string is
/// returned as-is (best-effort, never an error).
pub(crate) fn extract_user_text(attrs: &AttributeMap) -> Option<String> {
    let raw = attrs
        .get(keys::GEN_AI_INPUT_MESSAGES)
        .or_else(|| attrs.get(keys::GEN_AI_REQUEST_MESSAGES))?;

    let Some(messages) = parse_messages(raw, "input messages") else {
        return (!raw.is_empty()).then(|| raw.to_string());
    };

    messages
        .iter()
        .rev()
        .find(|m| m.has_role(ROLE_USER) && m.has_payload())
        .and_then(RawChatMessage::extract_text)
}

// ============================================================================
// ASSISTANT CONTENT
// ============================================================================

/// Extract the assistant reply of a model call.
///
/// Selects the last `assistant` message with extractable text from the
/// output payload. When the payload is absent, malformed, or yields no
/// text, falls back to the legacy flat response attributes.
pub(crate) fn extract_assistant_text(attrs: &AttributeMap) -> Option<String> {
    if let Some(raw) = attrs.get(keys::GEN_AI_OUTPUT_MESSAGES)
        && let Some(messages) = parse_messages(raw, "output messages")
        && let Some(text) = messages
            .iter()
            .rev()
            .filter(|m| m.has_role(ROLE_ASSISTANT))
            .find_map(RawChatMessage::extract_text)
    {
        return Some(text);
    }

    attrs
        .get(keys::GEN_AI_RESPONSE_TEXT)
        .or_else(|| attrs.get(keys::GEN_AI_RESPONSE_OBJECT))
        .filter(|raw| !raw.is_empty())
        .map(String::from)
}

// ============================================================================
// SPAN-LEVEL FIELDS
// ============================================================================

/// Caller identity recorded on the span, in precedence order.
pub(crate) fn extract_user_identity(attrs: &AttributeMap) -> Option<String> {
    attrs.get_first(USER_IDENTITY_KEYS).map(String::from)
}

/// Total token usage of a model call.
pub(crate) fn extract_total_tokens(attrs: &AttributeMap) -> Option<i64> {
    attrs
        .get_i64(keys::GEN_AI_USAGE_TOTAL_TOKENS)
        .or_else(|| attrs.get_i64(keys::GEN_AI_COST_TOTAL_TOKENS))
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
