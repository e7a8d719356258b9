//! Message projection.
//!
//! Flattens merged turns into the final display list: one user message and
//! one assistant message per turn at most, deduplicated on (role, content)
//! with the first occurrence winning, sorted ascending by timestamp.

use chrono::TimeDelta;
use rustc_hash::FxHashSet;

use super::types::{ConversationMessage, ConversationTurn, MessageRole};

/// Tie-break offset keeping an assistant reply directly after its user
/// prompt when both carry the span's start timestamp.
const ASSISTANT_OFFSET_MS: i64 = 1;

/// Project merged turns into the ordered message list.
pub(crate) fn project_messages(turns: &[ConversationTurn<'_>]) -> Vec<ConversationMessage> {
    let mut messages = Vec::new();
    let mut seen: FxHashSet<(MessageRole, String)> = FxHashSet::default();

    for turn in turns {
        if let Some(user_text) = &turn.user_text
            && seen.insert((MessageRole::User, user_text.clone()))
        {
            messages.push(ConversationMessage {
                id: message_id(&turn.span.span_id, MessageRole::User),
                role: MessageRole::User,
                content: user_text.clone(),
                timestamp: turn.span.start,
                span_id: turn.span.span_id.clone(),
                user_identity: turn.user_identity.clone(),
                tool_calls: Vec::new(),
                total_tokens: None,
            });
        }

        if let Some(assistant_text) = &turn.assistant_text
            && seen.insert((MessageRole::Assistant, assistant_text.clone()))
        {
            messages.push(ConversationMessage {
                id: message_id(&turn.span.span_id, MessageRole::Assistant),
                role: MessageRole::Assistant,
                content: assistant_text.clone(),
                timestamp: turn.span.start + TimeDelta::milliseconds(ASSISTANT_OFFSET_MS),
                span_id: turn.span.span_id.clone(),
                user_identity: None,
                tool_calls: turn.tool_calls.clone(),
                total_tokens: turn.total_tokens,
            });
        }
    }

    // Stable sort: turns were visited in generation order, which remains the
    // tie-break for identical timestamps.
    messages.sort_by_key(|m| m.timestamp);
    messages
}

fn message_id(span_id: &str, role: MessageRole) -> String {
    format!("{}-{}", span_id, role.as_str())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::domain::spans::SpanNode;

    use super::super::types::ToolCall;
    use super::*;

    fn make_span(id: &str, secs: i64) -> SpanNode {
        SpanNode::new(id, DateTime::from_timestamp(secs, 0).unwrap())
    }

    fn make_turn<'a>(
        span: &'a SpanNode,
        user: Option<&str>,
        assistant: Option<&str>,
    ) -> ConversationTurn<'a> {
        ConversationTurn {
            span,
            tool_calls: Vec::new(),
            user_text: user.map(String::from),
            assistant_text: assistant.map(String::from),
            user_identity: None,
            total_tokens: None,
        }
    }

    fn timestamps(messages: &[ConversationMessage]) -> Vec<DateTime<Utc>> {
        messages.iter().map(|m| m.timestamp).collect()
    }

    #[test]
    fn test_user_then_assistant_ordering() {
        let span = make_span("s1", 10);
        let turns = vec![make_turn(&span, Some("hi"), Some("hello"))];
        let messages = project_messages(&turns);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].id, "s1-user");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].id, "s1-assistant");
        assert_eq!(
            messages[1].timestamp - messages[0].timestamp,
            TimeDelta::milliseconds(1)
        );
    }

    #[test]
    fn test_output_sorted_by_timestamp() {
        let late = make_span("late", 20);
        let early = make_span("early", 10);
        // Turns arrive in generation order; projection re-sorts regardless.
        let turns = vec![
            make_turn(&early, Some("first"), Some("first reply")),
            make_turn(&late, Some("second"), Some("second reply")),
        ];
        let messages = project_messages(&turns);
        let ts = timestamps(&messages);
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(messages[0].span_id, "early");
    }

    #[test]
    fn test_duplicate_content_first_occurrence_wins() {
        let first = make_span("first", 10);
        let second = make_span("second", 20);
        let turns = vec![
            make_turn(&first, Some("hi"), Some("same reply")),
            make_turn(&second, Some("hi again"), Some("same reply")),
        ];
        let messages = project_messages(&turns);

        let assistants: Vec<_> = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .collect();
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].span_id, "first");
        // The second turn's distinct user text still comes through.
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.role == MessageRole::User)
                .count(),
            2
        );
    }

    #[test]
    fn test_same_content_different_roles_both_kept() {
        let span = make_span("s1", 10);
        let turns = vec![make_turn(&span, Some("echo"), Some("echo"))];
        let messages = project_messages(&turns);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_identity_and_tool_calls_on_correct_roles() {
        let span = make_span("s1", 10);
        let mut turn = make_turn(&span, Some("hi"), Some("hello"));
        turn.user_identity = Some("ada@example.com".to_string());
        turn.total_tokens = Some(128);
        turn.tool_calls = vec![ToolCall {
            name: "search".to_string(),
            span_id: "t1".to_string(),
            has_error: false,
        }];

        let messages = project_messages(&[turn]);
        let user = &messages[0];
        let assistant = &messages[1];

        assert_eq!(user.user_identity.as_deref(), Some("ada@example.com"));
        assert!(user.tool_calls.is_empty());
        assert_eq!(user.total_tokens, None);

        assert_eq!(assistant.user_identity, None);
        assert_eq!(assistant.tool_calls.len(), 1);
        assert_eq!(assistant.total_tokens, Some(128));
    }

    #[test]
    fn test_empty_turns_produce_empty_output() {
        assert!(project_messages(&[]).is_empty());
    }
}
