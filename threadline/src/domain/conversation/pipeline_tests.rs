//! End-to-end tests for the reconstruction pipeline.

use chrono::DateTime;
use serde_json::json;

use super::*;

fn span_at(id: &str, secs: i64) -> SpanNode {
    SpanNode::new(id, DateTime::from_timestamp(secs, 0).unwrap())
}

fn generation_span(id: &str, secs: i64, user: Option<&str>, assistant: Option<&str>) -> SpanNode {
    let mut span = span_at(id, secs).with_attr(keys::GEN_AI_OPERATION_NAME, "chat");
    if let Some(user) = user {
        span = span.with_attr(
            keys::GEN_AI_INPUT_MESSAGES,
            json!([{"role": "user", "content": user}]).to_string(),
        );
    }
    if let Some(assistant) = assistant {
        span = span.with_attr(
            keys::GEN_AI_OUTPUT_MESSAGES,
            json!([{"role": "assistant", "content": assistant}]).to_string(),
        );
    }
    span
}

fn tool_span(id: &str, secs: i64, name: &str) -> SpanNode {
    span_at(id, secs)
        .with_attr(keys::GEN_AI_OPERATION_NAME, "execute_tool")
        .with_attr(keys::GEN_AI_TOOL_NAME, name)
}

#[test]
fn test_single_exchange() {
    let spans = vec![generation_span("g1", 1, Some("hi"), Some("hello"))];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "hello");
    assert!(messages[0].timestamp < messages[1].timestamp);
}

#[test]
fn test_empty_input_empty_output() {
    assert!(reconstruct_conversation(&[]).is_empty());
}

#[test]
fn test_input_order_does_not_matter() {
    let mut spans = vec![
        generation_span("g2", 20, Some("second"), Some("second reply")),
        tool_span("t1", 15, "search"),
        generation_span("g1", 10, Some("first"), Some("first reply")),
    ];
    let forward = reconstruct_conversation(&spans);
    spans.reverse();
    let backward = reconstruct_conversation(&spans);

    let contents: Vec<_> = forward.iter().map(|m| m.content.clone()).collect();
    assert_eq!(
        contents,
        backward.iter().map(|m| m.content.clone()).collect::<Vec<_>>()
    );
    assert_eq!(
        contents,
        vec!["first", "first reply", "second", "second reply"]
    );
}

#[test]
fn test_tool_call_attaches_to_following_reply() {
    let spans = vec![
        generation_span("a", 10, Some("q1"), Some("r1")),
        tool_span("t", 15, "get_weather"),
        generation_span("b", 20, Some("q2"), Some("r2")),
    ];
    let messages = reconstruct_conversation(&spans);

    let reply_a = messages.iter().find(|m| m.span_id == "a" && m.role == MessageRole::Assistant);
    let reply_b = messages.iter().find(|m| m.span_id == "b" && m.role == MessageRole::Assistant);

    assert!(reply_a.unwrap().tool_calls.is_empty());
    let calls = &reply_b.unwrap().tool_calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_weather");
}

#[test]
fn test_tool_call_without_reply_is_dropped() {
    let spans = vec![
        generation_span("g", 10, Some("q"), Some("r")),
        tool_span("t", 15, "dangling"),
    ];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.tool_calls.is_empty()));
}

#[test]
fn test_orphaned_tool_calls_forward_to_next_exchange() {
    // The tool call lands in the window of a model call that produced no
    // reply at all; it must carry forward to the exchange that did.
    let spans = vec![
        generation_span("ask", 10, Some("What's the weather?"), None),
        tool_span("t", 15, "get_weather"),
        generation_span("retry", 20, None, None),
        generation_span("reply", 30, None, Some("It's sunny.")),
    ];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].span_id, "ask");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].span_id, "reply");
    assert_eq!(messages[1].tool_calls.len(), 1);
    assert_eq!(messages[1].tool_calls[0].name, "get_weather");
}

#[test]
fn test_duplicate_assistant_content_first_wins() {
    let spans = vec![
        generation_span("first", 10, Some("q1"), Some("same reply")),
        generation_span("second", 20, Some("q2"), Some("same reply")),
    ];
    let messages = reconstruct_conversation(&spans);

    let assistants: Vec<_> = messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .collect();
    assert_eq!(assistants.len(), 1);
    assert_eq!(assistants[0].span_id, "first");
}

#[test]
fn test_no_duplicate_role_content_pairs() {
    let spans = vec![
        generation_span("a", 10, Some("hi"), Some("hello")),
        generation_span("b", 20, Some("hi"), Some("hello")),
        generation_span("c", 30, Some("hi"), Some("bye")),
    ];
    let messages = reconstruct_conversation(&spans);

    let mut pairs: Vec<_> = messages
        .iter()
        .map(|m| (m.role.as_str(), m.content.clone()))
        .collect();
    let before = pairs.len();
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), before);
}

#[test]
fn test_output_sorted_non_decreasing() {
    let spans = vec![
        generation_span("c", 30, Some("three"), Some("third reply")),
        generation_span("a", 10, Some("one"), Some("first reply")),
        tool_span("t1", 25, "search"),
        generation_span("b", 20, Some("two"), Some("second reply")),
    ];
    let messages = reconstruct_conversation(&spans);
    assert!(
        messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
}

#[test]
fn test_irrelevant_spans_are_ignored() {
    let spans = vec![
        span_at("db", 5).with_attr("db.system", "postgres"),
        generation_span("g", 10, Some("hi"), Some("hello")),
        span_at("http", 15).with_attr("http.request.method", "GET"),
    ];
    let messages = reconstruct_conversation(&spans);
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_malformed_payload_degrades_to_legacy_fallback() {
    let spans = vec![
        span_at("g", 10)
            .with_attr(keys::GEN_AI_OPERATION_NAME, "chat")
            .with_attr(keys::GEN_AI_OUTPUT_MESSAGES, "{malformed")
            .with_attr(keys::GEN_AI_RESPONSE_TEXT, "legacy reply"),
    ];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, "legacy reply");
}

#[test]
fn test_user_identity_surfaces_on_user_message() {
    let spans = vec![
        generation_span("g", 10, Some("hi"), Some("hello")).with_attr(keys::USER_ID, "u-42"),
    ];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages[0].user_identity.as_deref(), Some("u-42"));
    assert_eq!(messages[1].user_identity, None);
}

#[test]
fn test_token_usage_surfaces_on_assistant_message() {
    let spans = vec![
        generation_span("g", 10, Some("hi"), Some("hello"))
            .with_attr(keys::GEN_AI_USAGE_TOTAL_TOKENS, "256"),
    ];
    let messages = reconstruct_conversation(&spans);

    assert_eq!(messages[0].total_tokens, None);
    assert_eq!(messages[1].total_tokens, Some(256));
}

#[test]
fn test_multi_turn_agent_trace() {
    // Two-exchange agent run with a tool call inside each exchange window.
    let spans = vec![
        generation_span("g1", 10, Some("Find flights to Lisbon"), None),
        tool_span("t1", 12, "search_flights"),
        generation_span("g2", 15, Some("Find flights to Lisbon"), Some("Found 3 flights.")),
        generation_span("g3", 20, Some("Book the cheapest"), None),
        tool_span("t2", 22, "book_flight"),
        generation_span("g4", 25, Some("Book the cheapest"), Some("Booked!")),
    ];
    let messages = reconstruct_conversation(&spans);

    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "Find flights to Lisbon",
            "Found 3 flights.",
            "Book the cheapest",
            "Booked!",
        ]
    );
    assert_eq!(messages[1].tool_calls[0].name, "search_flights");
    assert_eq!(messages[3].tool_calls[0].name, "book_flight");
}
