//! Turn building and merging.
//!
//! A turn pairs one generation span with the tool executions that happened
//! strictly between it and the previous generation span. Turns without an
//! assistant reply are then collapsed: their tool calls are carried forward
//! so they attach to the next exchange that did produce a reply, instead of
//! vanishing.

use chrono::{DateTime, Utc};

use crate::domain::spans::{SpanNode, SpanStatus};

use super::types::{ConversationTurn, ToolCall};
use super::{content, keys};

// ============================================================================
// TURN BUILDING
// ============================================================================

/// Build one turn per generation span, in ascending start order.
///
/// Turn *i* owns the tool spans whose start lies strictly inside
/// `(start[i-1], start[i])`; the first window opens at the Unix epoch. A
/// tool span landing exactly on a window bound belongs to neither side.
pub(crate) fn build_turns<'a>(
    generations: &[&'a SpanNode],
    tools: &[&'a SpanNode],
) -> Vec<ConversationTurn<'a>> {
    let mut turns = Vec::with_capacity(generations.len());
    let mut window_start = DateTime::UNIX_EPOCH;

    for &span in generations {
        let attrs = &span.attributes;
        turns.push(ConversationTurn {
            span,
            tool_calls: tool_calls_between(tools, window_start, span.start),
            user_text: content::extract_user_text(attrs),
            assistant_text: content::extract_assistant_text(attrs),
            user_identity: content::extract_user_identity(attrs),
            total_tokens: content::extract_total_tokens(attrs),
        });
        window_start = span.start;
    }

    turns
}

fn tool_calls_between(
    tools: &[&SpanNode],
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> Vec<ToolCall> {
    tools
        .iter()
        .copied()
        .filter(|span| span.start > after && span.start < before)
        .filter_map(tool_call_from_span)
        .collect()
}

fn tool_call_from_span(span: &SpanNode) -> Option<ToolCall> {
    let Some(name) = span.attributes.get(keys::GEN_AI_TOOL_NAME) else {
        tracing::debug!(span_id = %span.span_id, "tool span has no tool name, skipping");
        return None;
    };
    Some(ToolCall {
        name: name.to_string(),
        span_id: span.span_id.clone(),
        has_error: tool_has_error(span),
    })
}

/// Decide the error flag of a tool call.
///
/// Explicit signals win: an `Error` span status, or a failed
/// `gen_ai.tool.status`, always mark the call errored. Recorded exceptions
/// only count when the span status is `Unset`; an explicit `Ok` overrides
/// them.
pub(crate) fn tool_has_error(span: &SpanNode) -> bool {
    if span.status == SpanStatus::Error {
        return true;
    }
    if span
        .attributes
        .get(keys::GEN_AI_TOOL_STATUS)
        .is_some_and(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("failed"))
    {
        return true;
    }
    span.status == SpanStatus::Unset && span.error_count > 0
}

// ============================================================================
// TURN MERGING
// ============================================================================

/// Tool calls awaiting an exchange to attach to.
#[derive(Debug, Default)]
struct MergeState {
    pending_tool_calls: Vec<ToolCall>,
}

/// Collapse turns without an assistant reply, forwarding orphaned tool calls.
///
/// Single forward fold over the built turns. The decision table, keyed on
/// (assistant text, tool calls, user text):
///
/// | assistant | tools | user | action |
/// |-----------|-------|------|--------|
/// | yes       | any   | any  | emit with pending + own calls; clear pending |
/// | no        | yes   | yes  | emit without calls; carry pending + own      |
/// | no        | yes   | no   | carry pending + own                          |
/// | no        | no    | yes  | emit with pending; clear pending             |
/// | no        | no    | no   | drop; pending unchanged                      |
///
/// Tool calls still pending after the last turn never had a completed
/// exchange to attach to and are dropped.
pub(crate) fn merge_turns(turns: Vec<ConversationTurn<'_>>) -> Vec<ConversationTurn<'_>> {
    let mut merged = Vec::with_capacity(turns.len());
    let mut state = MergeState::default();

    for mut turn in turns {
        match (
            turn.has_assistant_text(),
            turn.has_tool_calls(),
            turn.has_user_text(),
        ) {
            // Completed exchange: adopt everything accumulated so far.
            (true, _, _) => {
                let mut calls = std::mem::take(&mut state.pending_tool_calls);
                calls.append(&mut turn.tool_calls);
                turn.tool_calls = calls;
                merged.push(turn);
            }
            // User spoke but the model only called tools: surface the user
            // message now, the calls belong to a later exchange.
            (false, true, true) => {
                state.pending_tool_calls.append(&mut turn.tool_calls);
                merged.push(turn);
            }
            // Tool-only turn: nothing to show yet.
            (false, true, false) => {
                state.pending_tool_calls.append(&mut turn.tool_calls);
            }
            // User-only turn: flush pending calls alongside it.
            (false, false, true) => {
                turn.tool_calls = std::mem::take(&mut state.pending_tool_calls);
                merged.push(turn);
            }
            // Nothing of substance.
            (false, false, false) => {}
        }
    }

    if !state.pending_tool_calls.is_empty() {
        tracing::debug!(
            count = state.pending_tool_calls.len(),
            "dropping tool calls with no completed exchange"
        );
    }

    merged
}

#[cfg(test)]
#[path = "turns_tests.rs"]
mod tests;
