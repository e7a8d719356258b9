//! Threadline - Conversation Reconstruction from GenAI Trace Spans
//!
//! Rebuilds ordered conversation threads (user prompts, assistant replies,
//! tool invocations) from flat, unordered collections of GenAI observability
//! spans.
//!
//! # Pipeline
//!
//! ```text
//! 1. CLASSIFY   Partition spans into generation spans and tool spans
//! 2. EXTRACT    Parse user/assistant text from message payload attributes
//! 3. BUILD      Pair each generation span with the tool spans before it
//! 4. MERGE      Forward orphaned tool calls to the next completed exchange
//! 5. PROJECT    Flatten turns into a sorted, deduplicated message list
//! ```
//!
//! The whole pipeline is a synchronous pure function: no I/O, no shared
//! state, and no failure path. Malformed payloads degrade to fallbacks and
//! are logged via `tracing`, never surfaced as errors.
//!
//! # Example
//!
//! ```
//! use threadline::{SpanNode, reconstruct_conversation};
//! use chrono::DateTime;
//!
//! let span = SpanNode::new("a1b2", DateTime::from_timestamp(1, 0).unwrap())
//!     .with_attr("gen_ai.operation.name", "chat")
//!     .with_attr("gen_ai.input.messages", r#"[{"role":"user","content":"hi"}]"#)
//!     .with_attr("gen_ai.output.messages", r#"[{"role":"assistant","content":"hello"}]"#);
//!
//! let messages = reconstruct_conversation(&[span]);
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].content, "hi");
//! assert_eq!(messages[1].content, "hello");
//! ```

pub mod domain;

pub use domain::conversation::{
    ConversationMessage, MessageRole, ToolCall, reconstruct_conversation,
};
pub use domain::spans::otlp::spans_from_otlp;
pub use domain::spans::{AttributeMap, SpanNode, SpanStatus};
