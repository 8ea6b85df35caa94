//! Cross-turn trace continuity.
//!
//! The server keeps no sessions. A turn's `parent_run_id` is recovered from what the client
//! sends back, by trying a fixed list of lookups in order. Every lookup returns `Option`;
//! none of them can fail the request.
//!
//! Order: a non-blank explicit `trace_hint` wins over the transcript, then the latest
//! assistant message's `run_id`, then that message's `query_id`. History alone drives
//! linking whenever the caller sends no hint.

use tracing::debug;

use super::{ConversationMessage, MessageRole};

/// Inputs available for resolving the parent of a turn.
#[derive(Debug, Clone, Copy)]
pub struct TraceContext<'a> {
    /// Explicit hint supplied alongside the query.
    pub hint: Option<&'a str>,
    /// Client-held transcript, oldest first.
    pub history: &'a [ConversationMessage],
}

type TraceStrategy = fn(&TraceContext<'_>) -> Option<String>;

/// Lookups tried in order; the first hit wins.
const STRATEGIES: &[(&str, TraceStrategy)] = &[
    ("explicit_hint", explicit_hint),
    ("assistant_run_id", latest_assistant_run_id),
    ("assistant_query_id", latest_assistant_query_id),
];

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn latest_assistant(history: &[ConversationMessage]) -> Option<&ConversationMessage> {
    history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
}

fn explicit_hint(ctx: &TraceContext<'_>) -> Option<String> {
    non_blank(ctx.hint)
}

fn latest_assistant_run_id(ctx: &TraceContext<'_>) -> Option<String> {
    ctx.history
        .iter()
        .rev()
        .filter(|m| m.role == MessageRole::Assistant)
        .find_map(|m| non_blank(m.trace.as_ref().and_then(|t| t.run_id.as_deref())))
}

fn latest_assistant_query_id(ctx: &TraceContext<'_>) -> Option<String> {
    latest_assistant(ctx.history)
        .and_then(|m| non_blank(m.trace.as_ref().and_then(|t| t.query_id.as_deref())))
}

/// Resolve the parent run id for a new turn, or `None` when nothing usable was sent.
pub fn resolve_parent_run_id(
    hint: Option<&str>,
    history: &[ConversationMessage],
) -> Option<String> {
    let ctx = TraceContext { hint, history };

    for (name, strategy) in STRATEGIES {
        if let Some(parent) = strategy(&ctx) {
            debug!(strategy = %name, parent_run_id = %parent, "Resolved parent run id");
            return Some(parent);
        }
    }

    debug!(history_len = history.len(), "No parent run id resolved");
    None
}
