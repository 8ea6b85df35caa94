//! Query classification, dispatch and the answering agents.
//!
//! - [`QueryRouter`]: classifies each query and dispatches it
//! - [`StaticKnowledgeAgent`]: answers from the document index
//! - [`DynamicDataAgent`]: answers from live game data via generated SQL
//! - [`HybridAgent`]: combines both
//! - [`EscalationHandler`]: turns a conversation into a support ticket
//!
//! All agents share the generation client via [`AgentCore`] composition.

mod core;
mod dynamic_data;
mod escalation;
mod hybrid;
mod router;
pub mod sql;
mod static_knowledge;
pub mod trace;

pub use self::core::*;
pub use dynamic_data::*;
pub use escalation::*;
pub use hybrid::*;
pub use router::*;
pub use static_knowledge::*;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Shared Utilities
// ============================================================================

/// Serialize a value to JSON for logging, with warning on failure.
pub(crate) fn serialize_for_log<T: serde::Serialize>(
    value: &T,
    context: &str,
) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize value for invocation log"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}

// ============================================================================
// Classification
// ============================================================================

/// Query category chosen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Answerable from documentation alone.
    Static,
    /// Needs live player or clan data.
    Dynamic,
    /// Needs both documentation and live data.
    Hybrid,
    /// Missing a required detail; ask for it.
    FollowUp,
    /// Hand off to human support.
    Escalation,
}

impl Classification {
    /// All categories, in prompt order.
    pub const ALL: [Classification; 5] = [
        Classification::Static,
        Classification::Dynamic,
        Classification::Hybrid,
        Classification::FollowUp,
        Classification::Escalation,
    ];

    /// Get the category label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Static => "STATIC",
            Classification::Dynamic => "DYNAMIC",
            Classification::Hybrid => "HYBRID",
            Classification::FollowUp => "FOLLOW_UP",
            Classification::Escalation => "ESCALATION",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    /// Parse a classifier label. Accepts any case, `-` or space for `_`, surrounding
    /// punctuation, and trailing commentary after the label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase().replace('-', "_");
        let core = upper.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_'));

        if let Some(found) = Self::from_label(&core.replace(' ', "_")) {
            return Ok(found);
        }

        core.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .find(|token| !token.is_empty())
            .and_then(Self::from_label)
            .ok_or_else(|| format!("Unknown classification: {}", s))
    }
}

// ============================================================================
// Conversation and Response Types
// ============================================================================

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person asking.
    User,
    /// An answer produced by this server.
    Assistant,
    /// A clarification question produced by this server.
    Followup,
    /// Client-side system notice.
    System,
    /// Any role this server does not know; skipped in transcripts.
    #[serde(other)]
    Unknown,
}

impl MessageRole {
    /// Uppercase tag used in ticket transcripts.
    pub fn as_tag(&self) -> Option<&'static str> {
        match self {
            MessageRole::User => Some("USER"),
            MessageRole::Assistant => Some("ASSISTANT"),
            MessageRole::Followup => Some("FOLLOWUP"),
            MessageRole::System => Some("SYSTEM"),
            MessageRole::Unknown => None,
        }
    }
}

/// Trace metadata a client re-embeds into the history it sends back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// One message of the client-held transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<MessageTrace>,
}

impl ConversationMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            trace: None,
        }
    }

    /// Create an assistant message carrying the trace of the response it shows
    pub fn assistant(content: impl Into<String>, trace: MessageTrace) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            trace: Some(trace),
        }
    }
}

/// Incoming query plus the transcript so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportQuery {
    pub text: String,
    #[serde(default)]
    pub history: Vec<ConversationMessage>,
}

impl SupportQuery {
    /// Create a query with no history
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            history: Vec::new(),
        }
    }

    /// Attach the prior transcript
    pub fn with_history(mut self, history: Vec<ConversationMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub username: String,
    pub role: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }
}

/// Lineage of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTrace {
    pub run_id: String,
    pub query_id: String,
    #[serde(default)]
    pub parent_run_id: Option<String>,
}

/// Routed answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    pub source_type: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    pub trace: ResponseTrace,
}

impl AgentResponse {
    /// Trace to embed in the assistant message of the next turn's history.
    pub fn message_trace(&self) -> MessageTrace {
        MessageTrace {
            run_id: Some(self.trace.run_id.clone()),
            query_id: Some(self.trace.query_id.clone()),
            source_type: Some(self.source_type.as_str().to_string()),
        }
    }
}
