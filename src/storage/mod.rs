//! Storage layer for query records, feedback and the invocation audit log.
//!
//! Every answered query gets one [`QueryRecord`] keyed by `query_id`. Feedback mutates that
//! record in place and is rejected when the record does not exist.

mod sqlite;


pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::{AgentResponse, Classification, UserContext};
use crate::error::StorageResult;

/// Persisted query/answer pair with optional feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Join key between the answer and any later feedback.
    pub query_id: String,
    /// Raw query text as received.
    pub query_text: String,
    /// Answer returned to the caller.
    pub answer: String,
    /// Category that produced the answer.
    pub source_type: Classification,
    /// Clarification question, for FOLLOW_UP answers.
    pub follow_up_question: Option<String>,
    /// Ticket id, for ESCALATION answers.
    pub ticket_id: Option<String>,
    /// Identifier of this turn.
    pub run_id: String,
    /// Identifier of the previous turn, when resolvable.
    pub parent_run_id: Option<String>,
    /// Username of the asker.
    pub username: String,
    /// Role of the asker.
    pub role: String,
    /// When the answer was produced.
    pub created_at: DateTime<Utc>,
    /// Feedback, once submitted.
    pub feedback: Option<Feedback>,
}

/// Feedback attached to a query record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Positive or negative.
    pub feedback_type: FeedbackType,
    /// Optional free-text comment.
    pub comment: Option<String>,
    /// When the feedback was (last) submitted.
    pub submitted_at: DateTime<Utc>,
}

/// Feedback polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    /// The answer helped.
    Positive,
    /// The answer did not help.
    Negative,
}

impl FeedbackType {
    /// Get the feedback type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Positive => "positive",
            FeedbackType::Negative => "negative",
        }
    }
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(FeedbackType::Positive),
            "negative" => Ok(FeedbackType::Negative),
            _ => Err(format!("Unknown feedback type: {}", s)),
        }
    }
}

impl QueryRecord {
    /// Build the record for a routed response.
    pub fn from_response(
        query_text: impl Into<String>,
        response: &AgentResponse,
        user: &UserContext,
    ) -> Self {
        Self {
            query_id: response.trace.query_id.clone(),
            query_text: query_text.into(),
            answer: response.answer.clone(),
            source_type: response.source_type,
            follow_up_question: response.follow_up_question.clone(),
            ticket_id: response.ticket_id.clone(),
            run_id: response.trace.run_id.clone(),
            parent_run_id: response.trace.parent_run_id.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
            created_at: Utc::now(),
            feedback: None,
        }
    }
}

/// Audit log entry for one routed query or tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Unique invocation identifier.
    pub id: String,
    /// Query this invocation answered, when known.
    pub query_id: Option<String>,
    /// Name of the tool or component invoked.
    pub tool_name: String,
    /// Input parameters as JSON.
    pub input: serde_json::Value,
    /// Output result as JSON (if successful).
    pub output: Option<serde_json::Value>,
    /// Name of the Langbase pipe called.
    pub pipe_name: Option<String>,
    /// Latency in milliseconds.
    pub latency_ms: Option<i64>,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Error message (if failed).
    pub error: Option<String>,
    /// When the invocation occurred.
    pub created_at: DateTime<Utc>,
}

impl Invocation {
    /// Create a new invocation log entry
    pub fn new(tool_name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query_id: None,
            tool_name: tool_name.into(),
            input,
            output: None,
            pipe_name: None,
            latency_ms: None,
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Set the query ID
    pub fn with_query(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Set the pipe name
    pub fn with_pipe(mut self, pipe_name: impl Into<String>) -> Self {
        self.pipe_name = Some(pipe_name.into());
        self
    }

    /// Mark as successful with output
    pub fn success(mut self, output: serde_json::Value, latency_ms: i64) -> Self {
        self.success = true;
        self.output = Some(output);
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark as failed with error
    pub fn failure(mut self, error: impl Into<String>, latency_ms: i64) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Persistence operations used by the router and the MCP handlers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert the record for a freshly produced answer.
    async fn create_query_record(&self, record: &QueryRecord) -> StorageResult<()>;

    /// Fetch a record by query id.
    async fn get_query_record(&self, query_id: &str) -> StorageResult<Option<QueryRecord>>;

    /// Attach feedback to an existing record, replacing any earlier feedback.
    ///
    /// Fails with `StorageError::QueryNotFound` when no record has this id.
    async fn record_feedback(
        &self,
        query_id: &str,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> StorageResult<()>;

    /// Append an invocation to the audit log.
    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()>;

    /// Invocations recorded for a query, oldest first.
    async fn get_invocations(&self, query_id: &str) -> StorageResult<Vec<Invocation>>;
}
