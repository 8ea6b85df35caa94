use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use super::SharedState;
use crate::agents::{
    Classification, ConversationMessage, ResponseTrace, SupportQuery, UserContext,
};
use crate::error::{AppError, McpError, McpResult, StorageError};
use crate::storage::{FeedbackType, Invocation};

/// Arguments of the `support_query` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportQueryParams {
    pub text: String,
    #[serde(default)]
    pub history: Vec<ConversationMessage>,
    #[serde(default)]
    pub user_context: Option<UserContext>,
    #[serde(default)]
    pub trace_hint: Option<String>,
}

/// Result of the `support_query` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportQueryResult {
    pub query_id: String,
    pub answer: String,
    pub source_type: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    pub trace: ResponseTrace,
}

/// Arguments of the `support_feedback` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackParams {
    pub query_id: String,
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Result of the `support_feedback` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub status: String,
    pub message: String,
}

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "support_query" => handle_support_query(state, arguments).await,
        "support_feedback" => handle_support_feedback(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// Handle support_query: route the question and return the answer with its trace
async fn handle_support_query(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SupportQueryParams = parse_arguments("support_query", arguments)?;

    let user = params.user_context.unwrap_or_else(|| {
        UserContext::new(
            state.config.support.default_username.clone(),
            state.config.support.default_role.clone(),
        )
    });
    let query = SupportQuery::new(params.text).with_history(params.history);

    let response = state
        .router
        .route(&query, &user, params.trace_hint.as_deref())
        .await
        .map_err(McpError::from)?;

    let result = SupportQueryResult {
        query_id: response.trace.query_id.clone(),
        answer: response.answer,
        source_type: response.source_type,
        follow_up_question: response.follow_up_question,
        ticket_id: response.ticket_id,
        trace: response.trace,
    };

    serde_json::to_value(result).map_err(McpError::Json)
}

/// Handle support_feedback: attach feedback to an existing query record
async fn handle_support_feedback(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    let start = Instant::now();
    let params: FeedbackParams = parse_arguments("support_feedback", arguments)?;

    if params.query_id.trim().is_empty() {
        return Err(McpError::InvalidParameters {
            tool_name: "support_feedback".to_string(),
            message: "query_id cannot be empty".to_string(),
        });
    }

    let invocation = Invocation::new(
        "support.feedback",
        serde_json::to_value(&params).unwrap_or_default(),
    )
    .with_query(&params.query_id);

    let outcome = state
        .storage
        .record_feedback(&params.query_id, params.feedback_type, params.comment.clone())
        .await;
    let latency = start.elapsed().as_millis() as i64;

    let invocation = match &outcome {
        Ok(()) => invocation.success(serde_json::json!({"status": "success"}), latency),
        Err(e) => invocation.failure(e.to_string(), latency),
    };
    if let Err(e) = state.storage.log_invocation(&invocation).await {
        warn!(error = %e, "Failed to log feedback invocation");
    }

    match outcome {
        Ok(()) => {
            info!(
                query_id = %params.query_id,
                feedback_type = %params.feedback_type,
                "Feedback recorded"
            );
            let result = FeedbackResult {
                status: "success".to_string(),
                message: "Feedback recorded successfully".to_string(),
            };
            serde_json::to_value(result).map_err(McpError::Json)
        }
        Err(StorageError::QueryNotFound { query_id }) => {
            warn!(query_id = %query_id, "Feedback for unknown query");
            Err(McpError::ExecutionFailed {
                message: format!("Query not found: {}", query_id),
            })
        }
        Err(e) => Err(AppError::from(e).into()),
    }
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
