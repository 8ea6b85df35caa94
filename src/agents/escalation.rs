//! Escalation handler - turns a conversation into a support ticket
//!
//! Ticket creation never fails from the caller's point of view: when the ticketing gateway
//! is disabled or errors, [`DEGRADED_TICKET_ID`] is returned and the failure is logged.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ConversationMessage, UserContext};
use crate::tickets::{TicketGateway, DEGRADED_TICKET_ID};

/// Prefix a client puts on an explicit escalation request.
pub const ESCALATION_PREFIX: &str = "ESCALATE:";

/// Marker separating the escalated question from extra details.
pub const DETAILS_MARKER: &str = "Additional details:";

const SUMMARY_QUERY_CHARS: usize = 80;

/// An escalation request split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRequest {
    pub core_query: String,
    pub additional_details: Option<String>,
}

/// Split an escalation query into the core question and any additional details.
pub fn parse_escalation(query: &str) -> EscalationRequest {
    let trimmed = query.trim();
    let body = match trimmed.get(..ESCALATION_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(ESCALATION_PREFIX) => {
            trimmed[ESCALATION_PREFIX.len()..].trim_start()
        }
        _ => trimmed,
    };

    match body.split_once(DETAILS_MARKER) {
        Some((core, details)) => EscalationRequest {
            core_query: core.trim().to_string(),
            additional_details: Some(details.trim().to_string()).filter(|d| !d.is_empty()),
        },
        None => EscalationRequest {
            core_query: body.trim().to_string(),
            additional_details: None,
        },
    }
}

/// Numbered, role-tagged transcript. Messages with unknown roles are omitted.
pub fn format_transcript(history: &[ConversationMessage]) -> String {
    let lines: Vec<String> = history
        .iter()
        .filter_map(|m| m.role.as_tag().map(|tag| (tag, m.content.trim())))
        .enumerate()
        .map(|(i, (tag, content))| format!("{}. [{}] {}", i + 1, tag, content))
        .collect();

    if lines.is_empty() {
        "No prior conversation.".to_string()
    } else {
        lines.join("\n")
    }
}

/// Ticket summary: requester plus the start of the query.
pub fn format_summary(request: &EscalationRequest, user: &UserContext) -> String {
    let query = &request.core_query;
    let shortened = if query.chars().count() > SUMMARY_QUERY_CHARS {
        let head: String = query.chars().take(SUMMARY_QUERY_CHARS).collect();
        format!("{}...", head.trim_end())
    } else {
        query.clone()
    };
    format!("Support Request from {}: {}", user.username, shortened)
}

/// Ticket description with user, query, transcript and technical sections.
pub fn format_description(
    request: &EscalationRequest,
    user: &UserContext,
    history: &[ConversationMessage],
    parent_run_id: Option<&str>,
) -> String {
    let mut query_section = request.core_query.clone();
    if let Some(details) = &request.additional_details {
        query_section.push_str(&format!("\n\nAdditional details: {}", details));
    }

    format!(
        "=== User Information ===\nUsername: {}\nRole: {}\n\n\
         === Escalation Query ===\n{}\n\n\
         === Conversation Transcript ===\n{}\n\n\
         === Technical Information ===\nParent run ID: {}\nCreated at: {}",
        user.username,
        user.role,
        query_section,
        format_transcript(history),
        parent_run_id.unwrap_or("none"),
        Utc::now().to_rfc3339(),
    )
}

/// Creates support tickets through the ticketing gateway
#[derive(Clone)]
pub struct EscalationHandler {
    tickets: Arc<dyn TicketGateway>,
}

impl EscalationHandler {
    /// Create a new escalation handler
    pub fn new(tickets: Arc<dyn TicketGateway>) -> Self {
        Self { tickets }
    }

    /// Create a ticket for the query and transcript. Returns the ticket id or the degraded sentinel.
    pub async fn create_ticket(
        &self,
        query: &str,
        user: &UserContext,
        history: &[ConversationMessage],
        parent_run_id: Option<&str>,
    ) -> String {
        let request = parse_escalation(query);
        let summary = format_summary(&request, user);
        let description = format_description(&request, user, history, parent_run_id);
        let issue_type = self.tickets.default_issue_type();

        match self.tickets.create(&summary, &description, &issue_type).await {
            Ok(ticket_id) => {
                info!(ticket_id = %ticket_id, username = %user.username, "Support ticket created");
                ticket_id
            }
            Err(e) => {
                warn!(
                    error = %e,
                    username = %user.username,
                    sentinel = DEGRADED_TICKET_ID,
                    "Ticket creation failed, returning degraded ticket id"
                );
                DEGRADED_TICKET_ID.to_string()
            }
        }
    }
}
