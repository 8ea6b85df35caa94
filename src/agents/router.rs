//! Query router - classifies each query and dispatches it to one handler
//!
//! Phases: CLASSIFYING -> DISPATCHED(category) -> DONE. Explicit escalation requests skip
//! classification. A failed or unparseable classification falls back to HYBRID. Handlers
//! recover their own failures, so the only error `route` returns is input validation.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::trace::resolve_parent_run_id;
use super::{
    serialize_for_log, AgentCore, AgentResponse, Classification, DynamicDataAgent,
    EscalationHandler, HybridAgent, ResponseTrace, StaticKnowledgeAgent, SupportQuery,
    UserContext, ESCALATION_PREFIX,
};
use crate::config::{Config, PipeConfig};
use crate::data::DataGateway;
use crate::error::{AppResult, ToolError};
use crate::knowledge::DocumentIndex;
use crate::langbase::Generator;
use crate::prompts::{with_rules, CLASSIFIER_PROMPT, FOLLOW_UP_PROMPT};
use crate::storage::{Invocation, QueryRecord, Storage};
use crate::tickets::TicketGateway;

/// Phrases that send a query straight to escalation.
pub const ESCALATION_PHRASES: &[&str] = &[
    "speak to a human",
    "talk to a human",
    "need a human",
    "contact support",
    "escalate",
    "support ticket",
    "create a ticket",
    "speak to an agent",
    "talk to support",
    "need help from a person",
    "human support",
];

/// Answer attached to a clarification request.
pub const FOLLOW_UP_ANSWER: &str = "I need some additional information to help you better.";

/// Clarification question used when the follow-up pipe fails.
pub const FALLBACK_FOLLOW_UP_QUESTION: &str =
    "Could you please provide the specific player or clan name your question is about?";

/// Answer returned after an escalation.
pub const ESCALATION_ANSWER: &str = "I've created a support ticket for further assistance.";

/// True when the text explicitly asks for human support.
pub fn is_escalation_request(text: &str) -> bool {
    let trimmed = text.trim_start();
    let prefixed = trimmed
        .get(..ESCALATION_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ESCALATION_PREFIX));
    let lower = text.to_lowercase();
    prefixed || ESCALATION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Routing phase, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePhase {
    Classifying,
    Dispatched(Classification),
    Done,
}

impl fmt::Display for RoutePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePhase::Classifying => write!(f, "CLASSIFYING"),
            RoutePhase::Dispatched(c) => write!(f, "DISPATCHED({})", c),
            RoutePhase::Done => write!(f, "DONE"),
        }
    }
}

/// External collaborators injected into the router at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn Generator>,
    pub storage: Arc<dyn Storage>,
    pub gateway: Arc<dyn DataGateway>,
    pub index: Arc<dyn DocumentIndex>,
    pub tickets: Arc<dyn TicketGateway>,
}

/// Handler output before trace metadata is attached.
struct Dispatched {
    answer: String,
    follow_up_question: Option<String>,
    ticket_id: Option<String>,
}

impl Dispatched {
    fn answer(answer: String) -> Self {
        Self {
            answer,
            follow_up_question: None,
            ticket_id: None,
        }
    }
}

/// Classifies queries and dispatches them to the answering agents
pub struct QueryRouter {
    core: AgentCore,
    storage: Arc<dyn Storage>,
    static_agent: Arc<StaticKnowledgeAgent>,
    dynamic_agent: Arc<DynamicDataAgent>,
    hybrid_agent: HybridAgent,
    escalation: EscalationHandler,
    classifier_pipe: String,
    follow_up_pipe: String,
}

impl QueryRouter {
    /// Build the router and every agent it dispatches to.
    pub fn new(deps: Collaborators, pipes: &PipeConfig, row_limit: u32, top_k: usize) -> Self {
        let static_agent = Arc::new(StaticKnowledgeAgent::new(
            deps.generator.clone(),
            deps.index,
            pipes.static_qa.clone(),
            top_k,
        ));
        let dynamic_agent = Arc::new(DynamicDataAgent::new(
            deps.generator.clone(),
            deps.gateway,
            pipes,
            row_limit,
        ));
        let hybrid_agent = HybridAgent::new(
            deps.generator.clone(),
            static_agent.clone(),
            dynamic_agent.clone(),
            pipes.combiner.clone(),
        );

        Self {
            core: AgentCore::new(deps.generator),
            storage: deps.storage,
            static_agent,
            dynamic_agent,
            hybrid_agent,
            escalation: EscalationHandler::new(deps.tickets),
            classifier_pipe: pipes.classifier.clone(),
            follow_up_pipe: pipes.follow_up.clone(),
        }
    }

    /// Build the router from loaded configuration.
    pub fn from_config(deps: Collaborators, config: &Config) -> Self {
        Self::new(
            deps,
            &config.pipes,
            config.data_source.row_limit,
            config.knowledge.top_k,
        )
    }

    /// Route one query and return the answer with its trace.
    pub async fn route(
        &self,
        query: &SupportQuery,
        user: &UserContext,
        trace_hint: Option<&str>,
    ) -> AppResult<AgentResponse> {
        let start = Instant::now();
        let text = query.text.trim();

        if text.is_empty() {
            return Err(ToolError::Validation {
                field: "text".to_string(),
                reason: "Query text cannot be empty".to_string(),
            }
            .into());
        }

        let trace = ResponseTrace {
            run_id: Uuid::new_v4().to_string(),
            query_id: Uuid::new_v4().to_string(),
            parent_run_id: resolve_parent_run_id(trace_hint, &query.history),
        };

        let invocation = Invocation::new(
            "support.route",
            serialize_for_log(query, "support.route input"),
        )
        .with_query(&trace.query_id)
        .with_pipe(&self.classifier_pipe);

        let category = if is_escalation_request(text) {
            debug!(query_id = %trace.query_id, "Escalation requested explicitly, skipping classification");
            Classification::Escalation
        } else {
            debug!(query_id = %trace.query_id, phase = %RoutePhase::Classifying, "Routing");
            self.classify(text).await
        };

        debug!(
            query_id = %trace.query_id,
            phase = %RoutePhase::Dispatched(category),
            "Routing"
        );

        let dispatched = match category {
            Classification::Static => Dispatched::answer(self.static_agent.answer(text).await),
            Classification::Dynamic => {
                Dispatched::answer(self.dynamic_agent.answer(text, user).await)
            }
            Classification::Hybrid => Dispatched::answer(self.hybrid_agent.answer(text, user).await),
            Classification::FollowUp => Dispatched {
                answer: FOLLOW_UP_ANSWER.to_string(),
                follow_up_question: Some(self.follow_up_question(text).await),
                ticket_id: None,
            },
            Classification::Escalation => {
                let ticket_id = self
                    .escalation
                    .create_ticket(text, user, &query.history, trace.parent_run_id.as_deref())
                    .await;
                Dispatched {
                    answer: ESCALATION_ANSWER.to_string(),
                    follow_up_question: None,
                    ticket_id: Some(ticket_id),
                }
            }
        };

        let response = AgentResponse {
            answer: dispatched.answer,
            source_type: category,
            follow_up_question: dispatched.follow_up_question,
            ticket_id: dispatched.ticket_id,
            trace,
        };

        self.persist(text, &response, user, invocation, start).await;

        debug!(query_id = %response.trace.query_id, phase = %RoutePhase::Done, "Routing");
        info!(
            query_id = %response.trace.query_id,
            run_id = %response.trace.run_id,
            parent_run_id = ?response.trace.parent_run_id,
            classification = %response.source_type,
            latency_ms = start.elapsed().as_millis(),
            "Query routed"
        );

        Ok(response)
    }

    /// Classify the query. Failures and unknown labels fall back to HYBRID.
    async fn classify(&self, text: &str) -> Classification {
        let label = match self
            .core
            .complete(&self.classifier_pipe, with_rules(CLASSIFIER_PROMPT), text)
            .await
        {
            Ok(label) => label,
            Err(e) => {
                warn!(error = %e, "Classification failed, falling back to HYBRID");
                return Classification::Hybrid;
            }
        };

        match label.parse::<Classification>() {
            Ok(category) => category,
            Err(e) => {
                warn!(label = %label, error = %e, "Unrecognized classification, falling back to HYBRID");
                Classification::Hybrid
            }
        }
    }

    async fn follow_up_question(&self, text: &str) -> String {
        match self
            .core
            .complete(&self.follow_up_pipe, with_rules(FOLLOW_UP_PROMPT), text)
            .await
        {
            Ok(question) if !question.is_empty() => question,
            Ok(_) => FALLBACK_FOLLOW_UP_QUESTION.to_string(),
            Err(e) => {
                warn!(error = %e, "Follow-up generation failed, using fallback question");
                FALLBACK_FOLLOW_UP_QUESTION.to_string()
            }
        }
    }

    /// Store the query record and the audit entry. Failures are logged, not returned.
    async fn persist(
        &self,
        text: &str,
        response: &AgentResponse,
        user: &UserContext,
        invocation: Invocation,
        start: Instant,
    ) {
        let record = QueryRecord::from_response(text, response, user);
        if let Err(e) = self.storage.create_query_record(&record).await {
            error!(
                error = %e,
                query_id = %record.query_id,
                "Failed to store query record; feedback for this query will be rejected"
            );
        }

        let invocation = invocation.success(
            serialize_for_log(response, "support.route output"),
            start.elapsed().as_millis() as i64,
        );
        if let Err(e) = self.storage.log_invocation(&invocation).await {
            warn!(
                error = %e,
                tool = %invocation.tool_name,
                "Failed to log invocation - audit trail incomplete"
            );
        }
    }
}
