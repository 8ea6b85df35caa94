//! Static knowledge agent - answers from the document index only

use std::sync::Arc;
use tracing::{debug, warn};

use super::AgentCore;
use crate::knowledge::{DocumentIndex, ScoredUnit};
use crate::langbase::Generator;
use crate::prompts::{with_rules, STATIC_QA_PROMPT};

/// Answer returned when retrieval finds nothing.
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have any information about that in the knowledge base.";

/// Answer returned when retrieval or generation fails.
pub const STATIC_APOLOGY: &str = "I'm sorry, I couldn't look that up in our documentation right now. Please try rephrasing your question or try again later.";

/// Answers questions grounded in retrieved knowledge units
#[derive(Clone)]
pub struct StaticKnowledgeAgent {
    core: AgentCore,
    index: Arc<dyn DocumentIndex>,
    pipe_name: String,
    top_k: usize,
}

impl StaticKnowledgeAgent {
    /// Create a new static knowledge agent
    pub fn new(
        generator: Arc<dyn Generator>,
        index: Arc<dyn DocumentIndex>,
        pipe_name: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            core: AgentCore::new(generator),
            index,
            pipe_name: pipe_name.into(),
            top_k,
        }
    }

    /// Answer a question from the knowledge base. Never fails; errors become an apology.
    pub async fn answer(&self, query: &str) -> String {
        let units = match self.index.search(query, self.top_k).await {
            Ok(units) => units,
            Err(e) => {
                warn!(error = %e, "Knowledge search failed");
                return STATIC_APOLOGY.to_string();
            }
        };

        if units.is_empty() {
            debug!("No knowledge units retrieved");
            return NO_INFORMATION_ANSWER.to_string();
        }

        debug!(
            units = units.len(),
            top_score = units[0].score,
            "Knowledge units retrieved"
        );

        match self
            .core
            .complete(
                &self.pipe_name,
                with_rules(STATIC_QA_PROMPT),
                build_user_message(query, &units),
            )
            .await
        {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => NO_INFORMATION_ANSWER.to_string(),
            Err(e) => {
                warn!(error = %e, pipe = %self.pipe_name, "Static answer generation failed");
                STATIC_APOLOGY.to_string()
            }
        }
    }
}

fn build_user_message(query: &str, units: &[ScoredUnit]) -> String {
    let context = units
        .iter()
        .enumerate()
        .map(|(i, unit)| format!("{}. {}", i + 1, unit.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!("Question: {}\n\nKnowledge units:\n{}", query, context)
}
