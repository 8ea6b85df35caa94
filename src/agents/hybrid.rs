//! Hybrid agent - combines documentation and live data
//!
//! Compound "is X a Y clan ... benefits" questions are answered in dependency order: the
//! dynamic agent establishes the clan category first, then the static agent elaborates on
//! that category only. Anything else asks both agents the raw question concurrently.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::{AgentCore, DynamicDataAgent, StaticKnowledgeAgent, UserContext};
use crate::langbase::Generator;
use crate::prompts::{with_rules, HYBRID_COMBINER_PROMPT};

/// Clan categories recognised when reading a dynamic answer.
pub const KNOWN_CLAN_CATEGORIES: &[&str] = &[
    "magic", "warrior", "ranger", "stealth", "tank", "support", "archer", "healer",
];

const BENEFIT_KEYWORDS: &[&str] = &[
    "benefit",
    "known for",
    "advantage",
    "characteristic",
    "perk",
    "bonus",
];

static CLAN_QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bis\s+(?P<entity>[A-Za-z0-9_\-]+)\s+an?\s+(?P<category>[A-Za-z]+)\s+clan\b")
        .expect("valid clan question regex")
});
static AFFIRMATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\W*yes\b").expect("valid affirmative regex"));
static NEGATED_CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:not|isn't|isnt|no longer|never)\s+(?:an?\s+)?(?P<category>[a-z]+)\b")
        .expect("valid negation regex")
});

/// A compound clan question whose static half depends on the dynamic half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClanQuestion {
    /// Clan named in the question.
    pub entity: String,
    /// Category the user asked about, lowercased.
    pub category: String,
}

impl ClanQuestion {
    /// Narrowed question for the dynamic agent.
    pub fn membership_question(&self) -> String {
        format!("Is {} a {} clan?", self.entity, self.category)
    }

    /// Static question grounded in an already established category.
    pub fn grounded_question(&self, resolved: &str) -> String {
        format!(
            "{} is a {} clan. What are {} clans known for, and what benefits do they have?",
            self.entity, resolved, resolved
        )
    }
}

/// Detect an "is X a Y clan" question that also asks about benefits or characteristics.
pub fn detect_clan_question(query: &str) -> Option<ClanQuestion> {
    let lower = query.to_lowercase();
    if !BENEFIT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }

    let caps = CLAN_QUESTION_RE.captures(query)?;
    Some(ClanQuestion {
        entity: caps["entity"].to_string(),
        category: caps["category"].to_lowercase(),
    })
}

/// Read the clan category out of a dynamic answer.
///
/// An affirmative answer confirms the asked category, as does any mention of it that is not
/// directly negated ("not a magic clan"). Only when the asked category is negated or absent is
/// the first other known category named as "<category> clan", and not itself negated, taken.
pub fn resolve_category(answer: &str, asked: &str) -> Option<String> {
    let lower = answer.to_lowercase();
    let asked = asked.to_lowercase();

    if AFFIRMATIVE_RE.is_match(answer) {
        return Some(asked);
    }

    let negated: Vec<&str> = NEGATED_CATEGORY_RE
        .captures_iter(&lower)
        .filter_map(|caps| caps.name("category"))
        .map(|m| m.as_str())
        .collect();

    if lower.contains(&asked) && !negated.contains(&asked.as_str()) {
        return Some(asked);
    }

    KNOWN_CLAN_CATEGORIES
        .iter()
        .filter(|c| **c != asked && !negated.contains(c))
        .find(|c| lower.contains(&format!("{} clan", c)))
        .map(|c| c.to_string())
}

/// Answers questions that need both documentation and live data
#[derive(Clone)]
pub struct HybridAgent {
    core: AgentCore,
    static_agent: Arc<StaticKnowledgeAgent>,
    dynamic_agent: Arc<DynamicDataAgent>,
    combiner_pipe: String,
}

impl HybridAgent {
    /// Create a new hybrid agent over existing static and dynamic agents
    pub fn new(
        generator: Arc<dyn Generator>,
        static_agent: Arc<StaticKnowledgeAgent>,
        dynamic_agent: Arc<DynamicDataAgent>,
        combiner_pipe: impl Into<String>,
    ) -> Self {
        Self {
            core: AgentCore::new(generator),
            static_agent,
            dynamic_agent,
            combiner_pipe: combiner_pipe.into(),
        }
    }

    /// Answer a compound question.
    pub async fn answer(&self, query: &str, user: &UserContext) -> String {
        let (static_answer, dynamic_answer) = match self.dependent_answers(query, user).await {
            Some(answers) => answers,
            None => {
                debug!("Answering static and dynamic halves independently");
                tokio::join!(
                    self.static_agent.answer(query),
                    self.dynamic_agent.answer(query, user)
                )
            }
        };

        self.combine(query, &static_answer, &dynamic_answer).await
    }

    async fn dependent_answers(&self, query: &str, user: &UserContext) -> Option<(String, String)> {
        let question = detect_clan_question(query)?;
        debug!(entity = %question.entity, category = %question.category, "Dependent clan question");

        let dynamic_answer = self
            .dynamic_agent
            .answer(&question.membership_question(), user)
            .await;

        let Some(resolved) = resolve_category(&dynamic_answer, &question.category) else {
            debug!(answer = %dynamic_answer, "Clan category unresolved");
            return None;
        };

        let static_answer = self
            .static_agent
            .answer(&question.grounded_question(&resolved))
            .await;
        Some((static_answer, dynamic_answer))
    }

    async fn combine(&self, query: &str, static_answer: &str, dynamic_answer: &str) -> String {
        let input = format!(
            "Static Knowledge: {}\nDynamic Data: {}\n\nOriginal Question: {}",
            static_answer, dynamic_answer, query
        );

        match self
            .core
            .complete(&self.combiner_pipe, with_rules(HYBRID_COMBINER_PROMPT), input)
            .await
        {
            Ok(combined) if !combined.is_empty() => combined,
            Ok(_) => format!("{}\n\n{}", dynamic_answer, static_answer),
            Err(e) => {
                warn!(error = %e, pipe = %self.combiner_pipe, "Combiner failed, concatenating answers");
                format!("{}\n\n{}", dynamic_answer, static_answer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipeConfig;
    use crate::data::{MockDataGateway, QueryOutput};
    use crate::error::LangbaseError;
    use crate::knowledge::{MockDocumentIndex, ScoredUnit};
    use crate::langbase::MockGenerator;
    use serde_json::json;

    fn build(generator: MockGenerator, index: MockDocumentIndex, gateway: MockDataGateway) -> HybridAgent {
        let generator: Arc<dyn Generator> = Arc::new(generator);
        let pipes = PipeConfig::default();
        let static_agent = Arc::new(StaticKnowledgeAgent::new(
            generator.clone(),
            Arc::new(index),
            pipes.static_qa.clone(),
            2,
        ));
        let dynamic_agent = Arc::new(DynamicDataAgent::new(
            generator.clone(),
            Arc::new(gateway),
            &pipes,
            10,
        ));
        HybridAgent::new(generator, static_agent, dynamic_agent, pipes.combiner.clone())
    }

    fn clan_gateway() -> MockDataGateway {
        let mut gateway = MockDataGateway::new();
        gateway
            .expect_schema_description()
            .returning(|| "CREATE TABLE clans (clan_name TEXT, clan_type TEXT)".to_string());
        gateway.expect_run().returning(|_| {
            Ok(QueryOutput::new(
                vec!["clan_type".to_string()],
                vec![vec![json!("magic")]],
            ))
        });
        gateway
    }

    #[test]
    fn test_detect_clan_question() {
        let question =
            detect_clan_question("Is FireMages a magic clan and what are the benefits?").unwrap();
        assert_eq!(question.entity, "FireMages");
        assert_eq!(question.category, "magic");
        assert_eq!(question.membership_question(), "Is FireMages a magic clan?");

        let question = detect_clan_question("is Iron-Wall an Tank clan? what perks?").unwrap();
        assert_eq!(question.entity, "Iron-Wall");
        assert_eq!(question.category, "tank");
    }

    #[test]
    fn test_detect_requires_benefit_subquestion() {
        assert!(detect_clan_question("Is FireMages a magic clan?").is_none());
        assert!(detect_clan_question("What are the benefits of magic clans?").is_none());
    }

    #[test]
    fn test_grounded_question_states_fact() {
        let question = ClanQuestion {
            entity: "FireMages".to_string(),
            category: "magic".to_string(),
        };
        assert_eq!(
            question.grounded_question("magic"),
            "FireMages is a magic clan. What are magic clans known for, and what benefits do they have?"
        );
    }

    #[test]
    fn test_resolve_category() {
        assert_eq!(resolve_category("Yes, FireMages is a magic clan.", "magic").as_deref(), Some("magic"));
        assert_eq!(resolve_category("FireMages is a magic clan.", "Magic").as_deref(), Some("magic"));
        assert_eq!(
            resolve_category("No, FireMages is not a magic clan; it is a warrior clan.", "magic")
                .as_deref(),
            Some("warrior")
        );
        assert_eq!(resolve_category("FireMages is not a magic clan.", "magic"), None);
        assert_eq!(
            resolve_category("FireMages isn't magic, it is a ranger clan.", "magic").as_deref(),
            Some("ranger")
        );
        assert_eq!(
            resolve_category("I've looked into your question, but I couldn't find any matching data in our records.", "magic"),
            None
        );
        assert_eq!(resolve_category(crate::agents::DYNAMIC_APOLOGY, "magic"), None);
    }

    #[test]
    fn test_resolve_category_ignores_negation_of_other_category() {
        assert_eq!(
            resolve_category("FireMages is a magic clan, not a warrior clan.", "magic").as_deref(),
            Some("magic")
        );
        assert_eq!(
            resolve_category("FireMages is no longer a warrior clan; it is a magic clan now.", "magic")
                .as_deref(),
            Some("magic")
        );
        assert_eq!(
            resolve_category("FireMages is not a warrior clan.", "warrior"),
            None
        );
    }

    #[tokio::test]
    async fn test_dependent_path_grounds_static_question() {
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.name == "support-sql-gen-v1" && req.messages[1].content == "Is FireMages a magic clan?")
            .times(1)
            .returning(|_| Ok("SELECT clan_type FROM clans WHERE LOWER(clan_name) = LOWER('FireMages')".to_string()));
        generator
            .expect_generate()
            .withf(|req| req.name == "support-sql-answer-v1")
            .returning(|_| Ok("Yes, FireMages is a magic clan.".to_string()));
        generator
            .expect_generate()
            .withf(|req| req.name == "support-static-qa-v1")
            .returning(|_| Ok("Magic clans get +10% spell damage.".to_string()));
        generator
            .expect_generate()
            .withf(|req| {
                req.name == "support-hybrid-combiner-v1"
                    && req.messages[1].content
                        == "Static Knowledge: Magic clans get +10% spell damage.\nDynamic Data: Yes, FireMages is a magic clan.\n\nOriginal Question: Is FireMages a magic clan and what are the benefits?"
            })
            .times(1)
            .returning(|_| Ok("Yes, FireMages is a magic clan. Magic clans get +10% spell damage.".to_string()));

        let mut index = MockDocumentIndex::new();
        index
            .expect_search()
            .withf(|q, _| q.starts_with("FireMages is a magic clan. What are magic clans known for"))
            .times(1)
            .returning(|_, _| {
                Ok(vec![ScoredUnit {
                    text: "Magic clans get +10% spell damage.".to_string(),
                    score: 0.9,
                }])
            });

        let agent = build(generator, index, clan_gateway());
        let answer = agent
            .answer(
                "Is FireMages a magic clan and what are the benefits?",
                &UserContext::new("guest", "player"),
            )
            .await;
        assert!(answer.contains("magic clan"));
        assert!(answer.contains("spell damage"));
    }

    #[tokio::test]
    async fn test_combiner_failure_concatenates() {
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.name == "support-sql-gen-v1")
            .returning(|_| Ok("SELECT clan_type FROM clans".to_string()));
        generator
            .expect_generate()
            .withf(|req| req.name == "support-sql-answer-v1")
            .returning(|_| Ok("FireMages is a magic clan.".to_string()));
        generator
            .expect_generate()
            .withf(|req| req.name == "support-hybrid-combiner-v1")
            .returning(|_| Err(LangbaseError::Timeout { timeout_ms: 100 }));

        let mut index = MockDocumentIndex::new();
        index.expect_search().returning(|_, _| Ok(Vec::new()));

        let agent = build(generator, index, clan_gateway());
        let answer = agent
            .answer(
                "Compare FireMages clan stats with general clan perks",
                &UserContext::new("guest", "player"),
            )
            .await;
        assert_eq!(
            answer,
            "FireMages is a magic clan.\n\nI don't have any information about that in the knowledge base."
        );
    }
}
