//! Dynamic data agent - answers from live game data via generated SQL
//!
//! Flow: personal-reference and topic checks, optional username detection, fixed count
//! fast paths, schema-grounded SQL generation, sanitization, execution, then either a
//! templated empty-result sentence or a generated third-person answer.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::sql::sanitize_sql;
use super::{AgentCore, UserContext};
use crate::config::PipeConfig;
use crate::data::{DataGateway, QueryOutput};
use crate::error::AppResult;
use crate::langbase::Generator;
use crate::prompts::{sql_generation_prompt, SQL_ANSWER_PROMPT, USERNAME_DETECTION_PROMPT};

/// Returned when the query refers to the asker but names no player.
pub const NEEDS_USERNAME_ANSWER: &str =
    "This query requires specific player information. Please provide a username.";

/// Returned when generation, translation or execution fails.
pub const DYNAMIC_APOLOGY: &str = "I encountered an error while retrieving that information. Please try rephrasing your question or contact support if the issue persists.";

/// Generic empty-result sentence.
pub const NO_MATCHING_DATA_ANSWER: &str =
    "I've looked into your question, but I couldn't find any matching data in our records.";

const PERSONAL_MARKERS: &[&str] = &["my", "me", "i", "mine", "i'm", "i've", "myself"];
const USERNAME_TOPICS: &[&str] = &["achievement", "rank", "status", "purchase", "level", "xp"];

const SUBJECT_STOPWORDS: &[&str] = &[
    "List", "Show", "Tell", "Give", "What", "Who", "How", "Why", "When", "Where", "Which", "Does",
    "Did", "Do", "Is", "Are", "Has", "Have", "Can", "Could", "Please", "I", "The", "A", "An", "My",
];

static CAPITALIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Za-z0-9_]+\b").expect("valid subject regex"));

/// A query pattern answered by fixed count queries instead of generated SQL.
struct FastPath {
    triggers: &'static [&'static str],
    queries: &'static [&'static str],
    template: &'static str,
}

const FAST_PATHS: &[FastPath] = &[
    FastPath {
        triggers: &["players", "clans"],
        queries: &["SELECT COUNT(*) FROM players", "SELECT COUNT(*) FROM clans"],
        template: "There are {0} players and {1} clans in the database.",
    },
    FastPath {
        triggers: &["matches", "players"],
        queries: &["SELECT COUNT(*) FROM matches", "SELECT COUNT(*) FROM players"],
        template: "There are {0} matches and {1} players recorded in the database.",
    },
];

/// Answers player and clan questions from the structured data store
#[derive(Clone)]
pub struct DynamicDataAgent {
    core: AgentCore,
    gateway: Arc<dyn DataGateway>,
    username_pipe: String,
    sql_pipe: String,
    answer_pipe: String,
    row_limit: u32,
}

impl DynamicDataAgent {
    /// Create a new dynamic data agent
    pub fn new(
        generator: Arc<dyn Generator>,
        gateway: Arc<dyn DataGateway>,
        pipes: &PipeConfig,
        row_limit: u32,
    ) -> Self {
        Self {
            core: AgentCore::new(generator),
            gateway,
            username_pipe: pipes.username.clone(),
            sql_pipe: pipes.sql.clone(),
            answer_pipe: pipes.sql_answer.clone(),
            row_limit,
        }
    }

    /// Answer a data question. Never fails; errors become [`DYNAMIC_APOLOGY`].
    pub async fn answer(&self, query: &str, user: &UserContext) -> String {
        let start = Instant::now();
        match self.try_answer(query).await {
            Ok(answer) => {
                debug!(
                    requested_by = %user.username,
                    latency_ms = start.elapsed().as_millis(),
                    "Dynamic answer produced"
                );
                answer
            }
            Err(e) => {
                warn!(error = %e, requested_by = %user.username, "Dynamic data agent failed");
                DYNAMIC_APOLOGY.to_string()
            }
        }
    }

    async fn try_answer(&self, query: &str) -> AppResult<String> {
        let personal = has_personal_reference(query);
        let mut username_present = false;
        let mut detected = None;

        if personal || mentions_username_topic(query) {
            let reply = self
                .core
                .complete(&self.username_pipe, USERNAME_DETECTION_PROMPT, query)
                .await?;
            (username_present, detected) = parse_username_reply(&reply);
            debug!(reply = %reply, detected = ?detected, "Username detection");
        }

        if personal && !username_present {
            info!("Personal reference without a username");
            return Ok(NEEDS_USERNAME_ANSWER.to_string());
        }

        if let Some(answer) = self.fast_path(query).await {
            return Ok(answer);
        }

        let raw_sql = self
            .core
            .complete(
                &self.sql_pipe,
                sql_generation_prompt(&self.gateway.schema_description(), self.row_limit),
                query,
            )
            .await?;
        let sql = sanitize_sql(&raw_sql, self.row_limit);
        debug!(sql = %sql, "Executing generated query");

        let output = self.gateway.run(&sql).await?;

        if output.is_empty() {
            let subject = extract_subject(query, detected.as_deref());
            debug!(subject = %subject, "Empty result");
            return Ok(empty_result_answer(query, &subject));
        }

        self.phrase_result(query, &sql, &output).await
    }

    async fn fast_path(&self, query: &str) -> Option<String> {
        let lower = query.to_lowercase();
        let path = FAST_PATHS
            .iter()
            .find(|p| p.triggers.iter().all(|t| lower.contains(t)))?;

        let mut answer = path.template.to_string();
        for (i, sql) in path.queries.iter().enumerate() {
            let value = match self.gateway.run(sql).await {
                Ok(output) => output.first_value().unwrap_or_else(|| "0".to_string()),
                Err(e) => {
                    warn!(error = %e, sql = %sql, "Fast path query failed, using generated SQL");
                    return None;
                }
            };
            answer = answer.replace(&format!("{{{}}}", i), &value);
        }

        debug!(triggers = ?path.triggers, "Fast path answered");
        Some(answer)
    }

    async fn phrase_result(
        &self,
        query: &str,
        sql: &str,
        output: &QueryOutput,
    ) -> AppResult<String> {
        let result = output.to_string();
        let answer = self
            .core
            .complete(
                &self.answer_pipe,
                SQL_ANSWER_PROMPT,
                format!(
                    "SQL Query: {}\nSQL Result: {}\nUser Question: {}",
                    sql, result, query
                ),
            )
            .await?;

        if answer.is_empty() {
            return Ok(format!("Based on the data, here's what I found: {}", result));
        }
        Ok(answer)
    }
}

// ============================================================================
// Lexical Checks
// ============================================================================

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\u{2019}', "'").to_lowercase())
}

/// True when the text refers to the asker in the first person.
pub fn has_personal_reference(text: &str) -> bool {
    tokens(text).any(|t| PERSONAL_MARKERS.contains(&t.as_str()))
}

/// True when the text asks about player-specific data that needs a resolved username.
pub fn mentions_username_topic(text: &str) -> bool {
    tokens(text).any(|t| USERNAME_TOPICS.iter().any(|topic| t.starts_with(topic)))
}

/// Parse a `YES: <name>` / `NO` reply into (present, name).
fn parse_username_reply(reply: &str) -> (bool, Option<String>) {
    let reply = reply.trim();
    if !reply.to_uppercase().starts_with("YES") {
        return (false, None);
    }

    let name = reply
        .split_once(':')
        .map(|(_, name)| {
            name.trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '.' | '`'))
                .to_string()
        })
        .filter(|name| !name.is_empty());
    (true, name)
}

/// Pick the player a query is about for empty-result sentences.
///
/// A name already resolved by username detection wins. Otherwise capitalized tokens that are
/// not common sentence openers are considered, preferring ones shaped like gaming usernames
/// (digits, inner capitals or underscores). Falls back to "the player".
pub fn extract_subject(text: &str, detected: Option<&str>) -> String {
    if let Some(name) = detected.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let candidates: Vec<&str> = CAPITALIZED_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| !SUBJECT_STOPWORDS.contains(word))
        .collect();

    candidates
        .iter()
        .find(|word| looks_like_username(word))
        .or_else(|| candidates.first())
        .map(|word| word.to_string())
        .unwrap_or_else(|| "the player".to_string())
}

fn looks_like_username(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit() || c == '_')
        || word.chars().skip(1).any(|c| c.is_uppercase())
}

fn empty_result_answer(query: &str, subject: &str) -> String {
    let lower = query.to_lowercase();
    if lower.contains("legendary items") {
        format!(
            "I've checked our records, and it appears {} hasn't purchased any legendary items yet.",
            subject
        )
    } else if lower.contains("achievements") {
        format!(
            "I've checked our records, and it appears {} hasn't earned any achievements yet.",
            subject
        )
    } else if lower.contains("purchases") || lower.contains("items") {
        format!(
            "I've checked our records, and it appears {} hasn't made any purchases yet.",
            subject
        )
    } else {
        NO_MATCHING_DATA_ANSWER.to_string()
    }
}
