//! Shared fakes for the integration tests.
//!
//! Mockall mocks only exist inside the library's own unit tests, so integration tests wire the
//! router with these scripted collaborators instead.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use mcp_support_router::agents::{Collaborators, QueryRouter};
use mcp_support_router::config::{
    Config, DataSourceConfig, DatabaseConfig, KnowledgeConfig, LangbaseConfig, LogFormat,
    LoggingConfig, PipeConfig, RequestConfig, SupportConfig, TicketingConfig,
};
use mcp_support_router::data::{DataGateway, QueryOutput};
use mcp_support_router::error::{
    GatewayError, GatewayResult, IndexResult, LangbaseError, LangbaseResult, TicketError,
    TicketResult,
};
use mcp_support_router::knowledge::{DocumentIndex, ScoredUnit};
use mcp_support_router::langbase::{Generator, PipeRequest};
use mcp_support_router::storage::{SqliteStorage, Storage};
use mcp_support_router::tickets::TicketGateway;

pub const SCHEMA: &str = "CREATE TABLE players (player_id INTEGER PRIMARY KEY, username TEXT, rank INTEGER, clan_id INTEGER)\nCREATE TABLE clans (clan_id INTEGER PRIMARY KEY, clan_name TEXT, category TEXT)";

/// Configuration with default pipe names and no external services.
pub fn test_config() -> Config {
    Config {
        langbase: LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: "http://localhost".to_string(),
        },
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        data_source: DataSourceConfig {
            path: PathBuf::from("game_data.db"),
            max_connections: 1,
            row_limit: 10,
        },
        knowledge: KnowledgeConfig {
            path: PathBuf::from("knowledge_base.txt"),
            top_k: 2,
            embedding_base_url: "http://localhost".to_string(),
            embedding_api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
        },
        ticketing: TicketingConfig {
            issue_type: "Support".to_string(),
            ..Default::default()
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig::default(),
        pipes: PipeConfig::default(),
        support: SupportConfig::default(),
    }
}

// ============================================================================
// Generation
// ============================================================================

enum Reply {
    Text(String),
    Fail,
}

struct Rule {
    needle: String,
    reply: Reply,
}

/// Generator answering per pipe, optionally keyed on a substring of the user message.
/// Rules are tried in insertion order; the first match wins.
#[derive(Default)]
pub struct ScriptedGenerator {
    rules: Mutex<HashMap<String, Vec<Rule>>>,
    calls: Mutex<Vec<PipeRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, pipe: &str, needle: &str, reply: Reply) -> Self {
        self.rules
            .lock()
            .unwrap()
            .entry(pipe.to_string())
            .or_default()
            .push(Rule {
                needle: needle.to_string(),
                reply,
            });
        self
    }

    /// Reply to every call on `pipe`.
    pub fn reply(self, pipe: &str, text: &str) -> Self {
        self.push(pipe, "", Reply::Text(text.to_string()))
    }

    /// Reply on `pipe` when the user message contains `needle`.
    pub fn reply_when(self, pipe: &str, needle: &str, text: &str) -> Self {
        self.push(pipe, needle, Reply::Text(text.to_string()))
    }

    /// Fail every call on `pipe`.
    pub fn fail(self, pipe: &str) -> Self {
        self.push(pipe, "", Reply::Fail)
    }

    /// User messages sent to `pipe`, in call order.
    pub fn calls_to(&self, pipe: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == pipe)
            .map(|r| r.user_text().unwrap_or_default().to_string())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String> {
        let user_text = request.user_text().unwrap_or_default().to_string();
        let pipe = request.name.clone();
        self.calls.lock().unwrap().push(request);

        let rules = self.rules.lock().unwrap();
        let rule = rules
            .get(&pipe)
            .and_then(|rules| rules.iter().find(|r| user_text.contains(&r.needle)));

        match rule.map(|r| &r.reply) {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail) => Err(LangbaseError::Unavailable {
                message: format!("scripted failure on {}", pipe),
                retries: 0,
            }),
            None => Err(LangbaseError::Api {
                status: 404,
                message: format!("no script for pipe {}", pipe),
            }),
        }
    }
}

// ============================================================================
// Structured data
// ============================================================================

/// Gateway returning canned outputs for statements containing a needle.
/// Unmatched statements return an empty result.
#[derive(Default)]
pub struct FakeGateway {
    outputs: Vec<(String, Result<QueryOutput, String>)>,
    executed: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returns(mut self, needle: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.outputs
            .push((needle.to_string(), Ok(QueryOutput::new(columns, rows))));
        self
    }

    pub fn fails(mut self, needle: &str, message: &str) -> Self {
        self.outputs
            .push((needle.to_string(), Err(message.to_string())));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataGateway for FakeGateway {
    async fn run(&self, query: &str) -> GatewayResult<QueryOutput> {
        self.executed.lock().unwrap().push(query.to_string());
        match self.outputs.iter().find(|(needle, _)| query.contains(needle)) {
            Some((_, Ok(output))) => Ok(output.clone()),
            Some((_, Err(message))) => Err(GatewayError::Execution {
                message: message.clone(),
            }),
            None => Ok(QueryOutput::default()),
        }
    }

    fn schema_description(&self) -> String {
        SCHEMA.to_string()
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Index returning the same units for every search, truncated to `k`.
#[derive(Default)]
pub struct FakeIndex {
    units: Vec<ScoredUnit>,
}

impl FakeIndex {
    pub fn with_units(units: &[(&str, f32)]) -> Self {
        Self {
            units: units
                .iter()
                .map(|(text, score)| ScoredUnit {
                    text: text.to_string(),
                    score: *score,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn search(&self, _query: &str, k: usize) -> IndexResult<Vec<ScoredUnit>> {
        Ok(self.units.iter().take(k).cloned().collect())
    }
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
}

/// Ticket gateway that records tickets and hands out sequential keys.
#[derive(Default)]
pub struct RecordingTickets {
    created: Mutex<Vec<CreatedTicket>>,
    unavailable: bool,
}

impl RecordingTickets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<CreatedTicket> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketGateway for RecordingTickets {
    async fn create(
        &self,
        summary: &str,
        description: &str,
        issue_type: &str,
    ) -> TicketResult<String> {
        if self.unavailable {
            return Err(TicketError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        let mut created = self.created.lock().unwrap();
        created.push(CreatedTicket {
            summary: summary.to_string(),
            description: description.to_string(),
            issue_type: issue_type.to_string(),
        });
        Ok(format!("SUP-{}", created.len()))
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// A router over scripted collaborators and in-memory storage, with handles to inspect them.
pub struct Harness {
    pub router: QueryRouter,
    pub generator: Arc<ScriptedGenerator>,
    pub gateway: Arc<FakeGateway>,
    pub tickets: Arc<RecordingTickets>,
    pub storage: Arc<SqliteStorage>,
}

impl Harness {
    pub async fn new(
        generator: ScriptedGenerator,
        gateway: FakeGateway,
        index: FakeIndex,
        tickets: RecordingTickets,
    ) -> Self {
        let generator = Arc::new(generator);
        let gateway = Arc::new(gateway);
        let tickets = Arc::new(tickets);
        let storage = Arc::new(
            SqliteStorage::new_in_memory()
                .await
                .expect("Failed to create in-memory storage"),
        );

        let deps = Collaborators {
            generator: generator.clone(),
            storage: storage.clone() as Arc<dyn Storage>,
            gateway: gateway.clone(),
            index: Arc::new(index),
            tickets: tickets.clone(),
        };
        let router = QueryRouter::from_config(deps, &test_config());

        Self {
            router,
            generator,
            gateway,
            tickets,
            storage,
        }
    }
}
