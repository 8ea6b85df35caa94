use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub data_source: DataSourceConfig,
    pub knowledge: KnowledgeConfig,
    pub ticketing: TicketingConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub support: SupportConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Query/feedback store configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Game data source queried by the dynamic agent
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// Row cap written into every generated query
    pub row_limit: u32,
}

/// Knowledge base and embedding service configuration
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    pub path: PathBuf,
    pub top_k: usize,
    pub embedding_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
}

/// Jira credentials. Ticketing is enabled only when all four are present.
#[derive(Debug, Clone, Default)]
pub struct TicketingConfig {
    pub server: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub project_key: Option<String>,
    pub issue_type: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration, one pipe per generation purpose
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub classifier: String,
    pub follow_up: String,
    pub username: String,
    pub sql: String,
    pub sql_answer: String,
    pub static_qa: String,
    pub combiner: String,
}

/// Defaults applied when a request carries no user context
#[derive(Debug, Clone)]
pub struct SupportConfig {
    pub default_username: String,
    pub default_role: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/support.db".to_string()),
            ),
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5),
        };

        let data_source = DataSourceConfig {
            path: PathBuf::from(
                env::var("GAME_DATABASE_PATH")
                    .unwrap_or_else(|_| "./data/game_data.db".to_string()),
            ),
            max_connections: parse_env("GAME_DATABASE_MAX_CONNECTIONS", 5),
            row_limit: parse_env("SQL_ROW_LIMIT", 10),
        };

        let knowledge = KnowledgeConfig {
            path: PathBuf::from(
                env::var("KNOWLEDGE_BASE_PATH")
                    .unwrap_or_else(|_| "./knowledge_base.txt".to_string()),
            ),
            top_k: parse_env("KNOWLEDGE_TOP_K", 2),
            embedding_base_url: env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embedding_api_key: non_empty_var("EMBEDDING_API_KEY"),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        };

        let ticketing = TicketingConfig {
            server: non_empty_var("JIRA_SERVER"),
            email: non_empty_var("JIRA_EMAIL"),
            api_token: non_empty_var("JIRA_API_TOKEN"),
            project_key: non_empty_var("JIRA_PROJECT_KEY"),
            issue_type: env::var("JIRA_ISSUE_TYPE").unwrap_or_else(|_| "Support".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_env("REQUEST_TIMEOUT_MS", 30000),
            max_retries: parse_env("MAX_RETRIES", 0),
            retry_delay_ms: parse_env("RETRY_DELAY_MS", 1000),
        };

        let pipes = PipeConfig {
            classifier: env::var("PIPE_CLASSIFIER")
                .unwrap_or_else(|_| "support-classifier-v1".to_string()),
            follow_up: env::var("PIPE_FOLLOW_UP")
                .unwrap_or_else(|_| "support-follow-up-v1".to_string()),
            username: env::var("PIPE_USERNAME")
                .unwrap_or_else(|_| "support-username-detect-v1".to_string()),
            sql: env::var("PIPE_SQL").unwrap_or_else(|_| "support-sql-gen-v1".to_string()),
            sql_answer: env::var("PIPE_SQL_ANSWER")
                .unwrap_or_else(|_| "support-sql-answer-v1".to_string()),
            static_qa: env::var("PIPE_STATIC")
                .unwrap_or_else(|_| "support-static-qa-v1".to_string()),
            combiner: env::var("PIPE_COMBINER")
                .unwrap_or_else(|_| "support-hybrid-combiner-v1".to_string()),
        };

        let support = SupportConfig {
            default_username: env::var("DEFAULT_USERNAME").unwrap_or_else(|_| "guest".to_string()),
            default_role: env::var("DEFAULT_ROLE").unwrap_or_else(|_| "player".to_string()),
        };

        Ok(Config {
            langbase,
            database,
            data_source,
            knowledge,
            ticketing,
            logging,
            request,
            pipes,
            support,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl TicketingConfig {
    /// Returns true when every Jira credential is configured.
    pub fn is_enabled(&self) -> bool {
        self.server.is_some()
            && self.email.is_some()
            && self.api_token.is_some()
            && self.project_key.is_some()
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            classifier: "support-classifier-v1".to_string(),
            follow_up: "support-follow-up-v1".to_string(),
            username: "support-username-detect-v1".to_string(),
            sql: "support-sql-gen-v1".to_string(),
            sql_answer: "support-sql-answer-v1".to_string(),
            static_qa: "support-static-qa-v1".to_string(),
            combiner: "support-hybrid-combiner-v1".to_string(),
        }
    }
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            default_username: "guest".to_string(),
            default_role: "player".to_string(),
        }
    }
}
