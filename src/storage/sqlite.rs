use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use super::{Feedback, FeedbackType, Invocation, QueryRecord, Storage};
use crate::agents::Classification;
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create a migrated in-memory store (single connection so every query sees one database)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid in-memory database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_query_record(&self, record: &QueryRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO query_records (
                query_id, query_text, answer, source_type, follow_up_question, ticket_id,
                run_id, parent_run_id, username, role, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.query_id)
        .bind(&record.query_text)
        .bind(&record.answer)
        .bind(record.source_type.as_str())
        .bind(&record.follow_up_question)
        .bind(&record.ticket_id)
        .bind(&record.run_id)
        .bind(&record.parent_run_id)
        .bind(&record.username)
        .bind(&record.role)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_query_record(&self, query_id: &str) -> StorageResult<Option<QueryRecord>> {
        let row: Option<QueryRecordRow> = sqlx::query_as(
            r#"
            SELECT query_id, query_text, answer, source_type, follow_up_question, ticket_id,
                   run_id, parent_run_id, username, role, created_at,
                   feedback_type, feedback_comment, feedback_at
            FROM query_records
            WHERE query_id = ?
            "#,
        )
        .bind(query_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QueryRecord::try_from).transpose()
    }

    async fn record_feedback(
        &self,
        query_id: &str,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE query_records
            SET feedback_type = ?, feedback_comment = ?, feedback_at = ?
            WHERE query_id = ?
            "#,
        )
        .bind(feedback_type.as_str())
        .bind(&comment)
        .bind(Utc::now().to_rfc3339())
        .bind(query_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryNotFound {
                query_id: query_id.to_string(),
            });
        }

        Ok(())
    }

    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()> {
        let input = serde_json::to_string(&invocation.input).map_err(|e| StorageError::Query {
            message: format!("Failed to serialize invocation input: {}", e),
        })?;
        let output = match &invocation.output {
            Some(value) => Some(serde_json::to_string(value).map_err(|e| StorageError::Query {
                message: format!("Failed to serialize invocation output: {}", e),
            })?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO invocations (
                id, query_id, tool_name, input, output, pipe_name, latency_ms, success, error,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invocation.id)
        .bind(&invocation.query_id)
        .bind(&invocation.tool_name)
        .bind(&input)
        .bind(&output)
        .bind(&invocation.pipe_name)
        .bind(invocation.latency_ms)
        .bind(invocation.success)
        .bind(&invocation.error)
        .bind(invocation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_invocations(&self, query_id: &str) -> StorageResult<Vec<Invocation>> {
        let rows: Vec<InvocationRow> = sqlx::query_as(
            r#"
            SELECT id, query_id, tool_name, input, output, pipe_name, latency_ms, success, error,
                   created_at
            FROM invocations
            WHERE query_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(query_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Invocation::from).collect())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(error = %e, value = %value, "Invalid stored timestamp, using now");
            Utc::now()
        })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct QueryRecordRow {
    query_id: String,
    query_text: String,
    answer: String,
    source_type: String,
    follow_up_question: Option<String>,
    ticket_id: Option<String>,
    run_id: String,
    parent_run_id: Option<String>,
    username: String,
    role: String,
    created_at: String,
    feedback_type: Option<String>,
    feedback_comment: Option<String>,
    feedback_at: Option<String>,
}

impl TryFrom<QueryRecordRow> for QueryRecord {
    type Error = StorageError;

    fn try_from(row: QueryRecordRow) -> Result<Self, Self::Error> {
        let source_type: Classification =
            row.source_type
                .parse()
                .map_err(|message: String| StorageError::Query { message })?;

        let feedback = match row.feedback_type {
            Some(kind) => Some(Feedback {
                feedback_type: kind
                    .parse()
                    .map_err(|message: String| StorageError::Query { message })?,
                comment: row.feedback_comment,
                submitted_at: row
                    .feedback_at
                    .as_deref()
                    .map(parse_timestamp)
                    .unwrap_or_else(Utc::now),
            }),
            None => None,
        };

        Ok(Self {
            query_id: row.query_id,
            query_text: row.query_text,
            answer: row.answer,
            source_type,
            follow_up_question: row.follow_up_question,
            ticket_id: row.ticket_id,
            run_id: row.run_id,
            parent_run_id: row.parent_run_id,
            username: row.username,
            role: row.role,
            created_at: parse_timestamp(&row.created_at),
            feedback,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InvocationRow {
    id: String,
    query_id: Option<String>,
    tool_name: String,
    input: String,
    output: Option<String>,
    pipe_name: Option<String>,
    latency_ms: Option<i64>,
    success: bool,
    error: Option<String>,
    created_at: String,
}

impl From<InvocationRow> for Invocation {
    fn from(row: InvocationRow) -> Self {
        Self {
            id: row.id,
            query_id: row.query_id,
            tool_name: row.tool_name,
            input: serde_json::from_str(&row.input).unwrap_or(serde_json::Value::Null),
            output: row.output.and_then(|s| serde_json::from_str(&s).ok()),
            pipe_name: row.pipe_name,
            latency_ms: row.latency_ms,
            success: row.success,
            error: row.error,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
