use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::Instant;
use tracing::{debug, info};

use super::{DataGateway, QueryOutput};
use crate::config::DataSourceConfig;
use crate::error::{GatewayError, GatewayResult};

/// Read-only SQLite gateway over the game data store
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
    schema: String,
}

impl SqliteGateway {
    /// Open the data store read-only and capture its schema
    pub async fn connect(config: &DataSourceConfig) -> GatewayResult<Self> {
        if !config.path.exists() {
            return Err(GatewayError::Connection {
                message: format!("Data source not found: {}", config.path.display()),
            });
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| GatewayError::Connection {
                message: format!("Failed to connect to data source: {}", e),
            })?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, capturing the schema of every user table
    pub async fn from_pool(pool: SqlitePool) -> GatewayResult<Self> {
        let statements: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT sql FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND sql IS NOT NULL
            ORDER BY name
            "#,
        )
        .fetch_all(&pool)
        .await?;

        let schema = statements
            .into_iter()
            .map(|(sql,)| sql)
            .collect::<Vec<_>>()
            .join("\n\n");

        info!(tables = schema.matches("CREATE TABLE").count(), "Data source schema loaded");

        Ok(Self { pool, schema })
    }
}

fn cell_value(row: &SqliteRow, index: usize) -> GatewayResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            Value::from(row.try_get_unchecked::<i64, _>(index)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            Value::from(row.try_get_unchecked::<f64, _>(index)?)
        }
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            Value::from(format!("<{} bytes>", bytes.len()))
        }
        _ => Value::from(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

#[async_trait]
impl DataGateway for SqliteGateway {
    async fn run(&self, query: &str) -> GatewayResult<QueryOutput> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GatewayError::Rejected {
                reason: "empty statement".to_string(),
            });
        }

        let start = Instant::now();
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GatewayError::Execution {
                message: e.to_string(),
            })?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..row.columns().len() {
                cells.push(cell_value(row, index)?);
            }
            values.push(cells);
        }

        debug!(
            rows = values.len(),
            latency_ms = start.elapsed().as_millis(),
            "Data source query executed"
        );

        Ok(QueryOutput::new(columns, values))
    }

    fn schema_description(&self) -> String {
        self.schema.clone()
    }
}
