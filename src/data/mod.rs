//! Structured Data Gateway.
//!
//! Executes one query statement against the game data store and returns tabular results.
//! The dynamic agent is the only caller.

mod sqlite;

pub use sqlite::SqliteGateway;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayResult;

/// Tabular result of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Row values, one inner vector per row.
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    /// Create an output from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// True when the query matched no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, rendered as text.
    pub fn first_value(&self) -> Option<String> {
        self.rows.first().and_then(|row| row.first()).map(render_cell)
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for QueryOutput {
    /// Header line followed by one line per row; empty output renders as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            write!(f, "\n{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

/// Query execution interface over a schema-described relational store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Execute a single query statement.
    async fn run(&self, query: &str) -> GatewayResult<QueryOutput>;

    /// Human-readable schema of every queryable table.
    fn schema_description(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_output_renders_empty() {
        let output = QueryOutput::new(vec!["username".to_string()], vec![]);
        assert!(output.is_empty());
        assert_eq!(output.to_string(), "");
        assert_eq!(output.first_value(), None);
    }

    #[test]
    fn test_output_renders_header_and_rows() {
        let output = QueryOutput::new(
            vec!["username".to_string(), "rank".to_string()],
            vec![
                vec![json!("DragonSlayer99"), json!(3)],
                vec![json!("IceWarden"), Value::Null],
            ],
        );
        assert_eq!(
            output.to_string(),
            "username | rank\nDragonSlayer99 | 3\nIceWarden | NULL"
        );
    }

    #[test]
    fn test_first_value_of_count() {
        let output = QueryOutput::new(vec!["COUNT(*)".to_string()], vec![vec![json!(42)]]);
        assert_eq!(output.first_value().as_deref(), Some("42"));
    }
}
