//! Db tool - executes a guarded SQL query against the store

use super::{Tool, ToolOutput};
use crate::db::{Database, DbError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Tool executing read-only SQL queries
pub struct DbTool {
    db: Database,
}

impl DbTool {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[derive(Debug, Deserialize)]
struct DbInput {
    query: String,
}

#[async_trait]
impl Tool for DbTool {
    fn name(&self) -> &'static str {
        "db"
    }

    fn description(&self) -> String {
        "Run a SQL query against the database and return its rows. Only SELECT statements are accepted; anything else is rejected before execution.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to run"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> ToolOutput {
        let DbInput { query } = match serde_json::from_value(input) {
            Ok(parsed) => parsed,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        match self.db.run_readonly_query(&query) {
            Ok(output) => {
                let summary = format!("{} row(s)", output.rows.len());
                let display = serde_json::to_value(&output).unwrap_or(Value::Null);
                ToolOutput::success(format!(
                    "{summary}\n{}",
                    serde_json::to_string(&output).unwrap_or_default()
                ))
                .with_display(display)
            }
            Err(e @ DbError::ForbiddenStatement) => ToolOutput::error(e.to_string()),
            Err(DbError::Sqlite(e)) => ToolOutput::error(format!("Query failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_tool() -> DbTool {
        let db = Database::open_in_memory().unwrap();
        db.seed().unwrap();
        DbTool::new(db)
    }

    #[tokio::test]
    async fn select_returns_rows() {
        let tool = seeded_tool();
        let out = tool.run(json!({"query": "SELECT * FROM products"})).await;
        assert!(out.success);

        let display = out.display_data.unwrap();
        assert_eq!(display["rows"].as_array().unwrap().len(), 18);
    }

    #[tokio::test]
    async fn drop_is_rejected_before_execution() {
        let tool = seeded_tool();
        let out = tool.run(json!({"query": "DROP TABLE products"})).await;
        assert!(!out.success);
        assert!(out.output.contains("Forbidden statement"));

        // Table survived.
        let check = tool
            .run(json!({"query": "SELECT COUNT(*) FROM products"}))
            .await;
        assert!(check.success);
    }

    #[tokio::test]
    async fn bad_sql_is_a_tool_error_not_a_panic() {
        let tool = seeded_tool();
        let out = tool.run(json!({"query": "SELECT nope FROM nothing"})).await;
        assert!(!out.success);
        assert!(out.output.contains("Query failed"));
    }

    #[tokio::test]
    async fn missing_query_field_is_invalid_input() {
        let tool = seeded_tool();
        let out = tool.run(json!({})).await;
        assert!(!out.success);
        assert!(out.output.contains("Invalid input"));
    }
}
