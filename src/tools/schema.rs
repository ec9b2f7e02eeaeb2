//! Schema tool - returns a fixed description of the dataset

use super::{Tool, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Static schema text handed to the model. Not live introspection: the tables
/// never change shape at runtime, so a fixed string keeps the tool total.
pub const SCHEMA_TEXT: &str = r"Table products:
  id            INTEGER  primary key, autoincrement
  name          TEXT     not null
  category      TEXT     not null
  price         REAL     not null
  stock         INTEGER  not null, default 0
  created_at    TEXT     default CURRENT_TIMESTAMP

Table sales:
  id            INTEGER  primary key, autoincrement
  product_id    INTEGER  not null, references products(id)
  quantity      INTEGER  not null
  total_amount  REAL     not null
  sale_date     TEXT     default CURRENT_TIMESTAMP
  customer_name TEXT     not null
  region        TEXT     not null";

/// Tool returning the database schema
pub struct SchemaTool;

#[async_trait]
impl Tool for SchemaTool {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn description(&self) -> String {
        "Get the database schema. Call this before writing SQL so queries use real table and column names.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Ignored; present for call-shape compatibility"
                }
            }
        })
    }

    async fn run(&self, _input: Value) -> ToolOutput {
        ToolOutput::success(SCHEMA_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds_and_ignores_input() {
        let tool = SchemaTool;
        for input in [
            json!({"query": "SELECT 1"}),
            json!({}),
            json!("not even an object"),
        ] {
            let out = tool.run(input).await;
            assert!(out.success);
            assert_eq!(out.output, SCHEMA_TEXT);
        }
    }

    #[tokio::test]
    async fn schema_names_both_tables() {
        let out = SchemaTool.run(json!({})).await;
        assert!(out.output.contains("products"));
        assert!(out.output.contains("sales"));
    }
}
