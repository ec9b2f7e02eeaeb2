//! Tools the model may call mid-turn.
//!
//! Exactly two are registered: `schema` returns a fixed description of the
//! dataset, `db` executes a guarded read-only query. Tool failures are data
//! fed back to the model, never errors propagated up the turn.

mod db_query;
mod schema;

pub use db_query::DbTool;
pub use schema::SchemaTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::db::Database;

/// Result from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
    /// Structured payload for the client-facing tool-result part, when richer
    /// than the plain output string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_data: Option<Value>,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            display_data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            display_data: None,
        }
    }

    pub fn with_display(mut self, data: Value) -> Self {
        self.display_data = Some(data);
        self
    }

    /// Payload for the streamed tool-result part: the structured data when we
    /// have it, the output string otherwise.
    pub fn result_payload(&self) -> Value {
        self.display_data
            .clone()
            .unwrap_or_else(|| Value::from(self.output.clone()))
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &'static str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn run(&self, input: Value) -> ToolOutput;
}

/// Collection of tools available to a conversation
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The standard registry: `schema` and `db` over the given store.
    pub fn new(db: Database) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SchemaTool), Arc::new(DbTool::new(db))];
        Self { tools }
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name. `None` for names we never declared.
    pub async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput> {
        for tool in &self.tools {
            if tool.name() == name {
                return Some(tool.run(input).await);
            }
        }
        None
    }
}
