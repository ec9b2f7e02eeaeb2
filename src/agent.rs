//! Agent orchestrator: one user turn, one streamed assistant message.
//!
//! The turn is a bounded call/respond loop. Each round the model either
//! answers in plain text (turn over) or requests tool calls, which run
//! sequentially with their results fed back into the model's context. Parts
//! are emitted over a channel in exactly the order they are generated.

use crate::db::Database;
use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService};
use crate::message::{Message, Part, Role};
use crate::system_prompt::build_system_prompt;
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Maximum model round-trips per user turn.
pub const MAX_STEPS: usize = 5;

/// Wall-clock budget for a whole turn.
pub const TURN_BUDGET: Duration = Duration::from_secs(30);

const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Provider unavailable: {0}")]
    Provider(#[from] LlmError),
    #[error("Client disconnected before the turn finished")]
    ChannelClosed,
    #[error("Turn cancelled")]
    Cancelled,
}

/// Orchestrates model turns against the tool registry.
pub struct Agent {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmService>, db: Database) -> Self {
        Self {
            llm,
            tools: ToolRegistry::new(db),
        }
    }

    /// Run one turn over `history`, emitting the new assistant message's parts
    /// on `parts_tx` in generation order.
    ///
    /// Tool failures are absorbed into tool-result parts; only an unreachable
    /// provider or a closed channel ends the turn with an error. A round that
    /// fails emits none of its parts, the step marker included. Cancellation
    /// (client gone, budget exceeded) aborts between steps; parts already
    /// emitted stand.
    pub async fn run_turn(
        &self,
        history: &[Message],
        parts_tx: mpsc::Sender<Part>,
        cancel: CancellationToken,
    ) -> Result<(), AgentError> {
        let system = build_system_prompt(chrono::Utc::now());
        let mut context = history_to_llm_messages(history);
        let tool_definitions = self.tools.definitions();

        for step in 1..=MAX_STEPS {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let request = LlmRequest {
                system: system.clone(),
                messages: context.clone(),
                tools: tool_definitions.clone(),
                max_tokens: Some(MAX_TOKENS),
            };

            let response = tokio::select! {
                result = self.llm.complete(&request) => result?,
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
            };

            // The step marker waits for the round's response: a round that
            // fails streams no parts at all.
            send_part(&parts_tx, Part::StepStart).await?;

            let text = response.text();
            if !text.is_empty() {
                send_part(&parts_tx, Part::text(&text)).await?;
            }

            let tool_uses: Vec<(String, String, Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if tool_uses.is_empty() {
                tracing::debug!(step, "turn finished with text-only response");
                return Ok(());
            }

            context.push(LlmMessage::assistant(response.content.clone()));

            // Tools run sequentially; each result goes straight back out as a
            // part and into the model's context for the next round.
            let mut result_blocks = Vec::with_capacity(tool_uses.len());
            for (tool_use_id, name, input) in tool_uses {
                if cancel.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }

                tracing::info!(tool = %name, args = %input, "tool invocation");
                send_part(
                    &parts_tx,
                    Part::ToolInvocation {
                        tool_name: name.clone(),
                        args: input.clone(),
                    },
                )
                .await?;

                let output = tokio::select! {
                    output = self.tools.execute(&name, input) => output,
                    () = cancel.cancelled() => return Err(AgentError::Cancelled),
                };

                let (payload, is_error, model_view) = match output {
                    Some(out) => (out.result_payload(), !out.success, out.output),
                    None => {
                        let msg = format!("Unknown tool: {name}");
                        (Value::from(msg.clone()), true, msg)
                    }
                };

                send_part(
                    &parts_tx,
                    Part::ToolResult {
                        tool_name: name,
                        result: payload,
                        is_error,
                    },
                )
                .await?;

                result_blocks.push(ContentBlock::tool_result(tool_use_id, model_view, is_error));
            }

            context.push(LlmMessage::user(result_blocks));
        }

        tracing::warn!(max_steps = MAX_STEPS, "turn hit the step bound");
        Ok(())
    }
}

async fn send_part(tx: &mpsc::Sender<Part>, part: Part) -> Result<(), AgentError> {
    tx.send(part).await.map_err(|_| AgentError::ChannelClosed)
}

/// Flatten prior messages into model context. Tool invocations and results
/// from earlier assistant turns are replayed as tool-use/tool-result block
/// pairs; step markers and unknown parts carry no model-visible content.
fn history_to_llm_messages(history: &[Message]) -> Vec<LlmMessage> {
    let mut messages = Vec::new();

    for msg in history {
        match msg.role {
            Role::User => {
                let text = msg.text();
                messages.push(LlmMessage::user(vec![ContentBlock::text(text)]));
            }
            Role::Assistant => {
                let mut blocks = Vec::new();
                let mut results = Vec::new();
                let mut call_seq = 0usize;

                for part in &msg.parts {
                    match part {
                        Part::Text { text } => blocks.push(ContentBlock::text(text.clone())),
                        Part::ToolInvocation { tool_name, args } => {
                            call_seq += 1;
                            blocks.push(ContentBlock::tool_use(
                                format!("{}-call-{call_seq}", msg.id),
                                tool_name.clone(),
                                args.clone(),
                            ));
                        }
                        Part::ToolResult {
                            result, is_error, ..
                        } => {
                            results.push(ContentBlock::tool_result(
                                format!("{}-call-{}", msg.id, results.len() + 1),
                                result.to_string(),
                                *is_error,
                            ));
                        }
                        Part::StepStart | Part::Unknown { .. } => {}
                    }
                }

                if !blocks.is_empty() {
                    messages.push(LlmMessage::assistant(blocks));
                }
                if !results.is_empty() {
                    messages.push(LlmMessage::user(results));
                }
            }
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, Usage};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock LLM client that returns queued responses
    struct MockLlmService {
        responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl MockLlmService {
        fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn queue_text(&self, text: &str) {
            self.queue(Ok(LlmResponse {
                content: vec![ContentBlock::text(text)],
                usage: Usage::default(),
            }));
        }

        fn queue_tool_call(&self, text: Option<&str>, name: &str, input: Value) {
            let mut content = Vec::new();
            if let Some(t) = text {
                content.push(ContentBlock::text(t));
            }
            content.push(ContentBlock::tool_use("call-1", name, input));
            self.queue(Ok(LlmResponse {
                content,
                usage: Usage::default(),
            }));
        }

        fn queue(&self, response: Result<LlmResponse, LlmError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmService for MockLlmService {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
        }

        fn model_id(&self) -> &str {
            "mock-model"
        }
    }

    fn seeded_agent(mock: Arc<MockLlmService>) -> Agent {
        let db = Database::open_in_memory().unwrap();
        db.seed().unwrap();
        Agent::new(mock, db)
    }

    async fn collect_turn(
        agent: &Agent,
        history: &[Message],
    ) -> (Result<(), AgentError>, Vec<Part>) {
        let (tx, mut rx) = mpsc::channel(64);
        let result = agent
            .run_turn(history, tx, CancellationToken::new())
            .await;
        let mut parts = Vec::new();
        while let Ok(part) = rx.try_recv() {
            parts.push(part);
        }
        (result, parts)
    }

    #[tokio::test]
    async fn text_only_response_ends_the_turn() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_text("Hello! Ask me about your data.");
        let agent = seeded_agent(mock.clone());

        let history = vec![Message::user("hi")];
        let (result, parts) = collect_turn(&agent, &history).await;

        result.unwrap();
        assert_eq!(
            parts,
            vec![
                Part::StepStart,
                Part::text("Hello! Ask me about your data."),
            ]
        );
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn tool_call_emits_invocation_then_result_in_order() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_tool_call(
            Some("Checking the data."),
            "db",
            json!({"query": "SELECT COUNT(*) FROM products"}),
        );
        mock.queue_text("There are 18 products.");
        let agent = seeded_agent(mock.clone());

        let history = vec![Message::user("how many products?")];
        let (result, parts) = collect_turn(&agent, &history).await;

        result.unwrap();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[0], Part::StepStart);
        assert_eq!(parts[1], Part::text("Checking the data."));
        assert!(matches!(
            &parts[2],
            Part::ToolInvocation { tool_name, .. } if tool_name == "db"
        ));
        match &parts[3] {
            Part::ToolResult {
                tool_name,
                result,
                is_error,
            } => {
                assert_eq!(tool_name, "db");
                assert!(!is_error);
                assert_eq!(result["rows"][0][0], json!(18));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
        assert_eq!(parts[4], Part::StepStart);
        assert_eq!(parts[5], Part::text("There are 18 products."));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn forbidden_query_becomes_error_result_not_turn_failure() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_tool_call(None, "db", json!({"query": "DROP TABLE products"}));
        mock.queue_text("I can't run write statements.");
        let agent = seeded_agent(mock);

        let history = vec![Message::user("drop the products table")];
        let (result, parts) = collect_turn(&agent, &history).await;

        result.unwrap();
        let error_result = parts.iter().find_map(|p| match p {
            Part::ToolResult { is_error, .. } => Some(*is_error),
            _ => None,
        });
        assert_eq!(error_result, Some(true));
        // The model still got to respond conversationally.
        assert!(parts.contains(&Part::text("I can't run write statements.")));
    }

    #[tokio::test]
    async fn turn_stops_at_the_step_bound() {
        let mock = Arc::new(MockLlmService::new());
        // A model that never stops asking for tools.
        for _ in 0..10 {
            mock.queue_tool_call(None, "schema", json!({"query": ""}));
        }
        let agent = seeded_agent(mock.clone());

        let history = vec![Message::user("loop forever")];
        let (result, parts) = collect_turn(&agent, &history).await;

        result.unwrap();
        assert_eq!(mock.request_count(), MAX_STEPS);
        let step_markers = parts.iter().filter(|p| **p == Part::StepStart).count();
        assert_eq!(step_markers, MAX_STEPS);
    }

    #[tokio::test]
    async fn provider_failure_streams_no_parts() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue(Err(LlmError::network("connection refused")));
        let agent = seeded_agent(mock);

        let history = vec![Message::user("hi")];
        let (result, parts) = collect_turn(&agent, &history).await;

        assert!(matches!(result, Err(AgentError::Provider(_))));
        // A failed first round yields no assistant message at all, not even
        // the step marker.
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn cancellation_aborts_between_steps() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_text("never emitted");
        let agent = seeded_agent(mock);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(8);
        let history = vec![Message::user("hi")];
        let result = agent.run_turn(&history, tx, cancel).await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn history_replays_prior_tool_traffic() {
        let history = vec![
            Message::user("how many products?"),
            Message {
                id: "a1".to_string(),
                role: Role::Assistant,
                parts: vec![
                    Part::StepStart,
                    Part::ToolInvocation {
                        tool_name: "db".to_string(),
                        args: json!({"query": "SELECT COUNT(*) FROM products"}),
                    },
                    Part::ToolResult {
                        tool_name: "db".to_string(),
                        result: json!({"rows": [[18]]}),
                        is_error: false,
                    },
                    Part::text("18 products."),
                ],
            },
            Message::user("and sales?"),
        ];

        let messages = history_to_llm_messages(&history);
        // user, assistant (tool_use then text, in arrival order), tool
        // results, trailing user
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[1].content[0], ContentBlock::ToolUse { .. }));
        assert!(matches!(messages[1].content[1], ContentBlock::Text { .. }));
        assert!(matches!(
            messages[2].content[0],
            ContentBlock::ToolResult { .. }
        ));
    }
}
