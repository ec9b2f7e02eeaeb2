//! HTTP request handlers

use super::sse::{sse_stream, StreamEvent};
use super::types::{ChatRequest, ErrorResponse};
use super::AppState;
use crate::agent::{Agent, AgentError, TURN_BUDGET};
use crate::message::Part;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Built-in chat page
        .route("/", get(serve_chat_page))
        // The single chat endpoint: conversation in, part stream out
        .route("/api/chat", post(chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn serve_chat_page() -> Html<&'static str> {
    Html(include_str!("chat.html"))
}

async fn get_version() -> &'static str {
    concat!("sqlpilot ", env!("CARGO_PKG_VERSION"))
}

/// One user turn: accept the conversation so far, stream back the parts of a
/// single new assistant message.
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let agent = state
        .agent
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("No model backend configured".to_string()))?;

    let (tx, rx) = mpsc::channel::<StreamEvent>(64);
    tokio::spawn(run_turn_to_channel(agent, req.messages, tx));

    Ok(sse_stream(rx))
}

/// Drive one agent turn, forwarding parts to the SSE channel. Enforces the
/// turn budget and cancels the in-flight step when the client goes away.
async fn run_turn_to_channel(
    agent: Arc<Agent>,
    messages: Vec<crate::message::Message>,
    tx: mpsc::Sender<StreamEvent>,
) {
    let (parts_tx, mut parts_rx) = mpsc::channel::<Part>(64);
    let cancel = CancellationToken::new();

    let turn = tokio::spawn({
        let cancel = cancel.clone();
        async move { agent.run_turn(&messages, parts_tx, cancel).await }
    });

    let deadline = tokio::time::sleep(TURN_BUDGET);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            part = parts_rx.recv() => match part {
                Some(part) => {
                    if tx.send(StreamEvent::Part(part)).await.is_err() {
                        // Client disconnected; abort the turn.
                        cancel.cancel();
                        break;
                    }
                }
                // Agent finished (or failed); outcome handled below.
                None => break,
            },
            () = &mut deadline => {
                tracing::warn!(budget_secs = TURN_BUDGET.as_secs(), "turn budget exceeded");
                cancel.cancel();
                break;
            }
        }
    }

    // Closing the receiver unblocks any send still in flight in the turn task.
    drop(parts_rx);

    match turn.await {
        Ok(Ok(())) => {}
        Ok(Err(AgentError::Provider(e))) => {
            tracing::error!(error = %e, "turn failed: provider unavailable");
            let _ = tx
                .send(StreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
        // Cancellation and client disconnect just end the stream; whatever
        // parts were delivered stand.
        Ok(Err(AgentError::Cancelled | AgentError::ChannelClosed)) => {}
        Err(e) => {
            tracing::error!(error = %e, "turn task panicked");
            let _ = tx
                .send(StreamEvent::Error {
                    message: "internal error".to_string(),
                })
                .await;
        }
    }
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
