//! Server-Sent Events support
//!
//! Each streamed part becomes one SSE event named by its wire tag; a fatal
//! turn failure becomes a terminal `error` event. The stream closing is the
//! end-of-turn signal.

use crate::message::Part;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// One event on the chat response stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Part(Part),
    Error { message: String },
}

/// Convert the turn's event channel to an SSE response
pub fn sse_stream(
    rx: tokio::sync::mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(rx).map(|event| Ok(stream_event_to_axum(&event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn stream_event_to_axum(event: &StreamEvent) -> Event {
    match event {
        StreamEvent::Part(part) => Event::default()
            .event(part.tag())
            .data(part.to_value().to_string()),
        StreamEvent::Error { message } => Event::default()
            .event("error")
            .data(json!({ "type": "error", "message": message }).to_string()),
    }
}
