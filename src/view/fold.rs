//! Folding of a streamed part sequence into one assistant message.
//!
//! Parts append in arrival order, with one exception: a text part arriving
//! while the last folded part is also text merges into it, so a run of deltas
//! collapses to a single part. Nothing is ever removed or reordered, and an
//! abruptly ended stream keeps every part it received without reaching
//! `Complete`.

use crate::message::{Message, Part};

/// Lifecycle of one in-flight assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No part received yet.
    Empty,
    /// At least one part received, stream still open.
    Streaming,
    /// Transport signaled end-of-stream; parts are frozen.
    Complete,
}

/// Accumulates streamed parts into an assistant message.
#[derive(Debug, Clone)]
pub struct MessageFold {
    message: Message,
    phase: StreamPhase,
}

impl MessageFold {
    pub fn new() -> Self {
        Self {
            message: Message::assistant(),
            phase: StreamPhase::Empty,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_complete(&self) -> bool {
        self.phase == StreamPhase::Complete
    }

    /// Fold one incoming part. Ignored after `Complete`: a finished message
    /// never mutates.
    pub fn apply(&mut self, part: Part) {
        if self.phase == StreamPhase::Complete {
            return;
        }
        self.phase = StreamPhase::Streaming;

        if let (Part::Text { text: delta }, Some(Part::Text { text: last })) =
            (&part, self.message.parts.last_mut())
        {
            last.push_str(delta);
            return;
        }
        self.message.parts.push(part);
    }

    /// End-of-stream: freeze the message.
    pub fn finish(&mut self) {
        self.phase = StreamPhase::Complete;
    }

    /// Consume the fold, yielding the message and whether it completed.
    pub fn into_message(self) -> (Message, bool) {
        let complete = self.phase == StreamPhase::Complete;
        (self.message, complete)
    }
}

impl Default for MessageFold {
    fn default() -> Self {
        Self::new()
    }
}
