//! Conversation view state: one container per open conversation.
//!
//! Owns the message list, the single in-flight assistant fold, the composer,
//! and the scroll tracker. Consumes the part event stream as a single-threaded
//! cooperative fold; created on view mount, dropped on unmount.

mod composer;
mod fold;
mod render;
mod scroll;

pub use composer::Composer;
pub use fold::{MessageFold, StreamPhase};
pub use render::{render_part, RenderBlock};
pub use scroll::{ScrollTracker, NEAR_BOTTOM_THRESHOLD};

use crate::message::{Message, Part};

/// Per-conversation UI state container.
pub struct ConversationView {
    messages: Vec<Message>,
    in_flight: Option<MessageFold>,
    pub composer: Composer,
    pub scroll: ScrollTracker,
}

impl ConversationView {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            in_flight: None,
            composer: Composer::new(),
            scroll: ScrollTracker::new(),
        }
    }

    /// All finalized messages, in order. The in-flight assistant message is
    /// exposed separately via [`Self::streaming_message`].
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn streaming_message(&self) -> Option<&Message> {
        self.in_flight.as_ref().map(MessageFold::message)
    }

    /// Stream-pending latch: while true, new submissions are refused.
    pub fn is_stream_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Attempt to submit the composer's input as a new user message.
    ///
    /// Nothing happens (and no stream may be opened) when the trimmed input
    /// is empty or a stream is already pending.
    pub fn submit(&mut self) -> Option<&Message> {
        if self.is_stream_pending() {
            return None;
        }
        let text = self.composer.take_submission()?;
        self.messages.push(Message::user(text));
        self.messages.last()
    }

    /// Keyboard submission path: Enter submits, modifier-Enter inserts a
    /// newline. The pending latch applies the same way as [`Self::submit`].
    pub fn enter_pressed(&mut self, modifier_held: bool) -> Option<&Message> {
        if modifier_held {
            self.composer.enter(true);
            return None;
        }
        self.submit()
    }

    /// Open the assistant's side of the turn: an empty fold ready for parts.
    pub fn begin_stream(&mut self) {
        self.in_flight = Some(MessageFold::new());
    }

    /// Fold one incoming part into the in-flight message. Returns whether the
    /// viewport should advance (the reader was at the bottom).
    pub fn apply_part(&mut self, part: Part) -> bool {
        if let Some(fold) = self.in_flight.as_mut() {
            fold.apply(part);
        }
        self.scroll.should_follow()
    }

    /// End-of-stream: freeze and append the assistant message.
    pub fn finish_stream(&mut self) {
        if let Some(mut fold) = self.in_flight.take() {
            fold.finish();
            let (message, _) = fold.into_message();
            self.messages.push(message);
        }
    }

    /// Abrupt termination: received parts stand, but the message is not
    /// marked complete. Returns the fold so callers can inspect its phase.
    pub fn abort_stream(&mut self) -> Option<MessageFold> {
        let fold = self.in_flight.take()?;
        self.messages.push(fold.message().clone());
        Some(fold)
    }
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use serde_json::json;

    #[test]
    fn submission_appends_user_message_and_clears_input() {
        let mut view = ConversationView::new();
        view.composer.set_input("what sold best in the North?");

        let message = view.submit().unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "what sold best in the North?");
        assert_eq!(view.composer.input(), "");
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn whitespace_submission_appends_nothing() {
        let mut view = ConversationView::new();
        view.composer.set_input("   \n ");
        assert!(view.submit().is_none());
        assert!(view.messages().is_empty());
        assert!(!view.is_stream_pending());
    }

    #[test]
    fn pending_stream_latches_out_new_submissions() {
        let mut view = ConversationView::new();
        view.composer.set_input("first");
        view.submit().unwrap();
        view.begin_stream();

        view.composer.set_input("second");
        assert!(view.submit().is_none());
        assert_eq!(view.messages().len(), 1);

        view.finish_stream();
        assert!(view.submit().is_some());
    }

    #[test]
    fn modifier_enter_never_submits() {
        let mut view = ConversationView::new();
        view.composer.set_input("line");
        assert!(view.enter_pressed(true).is_none());
        assert!(view.messages().is_empty());
        assert_eq!(view.composer.input(), "line\n");
    }

    #[test]
    fn parts_fold_into_the_streaming_message() {
        let mut view = ConversationView::new();
        view.begin_stream();
        view.apply_part(Part::StepStart);
        view.apply_part(Part::text("18 "));
        view.apply_part(Part::text("products."));

        let streaming = view.streaming_message().unwrap();
        assert_eq!(
            streaming.parts,
            vec![Part::StepStart, Part::text("18 products.")]
        );

        view.finish_stream();
        assert!(view.streaming_message().is_none());
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn aborted_stream_keeps_partial_message_incomplete() {
        let mut view = ConversationView::new();
        view.begin_stream();
        view.apply_part(Part::StepStart);
        view.apply_part(Part::text("Looking"));

        let fold = view.abort_stream().unwrap();
        assert!(!fold.is_complete());
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.messages()[0].parts.len(), 2);
        assert!(!view.is_stream_pending());
    }

    #[test]
    fn new_part_advances_viewport_only_when_at_bottom() {
        let mut view = ConversationView::new();
        view.begin_stream();
        assert!(view.apply_part(Part::text("a")));

        view.scroll.observe(0.0, 2000.0, 600.0);
        assert!(!view.apply_part(Part::text("b")));
        assert!(view.scroll.show_jump_to_latest());
    }

    #[test]
    fn unknown_parts_flow_through_fold_and_render() {
        let mut view = ConversationView::new();
        view.begin_stream();
        view.apply_part(Part::Unknown {
            raw: json!({"type": "future-tag", "payload": {}}),
        });
        view.finish_stream();

        let blocks = render_part(&view.messages()[0].parts[0]);
        assert!(matches!(blocks[0], RenderBlock::Collapsible { .. }));
    }
}
