//! Auto-scroll tracking for the conversation list.
//!
//! The view follows the bottom only while the reader is already there; once
//! they scroll up, new parts stop moving the viewport and a jump-to-latest
//! affordance appears instead.

/// Distance from the bottom, in scroll units, still counted as "at bottom".
pub const NEAR_BOTTOM_THRESHOLD: f64 = 60.0;

#[derive(Debug)]
pub struct ScrollTracker {
    at_bottom: bool,
}

impl ScrollTracker {
    pub fn new() -> Self {
        // A fresh view starts pinned to the bottom.
        Self { at_bottom: true }
    }

    /// Record a scroll position observation.
    pub fn observe(&mut self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        self.at_bottom = scroll_height - scroll_top - client_height < NEAR_BOTTOM_THRESHOLD;
    }

    pub fn at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// Whether a newly arrived part should advance the viewport to the bottom.
    pub fn should_follow(&self) -> bool {
        self.at_bottom
    }

    /// Whether to surface the manual jump-to-latest affordance.
    pub fn show_jump_to_latest(&self) -> bool {
        !self.at_bottom
    }

    /// Manual jump: pins the view back to the bottom.
    pub fn jump_to_latest(&mut self) {
        self.at_bottom = true;
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new()
    }
}
