//! Composer: the single pending input string and its submission rules.

/// Holds the text being typed for the next user message.
#[derive(Debug, Default)]
pub struct Composer {
    input: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn push_str(&mut self, text: &str) {
        self.input.push_str(text);
    }

    /// Enter keystroke. Without a modifier this is a submission attempt; with
    /// one it inserts a literal newline instead.
    pub fn enter(&mut self, modifier_held: bool) -> Option<String> {
        if modifier_held {
            self.input.push('\n');
            return None;
        }
        self.take_submission()
    }

    /// Explicit submit action. Yields the input and clears it, unless the
    /// trimmed input is empty, in which case nothing happens.
    pub fn take_submission(&mut self) -> Option<String> {
        if self.input.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.input))
    }
}
