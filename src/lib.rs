//! sqlpilot - natural-language-to-SQL chat assistant
//!
//! An HTTP server that forwards chat conversations to a tool-calling model
//! agent and streams the resulting message parts back to the client, plus the
//! conversation-view state machine that folds such a stream into UI state.

pub mod agent;
pub mod api;
pub mod db;
pub mod llm;
pub mod message;
pub mod system_prompt;
pub mod tools;
pub mod view;
