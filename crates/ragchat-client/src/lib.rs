//! Client-side composition for the ragchat assistant.
//!
//! Ties the streaming transport to the reveal scheduler for one conversation
//! turn, and wraps the plain request/response endpoints that accompany it.
//!
//! - [`ClientConfig`]: TOML configuration with defaults.
//! - [`MessageFields`]: folds stream events into the fields of one message.
//! - [`TurnStreamer`]: runs one streamed turn into a reveal timeline.
//! - [`ChatApi`]: stop, retry, and hallucination-check endpoints.

/// Conversation endpoints.
pub mod api;
/// Client configuration.
pub mod config;
/// Per-message field accumulation.
pub mod fields;
/// Streaming one turn into a reveal timeline.
pub mod turn;

pub use api::ChatApi;
pub use config::ClientConfig;
pub use fields::MessageFields;
pub use turn::{TurnOutcome, TurnStatus, TurnStreamer};
