//! Core types and error definitions for the ragchat client.
//!
//! This crate provides the foundational types shared across all ragchat crates,
//! including error handling, the streamed event model, and the identity used to
//! key animated fields.
//!
//! # Main types
//!
//! - [`RagchatError`]: Unified error enum for all ragchat subsystems.
//! - [`RagchatResult`]: Convenience alias for `Result<T, RagchatError>`.
//! - [`AbortCause`]: Why a streaming transfer was aborted.
//! - [`StreamEvent`]: One structured event demultiplexed from a response body.
//! - [`PersistKey`]: Stable identity of one animated text field.

/// Structured events carried by a streamed response body.
pub mod event;
/// Identity of animated fields.
pub mod key;

pub use event::StreamEvent;
pub use key::PersistKey;

use std::time::Duration;

// --- Error types ---

/// The trigger that aborted an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// The caller asked for the current transfer to stop.
    User,
    /// No bytes arrived within the configured stall timeout.
    Stall {
        /// How long the transfer sat idle before it was abandoned.
        idle: Duration,
    },
}

impl std::fmt::Display for AbortCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "cancelled by user"),
            Self::Stall { idle } => write!(f, "stalled, no bytes for {}s", idle.as_secs()),
        }
    }
}

/// Top-level error type for the ragchat client.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum RagchatError {
    /// A transport failure or a non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The transfer was aborted before it completed.
    #[error("Transfer aborted: {0}")]
    Aborted(AbortCause),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagchatError {
    /// Returns `true` if the transfer was stopped on request.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::Aborted(AbortCause::User))
    }

    /// Returns `true` if the transfer was abandoned for lack of progress.
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Aborted(AbortCause::Stall { .. }))
    }
}

/// A convenience `Result` alias using [`RagchatError`].
pub type RagchatResult<T> = Result<T, RagchatError>;
