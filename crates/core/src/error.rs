//! Error types for the autoforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all autoforge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Proposal validation errors ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Action execution errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Decision oracle errors ---
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // --- Session state errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejection of a proposed action before any side effect occurs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown action: {0}")]
    InvalidAction(String),

    #[error("Missing required parameter '{param}' for action '{action}'")]
    MissingParameter { action: String, param: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Failure raised while executing a validated action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Path '{path}' resolves outside the project root")]
    PathEscape { path: String },

    #[error("Handler failed: {action}: {reason}")]
    HandlerFailed { action: String, reason: String },

    #[error("Action timed out: {action} after {timeout_secs}s")]
    Timeout { action: String, timeout_secs: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Oracle request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Oracle returned an empty reply")]
    EmptyReply,

    #[error("Failed to parse oracle reply: {0}")]
    MalformedReply(String),

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Saved state is unreadable: {0}")]
    Corrupt(String),
}
