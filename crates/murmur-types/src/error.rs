use thiserror::Error;

use crate::llm::CompletionError;

/// Errors from repository operations (used by trait definitions in murmur-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from settings validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("temperature {0} out of range (0.0-2.0)")]
    TemperatureOutOfRange(f64),

    #[error("max tokens {0} out of range (100-4000)")]
    MaxTokensOutOfRange(u32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from session controller operations outside the send path.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no user signed in")]
    SignedOut,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors aborting a send-message turn.
///
/// Any of these rolls back the optimistic assistant placeholder; the
/// user's message stays in place.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
