//! Error taxonomy for checks and their collaborators.
//!
//! None of these cross [`crate::runner::CheckRunner::run`]: the runner turns
//! every `CheckError` into an ERROR [`crate::domain::CheckResult`].

use std::time::Duration;

/// Failure talking to an external collaborator (tracker, model, VCS host).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl CollaboratorError {
    /// Whether a second attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Transport(_)
            | CollaboratorError::Auth(_)
            | CollaboratorError::RateLimited { .. } => true,
            CollaboratorError::Http { status, .. } => *status >= 500,
        }
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CollaboratorError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Why a check could not produce a verdict of its own.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CheckError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("malformed response: {reason} (excerpt: {excerpt:?})")]
    MalformedResponse { reason: String, excerpt: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn is_transient(&self) -> bool {
        match self {
            CheckError::Collaborator(e) => e.is_transient(),
            CheckError::MalformedResponse { .. } | CheckError::Internal(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CheckError::Collaborator(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Result type for check execution.
pub type CheckOutcome<T> = std::result::Result<T, CheckError>;
