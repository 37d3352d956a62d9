//! Collaborator trait definitions for prgate
//!
//! These traits are the seams between the engine and the outside world:
//! - `TicketTracker`: ticket lookup (Jira or compatible)
//! - `ReviewModel`: language-model completion for the AI review
//! - `PullRequestHost`: PR context, comment posting, commit status (GitHub)
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module; HTTP implementations live in
//! `prgate-clients`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CollaboratorError, PrContext, Verdict};
use crate::report::CommentPayload;

/// Result type for collaborator calls
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

// ---------------------------------------------------------------------------
// TicketTracker
// ---------------------------------------------------------------------------

/// What the tracker knows about a ticket id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub exists: bool,
    pub project_key: String,
    pub status: String,
    pub summary: Option<String>,
}

impl TicketInfo {
    /// A ticket the tracker has never heard of.
    pub fn missing() -> Self {
        Self {
            exists: false,
            project_key: String::new(),
            status: String::new(),
            summary: None,
        }
    }

    pub fn found(project_key: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            exists: true,
            project_key: project_key.into(),
            status: status.into(),
            summary: None,
        }
    }
}

/// Ticket tracker lookup.
#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// Look up a ticket by id (e.g. `PROJ-1234`).
    ///
    /// An unknown ticket is `Ok` with `exists == false`; only transport and
    /// auth problems are errors.
    async fn fetch_ticket(&self, ticket_id: &str) -> CollaboratorResult<TicketInfo>;

    /// Web link for a ticket, if the tracker has one.
    fn ticket_url(&self, _ticket_id: &str) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// ReviewModel
// ---------------------------------------------------------------------------

/// Language-model completion used by the AI review.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Model identifier, for reporting.
    fn model_id(&self) -> &str;

    /// Send the prompt and return the raw text reply.
    async fn complete(&self, prompt: &str) -> CollaboratorResult<String>;
}

// ---------------------------------------------------------------------------
// PullRequestHost
// ---------------------------------------------------------------------------

/// What `upsert_comment` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Created,
    Updated,
    Unchanged,
}

/// The VCS host that owns the pull request.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Branch, title, diff and changed files of a pull request.
    async fn fetch_context(&self, number: u64) -> CollaboratorResult<PrContext>;

    /// Create the comment identified by `payload.key`, or edit the existing
    /// one when its body differs. Identical bodies are left alone.
    async fn upsert_comment(
        &self,
        number: u64,
        payload: &CommentPayload,
    ) -> CollaboratorResult<CommentAction>;

    /// Publish the final pass/fail signal on the head commit.
    async fn set_status(&self, head_sha: &str, verdict: &Verdict) -> CollaboratorResult<()>;
}
