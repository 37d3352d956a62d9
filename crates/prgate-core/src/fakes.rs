//! In-memory collaborators (testing only)
//!
//! Provides `StaticTicketTracker`, `FailingTicketTracker`,
//! `ScriptedReviewModel`, `StallingReviewModel` and `RecordingPullRequestHost`
//! that satisfy the trait contracts without any network access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collaborators::*;
use crate::config::DEFAULT_AI_MODEL;
use crate::domain::{CollaboratorError, Outcome, PrContext, Verdict};
use crate::report::CommentPayload;

// ---------------------------------------------------------------------------
// StaticTicketTracker
// ---------------------------------------------------------------------------

/// Tracker backed by a fixed `HashMap<ticket id, TicketInfo>`.
///
/// Unknown ids come back as [`TicketInfo::missing`].
#[derive(Debug, Default)]
pub struct StaticTicketTracker {
    tickets: HashMap<String, TicketInfo>,
    lookups: Mutex<Vec<String>>,
}

impl StaticTicketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket(mut self, id: impl Into<String>, info: TicketInfo) -> Self {
        self.tickets.insert(id.into(), info);
        self
    }

    /// Ids looked up so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketTracker for StaticTicketTracker {
    async fn fetch_ticket(&self, ticket_id: &str) -> CollaboratorResult<TicketInfo> {
        self.lookups.lock().unwrap().push(ticket_id.to_string());
        Ok(self
            .tickets
            .get(ticket_id)
            .cloned()
            .unwrap_or_else(TicketInfo::missing))
    }
}

// ---------------------------------------------------------------------------
// FailingTicketTracker
// ---------------------------------------------------------------------------

/// Tracker whose every lookup fails with the same error.
#[derive(Debug)]
pub struct FailingTicketTracker {
    error: CollaboratorError,
    calls: AtomicUsize,
}

impl FailingTicketTracker {
    pub fn new(error: CollaboratorError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketTracker for FailingTicketTracker {
    async fn fetch_ticket(&self, _ticket_id: &str) -> CollaboratorResult<TicketInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedReviewModel
// ---------------------------------------------------------------------------

/// Model that answers from a queue of canned replies and records prompts.
#[derive(Debug)]
pub struct ScriptedReviewModel {
    model_id: String,
    replies: Mutex<VecDeque<CollaboratorResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReviewModel {
    /// Reports [`DEFAULT_AI_MODEL`] as its model id.
    pub fn new(replies: Vec<CollaboratorResult<String>>) -> Self {
        Self {
            model_id: DEFAULT_AI_MODEL.to_string(),
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// A model that always approves with no issues.
    pub fn approving() -> Self {
        Self::new(vec![Ok(
            r#"{"decision":"PASS","severity":"NONE","issues":[],"suggestions":[],"summary":"Looks good"}"#
                .to_string(),
        )])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewModel for ScriptedReviewModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, prompt: &str) -> CollaboratorResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Transport("no scripted reply left".into())))
    }
}

// ---------------------------------------------------------------------------
// StallingReviewModel
// ---------------------------------------------------------------------------

/// Model that never answers. Pair with a timeout and paused tokio time.
#[derive(Debug, Default)]
pub struct StallingReviewModel {
    calls: AtomicUsize,
}

impl StallingReviewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewModel for StallingReviewModel {
    fn model_id(&self) -> &str {
        DEFAULT_AI_MODEL
    }

    async fn complete(&self, _prompt: &str) -> CollaboratorResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// RecordingPullRequestHost
// ---------------------------------------------------------------------------

/// A comment as stored by the fake host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComment {
    pub id: u64,
    pub body: String,
}

#[derive(Debug, Default)]
struct HostState {
    contexts: HashMap<u64, PrContext>,
    comments: HashMap<u64, Vec<StoredComment>>,
    statuses: Vec<(String, Outcome)>,
    next_id: u64,
    edits: usize,
}

/// Host that serves fixed contexts and records comments and statuses.
#[derive(Debug, Default)]
pub struct RecordingPullRequestHost {
    state: Mutex<HostState>,
}

impl RecordingPullRequestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(self, number: u64, ctx: PrContext) -> Self {
        self.state.lock().unwrap().contexts.insert(number, ctx);
        self
    }

    /// Add a comment that was not written by prgate.
    pub fn with_comment(self, number: u64, body: impl Into<String>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.comments.entry(number).or_default().push(StoredComment {
                id,
                body: body.into(),
            });
        }
        self
    }

    pub fn comments(&self, number: u64) -> Vec<StoredComment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of in-place comment edits so far.
    pub fn edits(&self) -> usize {
        self.state.lock().unwrap().edits
    }

    pub fn statuses(&self) -> Vec<(String, Outcome)> {
        self.state.lock().unwrap().statuses.clone()
    }
}

#[async_trait]
impl PullRequestHost for RecordingPullRequestHost {
    async fn fetch_context(&self, number: u64) -> CollaboratorResult<PrContext> {
        self.state
            .lock()
            .unwrap()
            .contexts
            .get(&number)
            .cloned()
            .ok_or_else(|| CollaboratorError::Http {
                status: 404,
                body: format!("pull request {number} not found"),
            })
    }

    async fn upsert_comment(
        &self,
        number: u64,
        payload: &CommentPayload,
    ) -> CollaboratorResult<CommentAction> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .comments
            .get(&number)
            .and_then(|list| list.iter().position(|c| payload.matches_key(&c.body)));

        match existing {
            Some(idx) => {
                let comments = state.comments.entry(number).or_default();
                if payload.is_current(&comments[idx].body) {
                    return Ok(CommentAction::Unchanged);
                }
                comments[idx].body = payload.body.clone();
                state.edits += 1;
                Ok(CommentAction::Updated)
            }
            None => {
                state.next_id += 1;
                let id = state.next_id;
                state.comments.entry(number).or_default().push(StoredComment {
                    id,
                    body: payload.body.clone(),
                });
                Ok(CommentAction::Created)
            }
        }
    }

    async fn set_status(&self, head_sha: &str, verdict: &Verdict) -> CollaboratorResult<()> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .push((head_sha.to_string(), verdict.outcome));
        Ok(())
    }
}
