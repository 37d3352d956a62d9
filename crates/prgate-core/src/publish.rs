//! Posting a rendered report back to the pull request.
//!
//! Publishing is best effort: a comment that cannot be posted is logged and
//! counted, and the remaining payloads and the commit status are still sent.
//! The verdict never depends on whether publishing worked.

use serde::Serialize;

use crate::collaborators::{CommentAction, PullRequestHost};
use crate::domain::Verdict;
use crate::obs;
use crate::report::Report;

/// What happened to each payload and to the commit status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// `(payload key, action)` for every payload that went through.
    pub comments: Vec<(String, CommentAction)>,
    /// Targets that failed (`payload key` or `status`).
    pub failures: Vec<String>,
    pub status_set: bool,
}

impl PublishOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Upsert every payload (sections, then summary) and set the commit status.
pub async fn publish(
    host: &dyn PullRequestHost,
    number: u64,
    head_sha: Option<&str>,
    report: &Report,
    verdict: &Verdict,
) -> PublishOutcome {
    let mut outcome = PublishOutcome::default();

    for payload in report.payloads() {
        match host.upsert_comment(number, payload).await {
            Ok(action) => {
                obs::emit_comment_posted(&payload.key, action_label(action));
                outcome.comments.push((payload.key.clone(), action));
            }
            Err(err) => {
                obs::emit_publish_error(&payload.key, &err);
                outcome.failures.push(payload.key.clone());
            }
        }
    }

    if let Some(sha) = head_sha {
        match host.set_status(sha, verdict).await {
            Ok(()) => outcome.status_set = true,
            Err(err) => {
                obs::emit_publish_error("status", &err);
                outcome.failures.push("status".to_string());
            }
        }
    }

    outcome
}

fn action_label(action: CommentAction) -> &'static str {
    match action {
        CommentAction::Created => "created",
        CommentAction::Updated => "updated",
        CommentAction::Unchanged => "unchanged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionEngine;
    use crate::domain::{CheckKind, CheckResult, Outcome};
    use crate::fakes::RecordingPullRequestHost;
    use crate::report::ReportRenderer;

    #[tokio::test]
    async fn test_republish_is_a_no_op() {
        let results = vec![
            CheckResult::pass(CheckKind::SecretScan),
            CheckResult::pass(CheckKind::StaticAnalysis),
        ];
        let verdict = DecisionEngine::default().evaluate(&results);
        let report = ReportRenderer::default().render(&results, &verdict);
        let host = RecordingPullRequestHost::new();

        let first = publish(&host, 5, Some("abc123"), &report, &verdict).await;
        assert!(first.is_complete());
        assert!(first.comments.iter().all(|(_, a)| *a == CommentAction::Created));

        let second = publish(&host, 5, Some("abc123"), &report, &verdict).await;
        assert!(second.comments.iter().all(|(_, a)| *a == CommentAction::Unchanged));
        assert_eq!(host.comments(5).len(), 3);
        assert_eq!(host.edits(), 0);
        assert_eq!(host.statuses(), vec![("abc123".to_string(), Outcome::Approved); 2]);
    }

    #[tokio::test]
    async fn test_no_status_without_head_sha() {
        let verdict = DecisionEngine::default().evaluate(&[]);
        let report = ReportRenderer::default().render(&[], &verdict);
        let host = RecordingPullRequestHost::new();
        let outcome = publish(&host, 1, None, &report, &verdict).await;
        assert!(!outcome.status_set);
        assert!(host.statuses().is_empty());
    }
}
