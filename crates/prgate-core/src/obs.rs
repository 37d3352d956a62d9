//! Structured lifecycle events for gate runs.
//!
//! - `run_span` tags everything logged during a run with its id and PR
//! - `emit_*` functions log one event each, keyed by an `event` field
//!
//! Findings are reported through comments, never logged as errors: a FAIL is
//! an expected outcome of a healthy run.

use tracing::{info, warn};

use crate::domain::{CheckKind, CheckResult, Verdict};

/// Span tagging everything logged during one run with its id and PR.
///
/// Attach it with `tracing::Instrument` so it follows the run across awaits.
pub fn run_span(run_id: &str, pr: Option<u64>) -> tracing::Span {
    match pr {
        Some(pr) => tracing::info_span!("prgate.run", run_id = %run_id, pr = pr),
        None => tracing::info_span!("prgate.run", run_id = %run_id),
    }
}

pub fn emit_run_started(run_id: &str, checks: &[CheckKind]) {
    let checks: Vec<&str> = checks.iter().map(|c| c.name()).collect();
    info!(event = "run.started", run_id = %run_id, checks = %checks.join(","));
}

/// One check reached its final result.
pub fn emit_check_finished(result: &CheckResult, duration_ms: u64, attempts: u32) {
    info!(
        event = "check.finished",
        check = %result.check(),
        status = %result.status(),
        severity = %result.severity(),
        findings = result.findings().len(),
        duration_ms = duration_ms,
        attempts = attempts,
    );
}

/// A transient failure is about to be retried.
pub fn emit_check_retry(check: CheckKind, attempt: u32, delay_ms: u64, error: &dyn std::fmt::Display) {
    warn!(
        event = "check.retry",
        check = %check,
        attempt = attempt,
        delay_ms = delay_ms,
        error = %error,
    );
}

pub fn emit_verdict_rendered(run_id: &str, verdict: &Verdict, duration_ms: u64) {
    info!(
        event = "verdict.rendered",
        run_id = %run_id,
        outcome = %verdict.outcome,
        blocking = verdict.blocking_reasons.len(),
        findings = verdict.total_findings(),
        duration_ms = duration_ms,
    );
}

pub fn emit_comment_posted(key: &str, action: &str) {
    info!(event = "comment.posted", key = %key, action = %action);
}

/// Publishing failed; the verdict itself stands.
pub fn emit_publish_error(target: &str, error: &dyn std::fmt::Display) {
    warn!(event = "publish.error", target = %target, error = %error);
}
