//! Check execution with timeout, retry and error normalization.
//!
//! [`CheckRunner::run`] is total: whatever a check does (returns an error,
//! hangs, panics) the caller gets exactly one [`CheckResult`].

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::check::Check;
use crate::domain::{CheckError, CheckKind, CheckResult, PrContext};
use crate::obs;

/// Longest `raw_error` a result will carry.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Timeout and retry budget for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt limit. Zero means unbounded.
    pub timeout: Duration,

    /// Extra attempts after a transient failure.
    pub max_retries: u32,

    /// Delay before a retry, unless the collaborator asked for another.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Defaults: local scans 30s without retry, ticket lookup 20s with one
    /// retry after 2s, AI review 120s with one retry after 5s.
    pub fn for_check(kind: CheckKind) -> Self {
        match kind {
            CheckKind::SecretScan | CheckKind::StaticAnalysis => Self {
                timeout: Duration::from_secs(30),
                max_retries: 0,
                backoff: Duration::ZERO,
            },
            CheckKind::TicketValidation => Self {
                timeout: Duration::from_secs(20),
                max_retries: 1,
                backoff: Duration::from_secs(2),
            },
            CheckKind::AiReview => Self {
                timeout: Duration::from_secs(120),
                max_retries: 1,
                backoff: Duration::from_secs(5),
            },
        }
    }

    /// No timeout, one retry, no backoff.
    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            max_retries: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    /// Worst-case wall time of all attempts; `None` when unbounded.
    pub fn budget(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            return None;
        }
        Some(self.timeout * (self.max_retries + 1) + self.backoff * self.max_retries)
    }
}

/// Runs checks under their [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CheckRunner {
    policies: HashMap<CheckKind, RetryPolicy>,
}

enum Attempt {
    Done(CheckResult),
    Failed(CheckError),
    TimedOut,
    Panicked(String),
}

/// Aborts the spawned attempt if the runner itself is cancelled.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl CheckRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, kind: CheckKind, policy: RetryPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Same policy for every check.
    pub fn uniform(policy: RetryPolicy) -> Self {
        CheckKind::ALL
            .into_iter()
            .fold(Self::new(), |runner, kind| runner.with_policy(kind, policy))
    }

    pub fn policy(&self, kind: CheckKind) -> RetryPolicy {
        self.policies
            .get(&kind)
            .copied()
            .unwrap_or_else(|| RetryPolicy::for_check(kind))
    }

    /// Run one check to a final result.
    pub async fn run(&self, check: &Check, ctx: Arc<PrContext>) -> CheckResult {
        let kind = check.kind();
        let policy = self.policy(kind);
        let started = Instant::now();
        let mut attempts = 0u32;

        let result = loop {
            attempts += 1;
            match attempt(check, Arc::clone(&ctx), policy.timeout).await {
                Attempt::Done(result) => break result,
                Attempt::Failed(err) if err.is_transient() && attempts <= policy.max_retries => {
                    let delay = err.retry_after().unwrap_or(policy.backoff);
                    obs::emit_check_retry(kind, attempts, delay.as_millis() as u64, &err);
                    tokio::time::sleep(delay).await;
                }
                Attempt::Failed(err) => break CheckResult::error(kind, diagnostic(&err.to_string())),
                Attempt::TimedOut => {
                    break CheckResult::error(
                        kind,
                        format!("timed out after {}", format_duration(policy.timeout)),
                    )
                }
                Attempt::Panicked(msg) => {
                    break CheckResult::error(kind, diagnostic(&format!("check panicked: {msg}")))
                }
            }
        };

        obs::emit_check_finished(&result, started.elapsed().as_millis() as u64, attempts);
        result
    }
}

async fn attempt(check: &Check, ctx: Arc<PrContext>, timeout: Duration) -> Attempt {
    let check = check.clone();
    let mut task = AbortOnDrop(tokio::spawn(async move { check.execute(&ctx).await }));

    let joined = if timeout > Duration::ZERO {
        match tokio::time::timeout(timeout, &mut task.0).await {
            Ok(joined) => joined,
            Err(_) => return Attempt::TimedOut,
        }
    } else {
        (&mut task.0).await
    };

    match joined {
        Ok(Ok(result)) => Attempt::Done(result),
        Ok(Err(err)) => Attempt::Failed(err),
        Err(err) if err.is_panic() => Attempt::Panicked(panic_message(err.into_panic())),
        Err(err) => Attempt::Failed(CheckError::Internal(err.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Cap a diagnostic at [`MAX_DIAGNOSTIC_CHARS`].
pub fn diagnostic(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_DIAGNOSTIC_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
