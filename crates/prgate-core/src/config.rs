//! Gate configuration.
//!
//! A [`GateConfig`] is built once (the CLI fills it from flags and
//! environment), validated, and then only read.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::check::ai_review::DEFAULT_DIFF_SIZE_CAP;
use crate::decision::DecisionPolicy;
use crate::domain::{CheckKind, Severity};
use crate::runner::{CheckRunner, RetryPolicy};

/// Ticket statuses accepted when none are configured.
pub const DEFAULT_ALLOWED_STATUSES: &[&str] = &[
    "To Do",
    "In Progress",
    "In Review",
    "Ready for Review",
    "Code Review",
    "Done",
];

pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Invalid or missing configuration. Fatal: reported once, before any check runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no checks configured")]
    NoChecks,

    #[error("check {0} is listed more than once")]
    DuplicateCheck(CheckKind),

    #[error("unknown check: {0}")]
    UnknownCheck(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("ticket project key is required when a ticket tracker is configured")]
    MissingProjectKey,

    #[error("allowed ticket status list is empty")]
    NoAllowedStatuses,

    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("diff size cap must be at least 1 byte")]
    ZeroDiffCap,

    #[error("review model is {actual}, but {configured} is configured")]
    ModelMismatch { configured: String, actual: String },

    #[error("missing required option: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Ticket validation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketConfig {
    /// Required project key; must be set when a tracker is configured.
    pub project_key: Option<String>,
    pub allowed_statuses: Vec<String>,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            project_key: None,
            allowed_statuses: DEFAULT_ALLOWED_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// AI review settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// Model the review collaborator must report via `model_id()`.
    pub model: String,
    pub diff_size_cap: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_AI_MODEL.to_string(),
            diff_size_cap: DEFAULT_DIFF_SIZE_CAP,
        }
    }
}

/// Everything the engine needs to know before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Checks to run, in reporting order.
    pub checks: Vec<CheckKind>,
    pub decision: DecisionPolicy,
    /// Per-check overrides; unlisted checks use [`RetryPolicy::for_check`].
    pub retry: BTreeMap<CheckKind, RetryPolicy>,
    pub ticket: TicketConfig,
    pub ai: AiConfig,
    /// Checks running at once; 1 runs them sequentially.
    pub max_concurrent: usize,
    /// Whole-run limit; derived from the retry policies when unset.
    pub run_deadline: Option<Duration>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            checks: CheckKind::ALL.to_vec(),
            decision: DecisionPolicy::default(),
            retry: BTreeMap::new(),
            ticket: TicketConfig::default(),
            ai: AiConfig::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            run_deadline: None,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checks.is_empty() {
            return Err(ConfigError::NoChecks);
        }
        for (i, kind) in self.checks.iter().enumerate() {
            if self.checks[..i].contains(kind) {
                return Err(ConfigError::DuplicateCheck(*kind));
            }
        }
        if self.ticket.allowed_statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::NoAllowedStatuses);
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.ai.diff_size_cap == 0 {
            return Err(ConfigError::ZeroDiffCap);
        }
        if self.ai.model.trim().is_empty() {
            return Err(ConfigError::Missing("AI model"));
        }
        Ok(())
    }

    pub fn retry_policy(&self, kind: CheckKind) -> RetryPolicy {
        self.retry
            .get(&kind)
            .copied()
            .unwrap_or_else(|| RetryPolicy::for_check(kind))
    }

    pub fn with_retry(mut self, kind: CheckKind, policy: RetryPolicy) -> Self {
        self.retry.insert(kind, policy);
        self
    }

    /// Runner carrying this configuration's policies.
    pub fn runner(&self) -> CheckRunner {
        CheckKind::ALL
            .into_iter()
            .fold(CheckRunner::new(), |runner, kind| {
                runner.with_policy(kind, self.retry_policy(kind))
            })
    }

    /// Sum of per-check worst cases over `scheduled`, unless set explicitly.
    /// `None` when any scheduled check is unbounded.
    pub fn effective_deadline(&self, scheduled: &[CheckKind]) -> Option<Duration> {
        if self.run_deadline.is_some() {
            return self.run_deadline;
        }
        scheduled
            .iter()
            .map(|kind| self.retry_policy(*kind).budget())
            .sum()
    }
}

/// Parse a comma-separated check list (`secret_scan,ai_review`).
pub fn parse_check_list(list: &str) -> Result<Vec<CheckKind>, ConfigError> {
    split_list(list)
        .map(|name| CheckKind::from_name(&name).ok_or(ConfigError::UnknownCheck(name)))
        .collect()
}

/// Parse a comma-separated status list, dropping blanks.
pub fn parse_status_list(list: &str) -> Vec<String> {
    split_list(list).collect()
}

pub fn parse_severity(value: &str) -> Result<Severity, ConfigError> {
    Severity::parse(value).ok_or_else(|| ConfigError::UnknownSeverity(value.to_string()))
}

fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checks, CheckKind::ALL.to_vec());
        assert_eq!(config.ticket.allowed_statuses.len(), 6);
        assert_eq!(config.ai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_duplicate_and_empty_checks_rejected() {
        let mut config = GateConfig::default();
        config.checks = vec![CheckKind::SecretScan, CheckKind::SecretScan];
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateCheck(CheckKind::SecretScan))
        );
        config.checks.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoChecks));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = GateConfig {
            max_concurrent: 0,
            ..GateConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn test_deadline_is_sum_of_budgets() {
        let config = GateConfig::default();
        let deadline = config.effective_deadline(&[CheckKind::SecretScan, CheckKind::TicketValidation]);
        assert_eq!(deadline, Some(Duration::from_secs(30 + 42)));

        let unbounded = config
            .clone()
            .with_retry(CheckKind::SecretScan, RetryPolicy::immediate());
        assert_eq!(unbounded.effective_deadline(&[CheckKind::SecretScan]), None);

        let explicit = GateConfig {
            run_deadline: Some(Duration::from_secs(5)),
            ..GateConfig::default()
        };
        assert_eq!(
            explicit.effective_deadline(&CheckKind::ALL),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(
            parse_check_list("secret_scan, ai_review").unwrap(),
            vec![CheckKind::SecretScan, CheckKind::AiReview]
        );
        assert_eq!(
            parse_check_list("secret_scan,lint"),
            Err(ConfigError::UnknownCheck("lint".into()))
        );
        assert_eq!(parse_status_list(" Done , ,In Review"), vec!["Done", "In Review"]);
        assert_eq!(parse_severity("medium").unwrap(), Severity::Medium);
        assert!(parse_severity("urgent").is_err());
    }
}
