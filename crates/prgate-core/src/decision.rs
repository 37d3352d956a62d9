//! Merge decision policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BlockingReason, CheckKind, CheckResult, CheckStatus, Outcome, Severity, Verdict};

/// Which checks must complete, and which FAILs block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// An ERROR on any of these turns an otherwise mergeable run INDETERMINATE.
    pub mandatory: Vec<CheckKind>,

    /// FAIL results at or above this severity block. HIGH always blocks.
    pub min_blocking_severity: Severity,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            mandatory: vec![
                CheckKind::SecretScan,
                CheckKind::TicketValidation,
                CheckKind::AiReview,
            ],
            min_blocking_severity: Severity::Low,
        }
    }
}

impl DecisionPolicy {
    pub fn is_mandatory(&self, check: CheckKind) -> bool {
        self.mandatory.contains(&check)
    }

    /// Whether a FAIL result of this severity blocks the merge.
    pub fn blocks(&self, severity: Severity) -> bool {
        severity == Severity::High || severity >= self.min_blocking_severity.max(Severity::Low)
    }
}

/// Reduces check results to one [`Verdict`].
///
/// Evaluation order:
/// 1. any FAIL at HIGH severity => BLOCKED
/// 2. any mandatory check in ERROR => INDETERMINATE
/// 3. any FAIL at or above the minimum blocking severity => BLOCKED
/// 4. otherwise APPROVED
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    policy: DecisionPolicy,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn evaluate(&self, results: &[CheckResult]) -> Verdict {
        let failed = |r: &&CheckResult| r.status() == CheckStatus::Fail;

        let outcome = if results
            .iter()
            .filter(failed)
            .any(|r| r.severity() == Severity::High)
        {
            Outcome::Blocked
        } else if results
            .iter()
            .any(|r| r.is_error() && self.policy.is_mandatory(r.check()))
        {
            Outcome::Indeterminate
        } else if results
            .iter()
            .filter(failed)
            .any(|r| self.policy.blocks(r.severity()))
        {
            Outcome::Blocked
        } else {
            Outcome::Approved
        };

        let blocking_reasons = results
            .iter()
            .filter(failed)
            .filter(|r| self.policy.blocks(r.severity()))
            .flat_map(|r| {
                r.findings().iter().map(|finding| BlockingReason {
                    check: r.check(),
                    finding: finding.clone(),
                })
            })
            .collect();

        let mut summary_counts: BTreeMap<Severity, usize> =
            [Severity::Low, Severity::Medium, Severity::High]
                .into_iter()
                .map(|s| (s, 0))
                .collect();
        for finding in results.iter().flat_map(|r| r.findings()) {
            *summary_counts.entry(finding.severity).or_insert(0) += 1;
        }

        Verdict {
            outcome,
            blocking_reasons,
            summary_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Finding;

    fn fail(kind: CheckKind, severity: Severity) -> CheckResult {
        CheckResult::from_findings(kind, vec![Finding::new(severity, "problem")])
    }

    #[test]
    fn test_empty_results_approved() {
        let verdict = DecisionEngine::default().evaluate(&[]);
        assert_eq!(verdict.outcome, Outcome::Approved);
        assert_eq!(verdict.total_findings(), 0);
        assert_eq!(verdict.summary_counts.len(), 3);
    }

    #[test]
    fn test_high_fail_beats_mandatory_error() {
        let results = vec![
            CheckResult::error(CheckKind::TicketValidation, "timeout"),
            fail(CheckKind::SecretScan, Severity::High),
        ];
        let verdict = DecisionEngine::default().evaluate(&results);
        assert_eq!(verdict.outcome, Outcome::Blocked);
        assert_eq!(verdict.blocking_reasons.len(), 1);
    }

    #[test]
    fn test_mandatory_error_beats_low_fail() {
        let results = vec![
            fail(CheckKind::StaticAnalysis, Severity::Low),
            CheckResult::error(CheckKind::AiReview, "timed out after 120s"),
        ];
        let verdict = DecisionEngine::default().evaluate(&results);
        assert_eq!(verdict.outcome, Outcome::Indeterminate);
    }

    #[test]
    fn test_optional_error_is_ignored() {
        let results = vec![
            CheckResult::pass(CheckKind::SecretScan),
            CheckResult::error(CheckKind::StaticAnalysis, "boom"),
        ];
        assert!(DecisionEngine::default().evaluate(&results).is_approved());
    }

    #[test]
    fn test_min_blocking_severity_lets_low_fail_through() {
        let engine = DecisionEngine::new(DecisionPolicy {
            min_blocking_severity: Severity::Medium,
            ..DecisionPolicy::default()
        });
        let results = vec![fail(CheckKind::StaticAnalysis, Severity::Low)];
        let verdict = engine.evaluate(&results);
        assert_eq!(verdict.outcome, Outcome::Approved);
        assert!(verdict.blocking_reasons.is_empty());
        assert_eq!(verdict.count(Severity::Low), 1);
    }

    #[test]
    fn test_high_blocks_at_high_threshold() {
        let engine = DecisionEngine::new(DecisionPolicy {
            min_blocking_severity: Severity::High,
            ..DecisionPolicy::default()
        });
        let verdict = engine.evaluate(&[fail(CheckKind::TicketValidation, Severity::High)]);
        assert_eq!(verdict.outcome, Outcome::Blocked);
    }

    #[test]
    fn test_advisory_findings_counted_but_not_blocking() {
        let advisory = CheckResult::advisory(
            CheckKind::AiReview,
            vec![Finding::new(Severity::Medium, "naming")],
            vec![],
        );
        let verdict = DecisionEngine::default().evaluate(&[advisory]);
        assert!(verdict.is_approved());
        assert_eq!(verdict.count(Severity::Medium), 1);
        assert!(verdict.blocking_reasons.is_empty());
    }
}
