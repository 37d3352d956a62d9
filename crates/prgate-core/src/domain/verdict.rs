//! Overall merge decision for one run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{CheckKind, Finding, Severity};

/// Outcome of a gate run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Every blocking check passed.
    Approved,
    /// At least one check confirmed a blocking problem.
    Blocked,
    /// A mandatory check could not complete; a human has to decide.
    Indeterminate,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Approved => "APPROVED",
            Outcome::Blocked => "BLOCKED",
            Outcome::Indeterminate => "INDETERMINATE",
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Approved => 0,
            Outcome::Blocked => 1,
            Outcome::Indeterminate => 2,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finding that contributed to a BLOCKED outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockingReason {
    pub check: CheckKind,
    pub finding: Finding,
}

/// The merge decision derived from one run's check results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,

    /// Blocking findings, in check order then finding order.
    pub blocking_reasons: Vec<BlockingReason>,

    /// Finding count per severity across all checks.
    pub summary_counts: BTreeMap<Severity, usize>,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        self.outcome == Outcome::Approved
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }

    /// Count for one severity (0 when absent).
    pub fn count(&self, severity: Severity) -> usize {
        self.summary_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Total number of findings across all checks.
    pub fn total_findings(&self) -> usize {
        self.summary_counts.values().sum()
    }
}
