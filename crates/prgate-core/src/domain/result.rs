//! Normalized check outcomes.
//!
//! Every check, whatever collaborator it wraps, ends up as one [`CheckResult`].
//! Fields are private: the constructors are the only way to build a result,
//! so the status/findings/error invariants hold for every value in the system.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four gatekeeping checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Credential and token exposure in changed code.
    SecretScan,

    /// Debug statements, unfinished-work markers, commented-out blocks.
    StaticAnalysis,

    /// Ticket id present, known to the tracker, in an allowed status.
    TicketValidation,

    /// Language-model risk review of the diff.
    AiReview,
}

impl CheckKind {
    /// All kinds in default execution order.
    pub const ALL: [CheckKind; 4] = [
        CheckKind::SecretScan,
        CheckKind::StaticAnalysis,
        CheckKind::TicketValidation,
        CheckKind::AiReview,
    ];

    /// Get the check name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::SecretScan => "secret_scan",
            CheckKind::StaticAnalysis => "static_analysis",
            CheckKind::TicketValidation => "ticket_validation",
            CheckKind::AiReview => "ai_review",
        }
    }

    /// Human-readable title used in rendered comments.
    pub fn title(&self) -> &'static str {
        match self {
            CheckKind::SecretScan => "Secret Scan",
            CheckKind::StaticAnalysis => "Static Analysis",
            CheckKind::TicketValidation => "Ticket Validation",
            CheckKind::AiReview => "AI Review",
        }
    }

    /// Parse a check name (`secret_scan`, `static_analysis`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a check passed, found problems, or could not complete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Error,
}

impl CheckStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Finding severity, ordered `None < Low < Medium < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }

    /// Case-insensitive parse of `NONE`, `LOW`, `MEDIUM`, `HIGH`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Severity::None),
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One problem located in the pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    /// Path of the offending file; `None` for PR-level findings (branch, title).
    pub file: Option<String>,

    /// 1-based line in the new version of the file.
    pub line: Option<u32>,

    pub severity: Severity,

    pub description: String,

    pub suggestion: Option<String>,

    /// Code excerpt. Secret values are masked before they get here.
    pub snippet: Option<String>,
}

impl Finding {
    /// Create a finding. `Severity::None` is raised to `Low`: a finding
    /// always carries some weight.
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            severity: severity.max(Severity::Low),
            description: description.into(),
            suggestion: None,
            snippet: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// `file:line`, `file`, or `(pull request)`.
    pub fn location(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            (Some(file), None) => file.clone(),
            (None, _) => "(pull request)".to_string(),
        }
    }
}

/// Normalized outcome of one check for one run.
///
/// # Invariants
///
/// - `status == Fail` implies `findings` is non-empty.
/// - `status == Error` implies `findings` is empty and `raw_error` is set.
/// - `raw_error` is set only when `status == Error`.
/// - `severity` is the highest finding severity, `None` when there are no findings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckResult {
    check: CheckKind,
    status: CheckStatus,
    severity: Severity,
    findings: Vec<Finding>,
    suggestions: Vec<String>,
    raw_error: Option<String>,
}

impl CheckResult {
    /// A clean pass with nothing to report.
    pub fn pass(check: CheckKind) -> Self {
        Self {
            check,
            status: CheckStatus::Pass,
            severity: Severity::None,
            findings: Vec::new(),
            suggestions: Vec::new(),
            raw_error: None,
        }
    }

    /// PASS when `findings` is empty, FAIL otherwise.
    pub fn from_findings(check: CheckKind, findings: Vec<Finding>) -> Self {
        if findings.is_empty() {
            return Self::pass(check);
        }
        Self {
            check,
            status: CheckStatus::Fail,
            severity: max_severity(&findings),
            findings,
            suggestions: Vec::new(),
            raw_error: None,
        }
    }

    /// A pass that still carries non-blocking findings and suggestions.
    pub fn advisory(check: CheckKind, findings: Vec<Finding>, suggestions: Vec<String>) -> Self {
        Self {
            check,
            status: CheckStatus::Pass,
            severity: max_severity(&findings),
            findings,
            suggestions,
            raw_error: None,
        }
    }

    /// The check could not complete.
    pub fn error(check: CheckKind, raw_error: impl Into<String>) -> Self {
        let raw_error = raw_error.into();
        let raw_error = if raw_error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            raw_error
        };
        Self {
            check,
            status: CheckStatus::Error,
            severity: Severity::None,
            findings: Vec::new(),
            suggestions: Vec::new(),
            raw_error: Some(raw_error),
        }
    }

    /// Attach free-form suggestions. Ignored on ERROR results.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        if self.status != CheckStatus::Error {
            self.suggestions = suggestions;
        }
        self
    }

    pub fn check(&self) -> CheckKind {
        self.check
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn raw_error(&self) -> Option<&str> {
        self.raw_error.as_deref()
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == CheckStatus::Fail
    }

    pub fn is_error(&self) -> bool {
        self.status == CheckStatus::Error
    }
}

fn max_severity(findings: &[Finding]) -> Severity {
    findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::None)
}
