//! Markdown comment rendering.
//!
//! Rendering is a pure function of the results and the verdict: the same
//! input always yields byte-identical bodies, so re-running a gate never
//! produces spurious comment edits. Every body starts with a hidden marker
//! carrying the payload key and a digest of the visible text; hosts use it to
//! find the comment to edit and to skip edits that would change nothing.

use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::check::SecretRuleSet;
use crate::domain::{CheckKind, CheckResult, CheckStatus, Finding, Outcome, Severity, Verdict};

/// Findings listed per check section before eliding the rest.
pub const MAX_FINDINGS_PER_SECTION: usize = 10;

/// Blocking reasons listed in the summary before eliding the rest.
pub const MAX_BLOCKING_REASONS: usize = 20;

const KEY_PREFIX: &str = "prgate";
const DIGEST_LEN: usize = 12;

/// One comment to publish on the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPayload {
    /// Stable identity across runs: `prgate:<check>` or `prgate:summary`.
    pub key: String,
    /// Markdown body, marker line included.
    pub body: String,
    digest: String,
}

impl CommentPayload {
    pub fn new(key: impl Into<String>, content: &str) -> Self {
        let key = key.into();
        let digest = content_digest(content);
        let body = format!("{}\n{content}", marker_line(&key, &digest));
        Self { key, body, digest }
    }

    pub fn for_check(check: CheckKind, content: &str) -> Self {
        Self::new(format!("{KEY_PREFIX}:{}", check.name()), content)
    }

    pub fn summary(content: &str) -> Self {
        Self::new(format!("{KEY_PREFIX}:summary"), content)
    }

    /// Short SHA-256 of the visible text.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether an existing comment body was rendered for this payload's key.
    pub fn matches_key(&self, existing_body: &str) -> bool {
        existing_body.starts_with(&format!("<!-- {} digest=", self.key))
    }

    /// Whether an existing comment body already carries this exact content.
    pub fn is_current(&self, existing_body: &str) -> bool {
        parse_marker(existing_body).is_some_and(|(key, digest)| key == self.key && digest == self.digest)
    }
}

fn marker_line(key: &str, digest: &str) -> String {
    format!("<!-- {key} digest={digest} -->")
}

fn content_digest(content: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(content.as_bytes()));
    digest.truncate(DIGEST_LEN);
    digest
}

/// `(key, digest)` from a body's marker line.
pub fn parse_marker(body: &str) -> Option<(&str, &str)> {
    let first = body.lines().next()?;
    let inner = first.strip_prefix("<!-- ")?.strip_suffix(" -->")?;
    let (key, digest) = inner.split_once(" digest=")?;
    Some((key, digest))
}

/// All payloads of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// One section per check result, in result order.
    pub sections: Vec<CommentPayload>,
    pub summary: CommentPayload,
}

impl Report {
    /// Sections first, summary last.
    pub fn payloads(&self) -> impl Iterator<Item = &CommentPayload> {
        self.sections.iter().chain(std::iter::once(&self.summary))
    }

    /// Every body joined into one document, for terminal output.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.summary.body);
        for section in &self.sections {
            out.push_str("\n---\n\n");
            out.push_str(&section.body);
        }
        out
    }
}

/// Renders check results and the verdict into comment payloads.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    secret_rules_version: String,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(SecretRuleSet::BUILTIN_VERSION)
    }
}

impl ReportRenderer {
    pub fn new(secret_rules_version: impl Into<String>) -> Self {
        Self {
            secret_rules_version: secret_rules_version.into(),
        }
    }

    pub fn render(&self, results: &[CheckResult], verdict: &Verdict) -> Report {
        Report {
            sections: results.iter().map(|r| self.render_section(r)).collect(),
            summary: render_summary(results, verdict),
        }
    }

    fn render_section(&self, result: &CheckResult) -> CommentPayload {
        let mut out = String::new();
        let kind = result.check();

        let _ = write!(
            out,
            "## {} {}: {}",
            status_icon(result.status()),
            kind.title(),
            result.status()
        );
        if result.severity() != Severity::None {
            let _ = write!(out, " ({})", result.severity());
        }
        out.push_str("\n\n");

        match result.status() {
            CheckStatus::Error => {
                out.push_str(
                    "This check could not complete, so it reached no verdict on this pull request. \
                     Re-run the gate or review this area manually.\n\n",
                );
                for line in result.raw_error().unwrap_or("unknown error").lines() {
                    let _ = writeln!(out, "> {line}");
                }
            }
            CheckStatus::Pass if result.findings().is_empty() => {
                out.push_str("No problems found.\n");
            }
            CheckStatus::Pass => {
                out.push_str("No blocking problems found.\n\n");
                write_findings(&mut out, "Advisory findings", result.findings());
            }
            CheckStatus::Fail => {
                write_findings(&mut out, "Findings", result.findings());
            }
        }

        if !result.suggestions().is_empty() {
            out.push_str("\n**Suggestions:**\n\n");
            for suggestion in result.suggestions() {
                let _ = writeln!(out, "- {}", one_line(suggestion));
            }
        }

        if kind == CheckKind::SecretScan {
            let _ = write!(out, "\n_Secret rules version {}_\n", self.secret_rules_version);
        }

        CommentPayload::for_check(kind, &out)
    }
}

fn render_summary(results: &[CheckResult], verdict: &Verdict) -> CommentPayload {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "## {} prgate: {}\n",
        outcome_icon(verdict.outcome),
        verdict.outcome
    );
    out.push_str(match verdict.outcome {
        Outcome::Approved => "All blocking checks passed. This pull request may be merged.\n\n",
        Outcome::Blocked => "Blocking problems were found. Fix them before merging.\n\n",
        Outcome::Indeterminate => {
            "A mandatory check could not complete. A maintainer has to decide whether to merge.\n\n"
        }
    });

    out.push_str("| Check | Status | Severity | Findings |\n|---|---|---|---|\n");
    for result in results {
        let _ = writeln!(
            out,
            "| {} | {} {} | {} | {} |",
            result.check().title(),
            status_icon(result.status()),
            result.status(),
            result.severity(),
            result.findings().len()
        );
    }

    let _ = writeln!(
        out,
        "\n**Findings by severity:** HIGH {} · MEDIUM {} · LOW {}",
        verdict.count(Severity::High),
        verdict.count(Severity::Medium),
        verdict.count(Severity::Low)
    );

    if !verdict.blocking_reasons.is_empty() {
        out.push_str("\n### Blocking reasons\n\n");
        for (i, reason) in verdict
            .blocking_reasons
            .iter()
            .take(MAX_BLOCKING_REASONS)
            .enumerate()
        {
            let _ = writeln!(
                out,
                "{}. **{}** `{}` ({}): {}",
                i + 1,
                reason.check.title(),
                reason.finding.location(),
                reason.finding.severity,
                one_line(&reason.finding.description)
            );
        }
        write_elided(&mut out, verdict.blocking_reasons.len(), MAX_BLOCKING_REASONS);
    }

    CommentPayload::summary(&out)
}

fn write_findings(out: &mut String, heading: &str, findings: &[Finding]) {
    let _ = writeln!(out, "**{heading} ({}):**\n", findings.len());
    for (i, finding) in findings.iter().take(MAX_FINDINGS_PER_SECTION).enumerate() {
        let _ = writeln!(
            out,
            "{}. **{}** `{}`: {}",
            i + 1,
            finding.severity,
            finding.location(),
            one_line(&finding.description)
        );
        if let Some(snippet) = &finding.snippet {
            let _ = writeln!(out, "   - Code: `{}`", snippet.replace('`', "'"));
        }
        if let Some(suggestion) = &finding.suggestion {
            let _ = writeln!(out, "   - Suggestion: {}", one_line(suggestion));
        }
    }
    write_elided(out, findings.len(), MAX_FINDINGS_PER_SECTION);
}

fn write_elided(out: &mut String, total: usize, shown: usize) {
    if total > shown {
        let _ = writeln!(out, "\n_… and {} more_", total - shown);
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn status_icon(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "✅",
        CheckStatus::Fail => "❌",
        CheckStatus::Error => "⚠️",
    }
}

fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Approved => "✅",
        Outcome::Blocked => "❌",
        Outcome::Indeterminate => "⚠️",
    }
}
