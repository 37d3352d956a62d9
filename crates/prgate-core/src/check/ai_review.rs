//! Language-model risk review of the pull request diff.
//!
//! The model is asked for a strict JSON verdict. Anything that does not parse
//! into that shape is a malformed response, never a PASS or FAIL.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use super::truncate_chars;
use crate::collaborators::ReviewModel;
use crate::domain::{CheckError, CheckKind, CheckOutcome, CheckResult, Finding, PrContext, Severity};

/// Default cap on diff bytes sent to the model.
pub const DEFAULT_DIFF_SIZE_CAP: usize = 100_000;

const EXCERPT_MAX_CHARS: usize = 200;
const SNIPPET_MAX_CHARS: usize = 100;

const REVIEW_PROMPT: &str = r#"You are a strict production-readiness reviewer for pull requests.

Review the diff below and report anything that must not reach production:
- secrets, credentials, tokens or keys
- security vulnerabilities (injection, XSS, broken auth, unsafe input handling)
- debug statements, test data or temporary hacks in production code
- unfinished work (TODO/FIXME/HACK), dead or commented-out code
- risky logic: races, leaks, missing error handling, missing null checks
- missing tests for critical behavior

Rules:
1. Any HIGH severity issue means decision "FAIL".
2. HIGH covers secrets, credentials, security vulnerabilities, critical bugs and debug code.
3. MEDIUM and LOW issues keep decision "PASS" but must still be listed.

Respond with JSON only, in exactly this shape:
{
  "decision": "PASS" | "FAIL",
  "severity": "HIGH" | "MEDIUM" | "LOW" | "NONE",
  "issues": [
    {
      "severity": "HIGH" | "MEDIUM" | "LOW",
      "file": "path/to/file",
      "line": 123,
      "description": "what is wrong and why it matters",
      "code_snippet": "relevant excerpt",
      "suggestion": "how to fix it"
    }
  ],
  "suggestions": ["actionable suggestion"],
  "summary": "one or two sentence summary"
}

Diff:
"#;

/// Reviews the diff with a [`ReviewModel`] and maps its JSON verdict.
#[derive(Clone)]
pub struct AiReviewCheck {
    model: Arc<dyn ReviewModel>,
    diff_size_cap: usize,
}

impl fmt::Debug for AiReviewCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiReviewCheck")
            .field("model", &self.model.model_id())
            .field("diff_size_cap", &self.diff_size_cap)
            .finish()
    }
}

impl AiReviewCheck {
    pub fn new(model: Arc<dyn ReviewModel>, diff_size_cap: usize) -> Self {
        Self {
            model,
            diff_size_cap,
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub async fn execute(&self, ctx: &PrContext) -> CheckOutcome<CheckResult> {
        let diff = review_diff(ctx);
        if diff.trim().is_empty() {
            return Ok(CheckResult::pass(CheckKind::AiReview));
        }
        let prompt = build_prompt(&diff, self.diff_size_cap);
        let reply = self.model.complete(&prompt).await?;
        parse_review(&reply)
    }
}

/// The unified diff, or the per-file patches when no unified diff was fetched.
fn review_diff(ctx: &PrContext) -> String {
    if !ctx.diff.trim().is_empty() {
        return ctx.diff.clone();
    }
    ctx.files
        .iter()
        .filter_map(|f| {
            f.patch
                .as_ref()
                .map(|p| format!("--- a/{path}\n+++ b/{path}\n{p}\n", path = f.path))
        })
        .collect()
}

/// Prompt text with the diff cut to `cap` bytes.
pub fn build_prompt(diff: &str, cap: usize) -> String {
    let mut prompt = String::with_capacity(REVIEW_PROMPT.len() + diff.len().min(cap) + 64);
    prompt.push_str(REVIEW_PROMPT);
    prompt.push_str(&truncate_diff(diff, cap));
    prompt
}

/// Cut `diff` to at most `cap` bytes on a char boundary, with an explicit
/// marker when anything was dropped.
pub fn truncate_diff(diff: &str, cap: usize) -> String {
    if diff.len() <= cap {
        return diff.to_string();
    }
    let mut end = cap;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n[... diff truncated: showing {} of {} bytes ...]",
        &diff[..end],
        end,
        diff.len()
    )
}

#[derive(Debug, Deserialize)]
struct RawReview {
    decision: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    line: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code_snippet: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default)]
    impact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Pass,
    Fail,
}

fn malformed(reason: impl Into<String>, reply: &str) -> CheckError {
    CheckError::MalformedResponse {
        reason: reason.into(),
        excerpt: truncate_chars(reply, EXCERPT_MAX_CHARS),
    }
}

/// The outermost `{...}` of a reply, tolerating fences and surrounding prose.
fn json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Map a model reply to a check result.
pub fn parse_review(reply: &str) -> CheckOutcome<CheckResult> {
    let json = json_object(reply).ok_or_else(|| malformed("no JSON object in reply", reply))?;
    let raw: RawReview =
        serde_json::from_str(json).map_err(|e| malformed(format!("invalid JSON: {e}"), reply))?;

    let decision = match raw.decision.trim().to_ascii_uppercase().as_str() {
        "PASS" => Decision::Pass,
        "FAIL" => Decision::Fail,
        other => return Err(malformed(format!("unknown decision {other:?}"), reply)),
    };
    let severity = match raw.severity.as_deref() {
        None => Severity::None,
        Some(s) => Severity::parse(s)
            .ok_or_else(|| malformed(format!("unknown severity {s:?}"), reply))?,
    };

    let mut findings = Vec::with_capacity(raw.issues.len());
    for issue in raw.issues {
        let issue_severity = match issue.severity.as_deref() {
            None => severity,
            Some(s) => Severity::parse(s)
                .ok_or_else(|| malformed(format!("unknown issue severity {s:?}"), reply))?,
        };
        findings.push(issue.into_finding(issue_severity));
    }

    let suggestions: Vec<String> = raw
        .suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let blocking =
        decision == Decision::Fail || findings.iter().any(|f| f.severity == Severity::High);
    if !blocking {
        return Ok(CheckResult::advisory(CheckKind::AiReview, findings, suggestions));
    }

    if findings.is_empty() {
        let summary = raw
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "AI reviewer rejected the change without listing issues".to_string());
        let severity = if severity == Severity::None {
            Severity::High
        } else {
            severity
        };
        findings.push(Finding::new(severity, summary));
    }
    Ok(CheckResult::from_findings(CheckKind::AiReview, findings).with_suggestions(suggestions))
}

impl RawIssue {
    fn into_finding(self, severity: Severity) -> Finding {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "Issue reported by AI reviewer".to_string());
        let mut finding = Finding::new(severity, description);

        if let Some(file) = self.file.filter(|f| !f.trim().is_empty()) {
            finding = finding.at(file, self.line.as_ref().and_then(line_number));
        }
        if let Some(snippet) = self.code_snippet.filter(|s| !s.trim().is_empty()) {
            finding = finding.with_snippet(truncate_chars(&snippet, SNIPPET_MAX_CHARS));
        }
        match (self.suggestion, self.impact) {
            (Some(s), _) if !s.trim().is_empty() => finding = finding.with_suggestion(s),
            (_, Some(i)) if !i.trim().is_empty() => {
                finding = finding.with_suggestion(format!("Impact: {i}"))
            }
            _ => {}
        }
        finding
    }
}

/// Models send line numbers as numbers or strings.
fn line_number(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| *n > 0)
}
