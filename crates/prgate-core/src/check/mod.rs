//! Check definitions.
//!
//! A [`Check`] is a closed union of the four gatekeeping checks. Each variant
//! holds only immutable configuration and shared handles to its collaborator,
//! so the same `Check` can run against any number of contexts concurrently.

pub mod ai_review;
pub mod secret_rules;
pub mod secret_scan;
pub mod static_analysis;
pub mod ticket;

use std::collections::HashSet;

use crate::diff::{parse_patch, parse_unified_diff, FilePatch};
use crate::domain::{CheckKind, CheckOutcome, CheckResult, PrContext};

pub use ai_review::AiReviewCheck;
pub use secret_rules::{SecretRule, SecretRuleSet};
pub use secret_scan::SecretScanCheck;
pub use static_analysis::StaticAnalysisCheck;
pub use ticket::TicketValidationCheck;

/// One gatekeeping check.
#[derive(Debug, Clone)]
pub enum Check {
    SecretScan(SecretScanCheck),
    StaticAnalysis(StaticAnalysisCheck),
    TicketValidation(TicketValidationCheck),
    AiReview(AiReviewCheck),
}

impl Check {
    pub fn kind(&self) -> CheckKind {
        match self {
            Check::SecretScan(_) => CheckKind::SecretScan,
            Check::StaticAnalysis(_) => CheckKind::StaticAnalysis,
            Check::TicketValidation(_) => CheckKind::TicketValidation,
            Check::AiReview(_) => CheckKind::AiReview,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Run the check against a context.
    ///
    /// `Err` means the check could not reach a verdict; problems it *found*
    /// are always `Ok` with a FAIL result.
    pub async fn execute(&self, ctx: &PrContext) -> CheckOutcome<CheckResult> {
        match self {
            Check::SecretScan(check) => Ok(check.execute(ctx)),
            Check::StaticAnalysis(check) => Ok(check.execute(ctx)),
            Check::TicketValidation(check) => check.execute(ctx).await,
            Check::AiReview(check) => check.execute(ctx).await,
        }
    }
}

/// Added lines for every file of the pull request.
///
/// Files with a per-file patch use it; files that appear only in the unified
/// diff are taken from there. Each path appears once.
pub(crate) fn changed_lines(ctx: &PrContext) -> Vec<FilePatch> {
    let mut seen = HashSet::new();
    let mut patches = Vec::new();

    for file in &ctx.files {
        if file.is_removed() {
            seen.insert(file.path.clone());
            continue;
        }
        if let Some(patch) = &file.patch {
            seen.insert(file.path.clone());
            patches.push(parse_patch(&file.path, patch));
        }
    }

    for patch in parse_unified_diff(&ctx.diff) {
        if seen.insert(patch.path.clone()) {
            patches.push(patch);
        }
    }

    patches
}

/// Trim and cut a line to at most `max` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangedFile;

    #[test]
    fn test_check_kinds() {
        let check = Check::SecretScan(SecretScanCheck::default());
        assert_eq!(check.kind(), CheckKind::SecretScan);
        assert_eq!(check.name(), "secret_scan");

        let check = Check::StaticAnalysis(StaticAnalysisCheck::default());
        assert_eq!(check.kind(), CheckKind::StaticAnalysis);
    }

    #[test]
    fn test_changed_lines_prefers_file_patch_over_diff() {
        let ctx = PrContext::new("b", "t")
            .with_file(ChangedFile::new("a.py").with_patch("@@ -0,0 +1 @@\n+x = 1"))
            .with_diff(
                "diff --git a/a.py b/a.py\n--- a/a.py\n+++ b/a.py\n@@ -0,0 +1 @@\n+x = 1\n\
                 diff --git a/b.py b/b.py\n--- a/b.py\n+++ b/b.py\n@@ -0,0 +1 @@\n+y = 2\n",
            );

        let patches = changed_lines(&ctx);
        let paths: Vec<&str> = patches.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_changed_lines_skips_removed_files() {
        let mut removed = ChangedFile::new("gone.py").with_patch("@@ -1 +0,0 @@\n-x");
        removed.status = "removed".to_string();
        let ctx = PrContext::new("b", "t").with_file(removed);
        assert!(changed_lines(&ctx).is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("  short  ", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }
}
