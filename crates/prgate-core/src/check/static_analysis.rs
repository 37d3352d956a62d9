//! Non-production code smells in added lines.
//!
//! Three categories are reported: leftover debug statements, unfinished-work
//! markers, and long runs of commented-out code.

use std::sync::OnceLock;

use regex::Regex;

use super::{changed_lines, truncate_chars};
use crate::diff::{AddedLine, FilePatch};
use crate::domain::{context::path_suffix, CheckKind, CheckResult, Finding, PrContext, Severity};

/// Contiguous comment lines at which a block is reported.
pub const COMMENTED_BLOCK_THRESHOLD: usize = 5;

const SKIPPED_SUFFIXES: &[&str] = &[".md", ".txt", ".json", ".yml", ".yaml", ".png", ".jpg"];
const SNIPPET_MAX_CHARS: usize = 100;

struct Pattern {
    re: Regex,
    label: &'static str,
}

fn compile(specs: &[(&str, &'static str)]) -> Vec<Pattern> {
    specs
        .iter()
        .filter_map(|(re, label)| Regex::new(re).ok().map(|re| Pattern { re, label }))
        .collect()
}

fn debug_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            (r"console\.log\s*\(", "JavaScript console.log"),
            (r"console\.debug\s*\(", "JavaScript console.debug"),
            (r"console\.warn\s*\(", "JavaScript console.warn"),
            (r"\bprint\s*\([^)]*\)", "Python print statement"),
            (r"debugger\s*;", "JavaScript debugger statement"),
            (r"pdb\.set_trace\s*\(", "Python pdb.set_trace"),
            (r"import\s+pdb", "Python pdb import"),
            (r"\bdebugger\b", "Debugger keyword"),
            (r"var_dump\s*\(", "PHP var_dump"),
            (r"\bdd\s*\(", "Laravel dd()"),
        ])
    })
}

fn marker_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            (r"TODO\s*:", "TODO comment"),
            (r"FIXME\s*:", "FIXME comment"),
            (r"HACK\s*:", "HACK comment"),
            (r"XXX\s*:", "XXX comment"),
            (r"BUG\s*:", "BUG comment"),
        ])
    })
}

/// Flags debug statements, TODO-style markers and commented-out blocks.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalysisCheck;

impl StaticAnalysisCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, ctx: &PrContext) -> CheckResult {
        let findings = changed_lines(ctx)
            .iter()
            .filter(|patch| !SKIPPED_SUFFIXES.contains(&path_suffix(&patch.path).as_str()))
            .flat_map(scan_patch)
            .collect();
        CheckResult::from_findings(CheckKind::StaticAnalysis, findings)
    }
}

fn scan_patch(patch: &FilePatch) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut block = CommentBlock::default();

    for added in &patch.added {
        if let Some(finding) = debug_statement(&patch.path, added) {
            findings.push(finding);
        }
        if let Some(finding) = unfinished_marker(&patch.path, added) {
            findings.push(finding);
        }
        if let Some(finding) = block.push(&patch.path, added) {
            findings.push(finding);
        }
    }
    findings.extend(block.finish(&patch.path));

    findings
}

fn debug_statement(path: &str, added: &AddedLine) -> Option<Finding> {
    let trimmed = added.text.trim();
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return None;
    }
    if added.text.contains("\"\"\"") || added.text.contains("'''") {
        return None;
    }
    let pattern = debug_patterns().iter().find(|p| p.re.is_match(&added.text))?;
    Some(
        Finding::new(
            Severity::Medium,
            format!("{} found - remove before production", pattern.label),
        )
        .at(path, Some(added.line))
        .with_snippet(truncate_chars(trimmed, SNIPPET_MAX_CHARS))
        .with_suggestion("Remove debug output or route it through the project logger"),
    )
}

fn unfinished_marker(path: &str, added: &AddedLine) -> Option<Finding> {
    let pattern = marker_patterns().iter().find(|p| p.re.is_match(&added.text))?;
    Some(
        Finding::new(
            Severity::Medium,
            format!("{} found - address before merging", pattern.label),
        )
        .at(path, Some(added.line))
        .with_snippet(truncate_chars(&added.text, SNIPPET_MAX_CHARS))
        .with_suggestion("Resolve the item or track it in a ticket"),
    )
}

fn is_comment(line: &str) -> bool {
    let s = line.trim();
    s.starts_with('#')
        || s.starts_with("//")
        || s.starts_with("/*")
        || s.starts_with('*')
        || (s.starts_with("<!--") && s.ends_with("-->"))
}

/// Run of added comment lines with consecutive line numbers.
#[derive(Default)]
struct CommentBlock {
    start: u32,
    last: u32,
    len: usize,
}

impl CommentBlock {
    /// Feed one added line; returns a finding when a qualifying run ends.
    fn push(&mut self, path: &str, added: &AddedLine) -> Option<Finding> {
        if !is_comment(&added.text) {
            return self.finish(path);
        }
        if self.len > 0 && added.line == self.last + 1 {
            self.last = added.line;
            self.len += 1;
            return None;
        }
        let ended = self.finish(path);
        self.start = added.line;
        self.last = added.line;
        self.len = 1;
        ended
    }

    fn finish(&mut self, path: &str) -> Option<Finding> {
        let len = std::mem::take(&mut self.len);
        if len < COMMENTED_BLOCK_THRESHOLD {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                format!("Large block of commented code ({len} lines) - consider removing"),
            )
            .at(path, Some(self.start))
            .with_suggestion("Delete dead code; version control keeps the history"),
        )
    }
}
