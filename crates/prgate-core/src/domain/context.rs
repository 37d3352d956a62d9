//! Pull-request context handed to every check.

use serde::{Deserialize, Serialize};

/// One file touched by the pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,

    /// `added`, `modified`, `removed`, `renamed`, ...
    pub status: String,

    /// Unified-diff hunks for this file (no `diff --git` header).
    pub patch: Option<String>,

    /// Full contents of the new version, when the host could supply them.
    pub contents: Option<String>,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: "modified".to_string(),
            ..Default::default()
        }
    }

    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn is_removed(&self) -> bool {
        self.status == "removed"
    }

    /// Lower-cased extension including the dot (`.rs`), or empty.
    pub fn suffix(&self) -> String {
        path_suffix(&self.path)
    }
}

/// Immutable snapshot of a pull request, shared read-only by all checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrContext {
    /// PR number on the host, absent for local runs.
    pub number: Option<u64>,

    /// Head branch name (a `refs/heads/` prefix is tolerated).
    pub branch: String,

    pub title: String,

    /// Head commit, used for status reporting.
    pub head_sha: Option<String>,

    /// Full unified diff of the pull request.
    pub diff: String,

    pub files: Vec<ChangedFile>,
}

impl PrContext {
    pub fn new(branch: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_number(mut self, number: u64) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = diff.into();
        self
    }

    pub fn with_file(mut self, file: ChangedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Branch name without a `refs/heads/` prefix.
    pub fn branch_name(&self) -> &str {
        self.branch
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.branch)
    }

    pub fn file(&self, path: &str) -> Option<&ChangedFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Lower-cased extension of a path including the dot, or empty.
pub fn path_suffix(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
