//! Unified diff parsing.
//!
//! Checks only care about lines the pull request *adds*, located by their
//! line number in the new version of the file. Hunk bodies are consumed by the
//! counts in their `@@` header, so `+++`/`---` text inside a hunk is treated as
//! content, not as a file header.

use std::sync::OnceLock;

use regex::Regex;

/// A line added by the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLine {
    /// 1-based line number in the new file.
    pub line: u32,
    pub text: String,
}

/// Added lines of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub path: String,
    pub added: Vec<AddedLine>,
}

fn hunk_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk regex")
    })
}

struct Hunk {
    next_line: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl Hunk {
    fn parse(line: &str) -> Option<Self> {
        let caps = hunk_header().captures(line)?;
        let num = |i: usize, default: u32| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(default)
        };
        Some(Self {
            old_remaining: num(2, 1),
            next_line: num(3, 1),
            new_remaining: num(4, 1),
        })
    }

    fn done(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }

    /// Consume one body line, returning an added line if it was one.
    fn consume(&mut self, line: &str) -> Option<AddedLine> {
        match line.as_bytes().first() {
            Some(b'+') => {
                let added = AddedLine {
                    line: self.next_line,
                    text: line[1..].to_string(),
                };
                self.next_line = self.next_line.saturating_add(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                Some(added)
            }
            Some(b'-') => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                None
            }
            Some(b'\\') => None,
            // Context line (an empty line is context whose leading space was stripped).
            _ => {
                self.next_line = self.next_line.saturating_add(1);
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                None
            }
        }
    }
}

/// Parse hunks of a single file (GitHub `patch` field, no file headers).
pub fn parse_patch(path: &str, patch: &str) -> FilePatch {
    let mut file = FilePatch {
        path: path.to_string(),
        added: Vec::new(),
    };
    let mut hunk: Option<Hunk> = None;

    for line in patch.lines() {
        if let Some(h) = hunk.as_mut().filter(|h| !h.done()) {
            if let Some(added) = h.consume(line) {
                file.added.push(added);
            }
            continue;
        }
        hunk = Hunk::parse(line);
    }

    file
}

/// Parse a multi-file unified diff (`git diff` / `.diff` media type).
///
/// Deleted files (`+++ /dev/null`) are omitted.
pub fn parse_unified_diff(diff: &str) -> Vec<FilePatch> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current: Option<FilePatch> = None;
    let mut hunk: Option<Hunk> = None;
    let mut deleted = false;

    let mut flush = |current: &mut Option<FilePatch>, deleted: bool| {
        if let Some(file) = current.take() {
            if !deleted && !file.path.is_empty() {
                files.push(file);
            }
        }
    };

    for line in diff.lines() {
        if let Some(h) = hunk.as_mut().filter(|h| !h.done()) {
            if let Some(added) = h.consume(line) {
                if let Some(file) = current.as_mut() {
                    file.added.push(added);
                }
            }
            continue;
        }
        hunk = None;

        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush(&mut current, deleted);
            deleted = false;
            let path = rest
                .rsplit_once(" b/")
                .map(|(_, b)| b.to_string())
                .unwrap_or_default();
            current = Some(FilePatch {
                path,
                added: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let target = rest.split('\t').next().unwrap_or(rest).trim();
            if target == "/dev/null" {
                deleted = true;
                continue;
            }
            let path = target.strip_prefix("b/").unwrap_or(target).to_string();
            match current.as_mut() {
                Some(file) if file.added.is_empty() => file.path = path,
                _ => {
                    flush(&mut current, deleted);
                    deleted = false;
                    current = Some(FilePatch {
                        path,
                        added: Vec::new(),
                    });
                }
            }
        } else if line.starts_with("@@") {
            hunk = Hunk::parse(line);
        }
    }
    flush(&mut current, deleted);

    files
}
