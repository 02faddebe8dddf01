//! Targeted text patching for agent-suggested edits.
//!
//! An edit batch is an ordered list of `(oldText, newText)` pairs applied to
//! the cumulative content: each edit sees the result of every edit before it.
//!
//! ## Matching Strategy
//! 1. Exact match: the first occurrence of `oldText` is replaced.
//! 2. Indentation-preserving line match: the first window of lines equal to
//!    `oldText`'s lines after trimming surrounding whitespace is replaced, and
//!    each replacement line takes the indentation of the matched line at the
//!    same position.
//!
//! Ties always go to the earliest position. There is no best-match scoring.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;
use vaultlink_core::{EditOperation, Error, PatchResult, Result};

use crate::diff::render_diff;

/// What an edit batch resolved to, before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchPlan {
    /// Dry run: diff between current and patched content
    Preview { diff: String },
    /// Commit: content to persist and its hash
    Commit { content: String, hash: String },
}

impl PatchPlan {
    /// Result reported to the caller once the plan has been carried out
    pub fn into_result(self) -> PatchResult {
        match self {
            Self::Preview { diff } => PatchResult::Preview { diff },
            Self::Commit { hash, .. } => PatchResult::Committed { hash },
        }
    }
}

/// Edit engine applying exact-then-fuzzy replacements
#[derive(Debug, Clone, Default)]
pub struct EditEngine;

impl EditEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply `edits` in order to `original`.
    ///
    /// Line endings are normalized to `\n` once, up front. If the batch leaves
    /// the normalized content unchanged, `original` is returned byte for byte.
    pub fn apply_edits(&self, original: &str, edits: &[EditOperation]) -> Result<String> {
        let normalized = normalize_line_endings(original);
        let mut current = normalized.clone();

        for (idx, edit) in edits.iter().enumerate() {
            if edit.is_noop() {
                continue;
            }

            let old_text = normalize_line_endings(&edit.old_text);
            let new_text = normalize_line_endings(&edit.new_text);

            match find_and_replace(&current, &old_text, &new_text) {
                Some((patched, match_type)) => {
                    if match_type != MatchType::Exact {
                        log::debug!("Edit {} used {} matching", idx + 1, match_type.description());
                    }
                    current = patched;
                }
                None => return Err(Error::edit_not_found(idx + 1, &edit.old_text)),
            }
        }

        if current == normalized {
            Ok(original.to_string())
        } else {
            Ok(current)
        }
    }

    /// Resolve an edit batch into a preview or a commit.
    ///
    /// `label` names the note in diff headers. When `expected_hash` is given
    /// it must match the hash of `current`, otherwise nothing is patched.
    pub fn plan(
        &self,
        label: &str,
        current: &str,
        edits: &[EditOperation],
        dry_run: bool,
        expected_hash: Option<&str>,
    ) -> Result<PatchPlan> {
        if let Some(expected) = expected_hash {
            let actual = compute_hash(current);
            if actual != expected {
                return Err(Error::conflict(expected, actual));
            }
        }

        let patched = self.apply_edits(current, edits)?;

        if dry_run {
            // A batch with no net effect hands back the raw bytes, CRLF included
            let diff = render_diff(
                &normalize_line_endings(current),
                &normalize_line_endings(&patched),
                label,
            );
            Ok(PatchPlan::Preview { diff })
        } else {
            let hash = compute_hash(&patched);
            Ok(PatchPlan::Commit {
                content: patched,
                hash,
            })
        }
    }
}

/// Type of match found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchType {
    Exact,
    IndentationPreserving,
}

impl MatchType {
    fn description(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IndentationPreserving => "indentation-preserving",
        }
    }
}

fn find_and_replace(content: &str, search: &str, replace: &str) -> Option<(String, MatchType)> {
    if let Some(pos) = content.find(search) {
        return Some((
            replace_at(content, pos, search.len(), replace),
            MatchType::Exact,
        ));
    }

    fuzzy_replace_lines(content, search, replace)
        .map(|patched| (patched, MatchType::IndentationPreserving))
}

/// Replace text at specific position
fn replace_at(content: &str, pos: usize, len: usize, replacement: &str) -> String {
    let mut result = String::with_capacity(content.len() + replacement.len());
    result.push_str(&content[..pos]);
    result.push_str(replacement);
    result.push_str(&content[pos + len..]);
    result
}

fn fuzzy_replace_lines(content: &str, search: &str, replace: &str) -> Option<String> {
    let content_lines: Vec<&str> = content.split('\n').collect();
    let search_lines: Vec<&str> = search.split('\n').collect();

    if search_lines.len() > content_lines.len() {
        return None;
    }

    let start = (0..=content_lines.len() - search_lines.len()).find(|&start| {
        search_lines
            .iter()
            .zip(&content_lines[start..])
            .all(|(wanted, actual)| wanted.trim() == actual.trim())
    })?;
    let end = start + search_lines.len();
    let matched = &content_lines[start..end];

    let replacement: Vec<String> = replace
        .split('\n')
        .enumerate()
        .map(|(i, line)| match matched.get(i) {
            Some(original) => format!("{}{}", leading_whitespace(original), line.trim_start()),
            None => line.to_string(),
        })
        .collect();

    let mut lines: Vec<&str> = Vec::with_capacity(content_lines.len() - matched.len() + replacement.len());
    lines.extend_from_slice(&content_lines[..start]);
    lines.extend(replacement.iter().map(String::as_str));
    lines.extend_from_slice(&content_lines[end..]);
    Some(lines.join("\n"))
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Convert `\r\n` and lone `\r` to `\n`
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Compute SHA-256 hash of content (with Unicode NFC normalization)
pub fn compute_hash(content: &str) -> String {
    let normalized: String = content.nfc().collect();
    let hash = Sha256::digest(normalized.as_bytes());
    format!("{:x}", hash)
}
