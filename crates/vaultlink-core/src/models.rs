//! Core data types shared by every vault operation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A slash-separated, vault-relative note or folder path.
///
/// Construction normalizes separators (`\` becomes `/`), drops empty and `.`
/// segments and collapses `..` against earlier segments. A path that would
/// climb above the vault root is rejected, so a `NotePath` never escapes it.
/// Equality is case-sensitive on the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotePath(String);

impl NotePath {
    /// Parse and normalize a vault-relative path. Empty paths are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize(raw)?;
        if normalized.is_empty() {
            return Err(Error::invalid_path(format!(
                "path must name a note or folder inside the vault: {raw:?}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Parse a folder path where the empty string denotes the vault root
    pub fn parse_folder(raw: &str) -> Result<Option<Self>> {
        let normalized = normalize(raw)?;
        Ok((!normalized.is_empty()).then_some(Self(normalized)))
    }

    /// Normalized string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, root first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Containing folder, `None` at the vault root
    pub fn parent(&self) -> Option<NotePath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| NotePath(parent.to_string()))
    }

    /// Last segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether `self` lies at or below `folder`
    pub fn starts_with(&self, folder: &NotePath) -> bool {
        self.0 == folder.0
            || (self.0.starts_with(&folder.0) && self.0.as_bytes().get(folder.0.len()) == Some(&b'/'))
    }
}

fn normalize(raw: &str) -> Result<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::path_traversal(raw));
                }
            }
            s if s.contains('\0') => {
                return Err(Error::invalid_path(format!("path contains NUL byte: {raw:?}")));
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NotePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<NotePath> for String {
    fn from(path: NotePath) -> Self {
        path.0
    }
}

impl AsRef<str> for NotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One text replacement of an edit batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOperation {
    /// Text to locate (exactly, or line-wise ignoring surrounding whitespace)
    pub old_text: String,
    /// Replacement text
    pub new_text: String,
}

impl EditOperation {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }

    /// Identical old and new text never changes content and never fails
    pub fn is_noop(&self) -> bool {
        self.old_text == self.new_text
    }
}

/// Outcome of an edit batch: a preview diff or a committed write, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PatchResult {
    /// Dry run: unified diff, nothing persisted
    Preview { diff: String },
    /// Content replaced; hash of the new content
    Committed { hash: String },
}

impl PatchResult {
    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview { .. })
    }
}

/// Line reference inside a search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Zero-based line of the first occurrence
    #[serde(default)]
    pub line: i64,
}

/// A note matching a search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(alias = "filename")]
    pub path: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub matches: Vec<SearchMatch>,
}

/// Per-path result of a multi-note read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteReadResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NoteReadResult {
    pub fn ok(path: &NotePath, content: String) -> Self {
        Self {
            path: path.to_string(),
            content: Some(content),
            error: None,
        }
    }

    pub fn failed(path: &NotePath, error: &Error) -> Self {
        Self {
            path: path.to_string(),
            content: None,
            error: Some(error.to_string()),
        }
    }
}
