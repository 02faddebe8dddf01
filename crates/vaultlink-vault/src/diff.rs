//! Unified diff rendering for dry-run previews.

use similar::TextDiff;

/// Unchanged lines shown around each change
pub const CONTEXT_LINES: usize = 3;

/// Render a unified diff between `original` and `patched`.
///
/// Both headers use `label`, tagged `original` and `modified`. Identical
/// inputs yield the headers alone.
pub fn render_diff(original: &str, patched: &str, label: &str) -> String {
    let old_header = format!("{}\toriginal", label);
    let new_header = format!("{}\tmodified", label);

    if original == patched {
        return format!("--- {}\n+++ {}\n", old_header, new_header);
    }

    TextDiff::from_lines(original, patched)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&old_header, &new_header)
        .to_string()
}
