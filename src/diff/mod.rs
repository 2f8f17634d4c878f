//! Keystroke-level text diffing.
//!
//! Converts an `(old text, new text, cursor hint)` triple — one textarea
//! mutation — into the minimal changed span, which [`cell_edit`] turns into a
//! structured operation scoped to one cell's source.
//!
//! # Two Paths
//!
//! - **Quick match**: when the lengths differ, the edit is assumed to sit at
//!   the cursor. A fixed window of [`QUICK_MATCH_WINDOW`] chars on each side of
//!   the candidate region is compared in both strings; only if both windows
//!   match is the cursor-local span accepted. O(1) amortized for ordinary
//!   typing.
//! - **Exact scan**: two-pointer scan finding the longest common prefix and
//!   suffix, O(min(|old|, |new|)). Used when lengths are equal or the window
//!   check fails.
//!
//! The quick match is a correctness-preserving shortcut: the window equality
//! checks guarantee it selects a span whose replacement reproduces `new`
//! exactly. When in doubt it falls through to the exact scan.
//!
//! All offsets are char indices, not byte indices.
//!
//! # Examples
//!
//! ```
//! use collab_sync::diff::{diff, TextDiff};
//!
//! // "helo" -> "hello": one char inserted, cursor just after it.
//! let d = diff("helo", "hello", 4, 4).unwrap();
//! assert_eq!(d, TextDiff { start: 3, old_end: 3, new_end: 4 });
//!
//! // No change is a no-op.
//! assert!(diff("same", "same", 2, 2).is_none());
//! ```

use crate::algebra::OtAlgebra;

/// Look-around window, in chars, for the quick-match fast path.
pub const QUICK_MATCH_WINDOW: usize = 250;

/// The minimal changed span between two strings: replace old text's
/// `[start, old_end)` with new text's `[start, new_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDiff {
    /// Char offset where the two strings diverge.
    pub start: usize,
    /// End (exclusive) of the replaced span in the old text.
    pub old_end: usize,
    /// End (exclusive) of the replacement span in the new text.
    pub new_end: usize,
}

/// Diff two versions of a cell's text around a collapsed cursor.
///
/// Returns `None` when the texts are identical. A non-collapsed selection
/// (`selection_start != selection_end`) is reported and the diff proceeds
/// using `selection_start`.
pub fn diff(old: &str, new: &str, selection_start: usize, selection_end: usize) -> Option<TextDiff> {
    diff_with_window(old, new, selection_start, selection_end, QUICK_MATCH_WINDOW)
}

/// [`diff`] with an explicit quick-match window. A window of 0 disables the
/// fast path entirely.
pub fn diff_with_window(
    old: &str,
    new: &str,
    selection_start: usize,
    selection_end: usize,
    window: usize,
) -> Option<TextDiff> {
    if selection_start != selection_end {
        tracing::warn!(
            selection_start,
            selection_end,
            "cursor start and end not equal on text change event"
        );
    }
    let caret = selection_start;
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let result = quick_match(&old_chars, &new_chars, caret, window)
        .unwrap_or_else(|| exact_scan(&old_chars, &new_chars));

    if result.start == result.old_end && result.start == result.new_end {
        None
    } else {
        Some(result)
    }
}

/// Diff a cell edit and build the corresponding operation: replace old text's
/// changed span with new text's, scoped to `cell`'s source field.
pub fn cell_edit<A: OtAlgebra>(
    algebra: &A,
    cell: usize,
    old: &str,
    new: &str,
    selection_start: usize,
    selection_end: usize,
) -> Option<A::Op> {
    let d = diff(old, new, selection_start, selection_end)?;
    let replacement: String = new
        .chars()
        .skip(d.start)
        .take(d.new_end - d.start)
        .collect();
    Some(algebra.splice(cell, d.start, d.old_end, &replacement))
}

/// Slice `chars` by signed bounds, clamped to the valid range.
fn span(chars: &[char], lo: i64, hi: i64) -> &[char] {
    let len = chars.len() as i64;
    let lo = lo.clamp(0, len) as usize;
    let hi = hi.clamp(lo as i64, len) as usize;
    &chars[lo..hi]
}

/// The cursor-local fast path. Returns `None` when lengths are equal or the
/// look-around windows disagree.
fn quick_match(old: &[char], new: &[char], caret: usize, window: usize) -> Option<TextDiff> {
    let caret = caret as i64;
    let w = window as i64;
    let len_diff = (old.len() as i64 - new.len() as i64).abs();

    if old.len() > new.len() {
        // Candidate deletion of len_diff chars ending where the cursor now
        // sits: text before the cursor must match, and the old text after the
        // deleted region must match the new text after the cursor.
        if span(old, caret - w, caret) == span(new, caret - w, caret)
            && span(old, caret + len_diff, caret + len_diff + w) == span(new, caret, caret + w)
        {
            return Some(TextDiff {
                start: caret as usize,
                old_end: (caret + len_diff) as usize,
                new_end: caret as usize,
            });
        }
    } else if old.len() < new.len() {
        // Candidate insertion of len_diff chars ending at the cursor.
        let base = caret - len_diff;
        if span(old, base - w, base) == span(new, base - w, base)
            && span(old, base, base + w) == span(new, caret, caret + w)
        {
            return Some(TextDiff {
                start: base.max(0) as usize,
                old_end: base.max(0) as usize,
                new_end: caret as usize,
            });
        }
    }
    None
}

/// Exact minimal diff: longest common prefix, then longest common suffix that
/// does not cross the prefix.
fn exact_scan(old: &[char], new: &[char]) -> TextDiff {
    let min_len = old.len().min(new.len());
    let mut start = 0;
    while start < min_len && old[start] == new[start] {
        start += 1;
    }

    let mut old_end = old.len();
    let mut new_end = new.len();
    while old_end > start && new_end > start && old[old_end - 1] == new[new_end - 1] {
        old_end -= 1;
        new_end -= 1;
    }

    TextDiff {
        start,
        old_end,
        new_end,
    }
}
