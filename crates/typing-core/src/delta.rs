//! Minimal single-edit text deltas.
//!
//! The reconciler never replaces whole regions wholesale: it reduces an
//! old/new text pair to the smallest single edit that transforms one into
//! the other, found by stripping the longest common prefix and suffix. This
//! keeps model churn (and the undo step) proportional to what actually
//! changed, and gives a natural way to map caret offsets across the change.

/// A single text edit expressed in `char` offsets into the old text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Start `char` offset of the edit in the old text.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TextEdit {
    /// Length of the deleted text in `char`s.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of the inserted text in `char`s.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end offset of the edit in the old text.
    pub fn end(&self) -> usize {
        self.start + self.deleted_len()
    }

    /// Returns this edit shifted `base` characters to the right, for
    /// embedding a node-local edit into its containing region.
    pub fn at_base(mut self, base: usize) -> Self {
        self.start += base;
        self
    }

    /// Maps a `char` offset in the old text through this edit.
    ///
    /// Offsets in the unchanged prefix are kept, offsets in the unchanged
    /// suffix shift by the length delta, and offsets inside the replaced
    /// span clamp to the end of the inserted text.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset <= self.start {
            offset
        } else if offset >= self.end() {
            offset - self.deleted_len() + self.inserted_len()
        } else {
            self.start + self.inserted_len()
        }
    }
}

/// Computes the minimal single edit turning `old` into `new`, or `None`
/// when the strings are equal.
///
/// The common prefix is maximized first, then the common suffix of the
/// remainder; by construction no `char` is ever split. Among the
/// equally-sized candidate edits this picks the leftmost insertion point,
/// which keeps repeated-character edits ("aa" -> "aaa") stable.
pub fn diff(old: &str, new: &str) -> Option<TextEdit> {
    if old == new {
        return None;
    }

    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut prefix = 0;
    while prefix < old_chars.len()
        && prefix < new_chars.len()
        && old_chars[prefix] == new_chars[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < old_chars.len() - prefix
        && suffix < new_chars.len() - prefix
        && old_chars[old_chars.len() - 1 - suffix] == new_chars[new_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    Some(TextEdit {
        start: prefix,
        deleted_text: old_chars[prefix..old_chars.len() - suffix].iter().collect(),
        inserted_text: new_chars[prefix..new_chars.len() - suffix].iter().collect(),
    })
}
