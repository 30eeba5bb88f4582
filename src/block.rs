use std::collections::HashMap;

use crate::tag::Tag;

/// Minimum size hint for a freshly allocated saved block, used when the
/// caller-supplied hint (`epos - spos + 16`) would otherwise be smaller.
pub const INIT_LOG_BLOCK_SIZE: usize = 64;

/// An owned, append-only columnar record of retained events.
///
/// The tag and data columns are always the same length and are always
/// appended to together — see the crate's design notes on why the emitter
/// walks them with one shared cursor rather than two independently-stepped
/// iterators.
#[derive(Debug, Default, Clone)]
pub struct SavedBlock {
    tags: Vec<Tag>,
    data: Vec<f64>,
    strings: HashMap<i32, String>,
}

impl SavedBlock {
    #[must_use]
    pub fn with_capacity(hint: usize) -> Self {
        let hint = hint.max(INIT_LOG_BLOCK_SIZE);
        Self {
            tags: Vec::with_capacity(hint),
            data: Vec::with_capacity(hint),
            strings: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn push(&mut self, tag: Tag, data: f64) {
        self.tags.push(tag);
        self.data.push(data);
    }

    /// Push a string-bearing slot, copying `text` into the block's string
    /// map only if this key hasn't been seen yet (the host's transient
    /// string table may repeat the same index across slots within a
    /// batch).
    pub fn push_string(&mut self, tag: Tag, key: i32, text: &str) {
        self.strings.entry(key).or_insert_with(|| text.to_string());
        self.tags.push(tag);
        self.data.push(key as f64);
    }

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn string_at(&self, key: i32) -> Option<&str> {
        self.strings.get(&key).map(String::as_str)
    }

    /// Number of `End`-tagged slots, i.e. the number of retained events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.tags.iter().filter(|t| **t == Tag::End).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_columns_parallel() {
        let mut block = SavedBlock::with_capacity(4);
        block.push(Tag::Number, 1.0);
        block.push(Tag::End, 0.0);
        assert_eq!(block.tags().len(), block.data().len());
        assert_eq!(block.event_count(), 1);
    }

    #[test]
    fn push_string_dedupes_by_key() {
        let mut block = SavedBlock::with_capacity(4);
        block.push_string(Tag::StringIdx, 7, "world");
        block.push_string(Tag::StringIdx, 7, "ignored-second-copy");
        assert_eq!(block.string_at(7), Some("world"));
    }

    #[test]
    fn with_capacity_respects_minimum() {
        let block = SavedBlock::with_capacity(4);
        assert!(block.tags.capacity() >= INIT_LOG_BLOCK_SIZE);
    }
}
