use std::collections::HashMap;

use crate::ngram_context::WordInfo;

use super::{NgramEntry, UnigramEntry};

/// Pending mutations not yet merged into a `DictionaryStore`.
///
/// Entries hold final values: blending against the previous state happens
/// when the mutation is recorded, so merging is a plain overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub(super) unigrams: HashMap<String, UnigramEntry>,
    /// context → (word → entry)
    pub(super) ngrams: HashMap<Vec<WordInfo>, HashMap<String, NgramEntry>>,
    ngram_count: usize,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending entries.
    pub fn pending(&self) -> usize {
        self.unigrams.len() + self.ngram_count
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    pub fn unigram(&self, word: &str) -> Option<&UnigramEntry> {
        self.unigrams.get(word)
    }

    pub fn ngram(&self, context: &[WordInfo], word: &str) -> Option<&NgramEntry> {
        self.ngrams.get(context).and_then(|inner| inner.get(word))
    }

    pub fn put_unigram(&mut self, word: &str, entry: UnigramEntry) {
        self.unigrams.insert(word.to_string(), entry);
    }

    pub fn put_ngram(&mut self, context: &[WordInfo], word: &str, entry: NgramEntry) {
        let inner = self.ngrams.entry(context.to_vec()).or_default();
        if inner.insert(word.to_string(), entry).is_none() {
            self.ngram_count += 1;
        }
    }

    pub fn clear(&mut self) {
        self.unigrams.clear();
        self.ngrams.clear();
        self.ngram_count = 0;
    }
}
