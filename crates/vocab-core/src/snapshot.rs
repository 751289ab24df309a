use std::sync::Arc;

use crate::ngram_context::WordInfo;
use crate::store::{DictionaryStore, Header, NgramEntry, Overlay, UnigramEntry};

/// Immutable view published after every completed mutation. Readers never
/// take the mutation lock.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    store: Arc<DictionaryStore>,
    overlay: Arc<Overlay>,
}

impl Snapshot {
    pub fn new(store: Arc<DictionaryStore>, overlay: Arc<Overlay>) -> Self {
        Self { store, overlay }
    }

    pub fn header(&self) -> &Header {
        self.store.header()
    }

    pub fn unigram(&self, word: &str) -> Option<&UnigramEntry> {
        self.overlay
            .unigram(word)
            .or_else(|| self.store.lookup_unigram(word))
    }

    pub fn ngram(&self, context: &[WordInfo], word: &str) -> Option<&NgramEntry> {
        self.overlay
            .ngram(context, word)
            .or_else(|| self.store.lookup_ngram(context, word))
    }

    /// Store with pending mutations applied, as a flush writes it.
    pub fn merged(&self) -> DictionaryStore {
        if self.overlay.is_empty() {
            return (*self.store).clone();
        }
        self.store.apply_mutations(&self.overlay)
    }
}
