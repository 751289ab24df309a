use std::collections::{BTreeMap, HashMap};

use crate::ngram_context::WordInfo;

use super::{Header, NgramEntry, Overlay, StoreEntry, UnigramEntry};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryStore {
    pub(super) header: Header,
    pub(super) unigrams: HashMap<String, UnigramEntry>,
    /// context → (word → entry)
    pub(super) ngrams: HashMap<Vec<WordInfo>, HashMap<String, NgramEntry>>,
}

impl DictionaryStore {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            unigrams: HashMap::new(),
            ngrams: HashMap::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_attributes(&self) -> &BTreeMap<String, String> {
        &self.header.attributes
    }

    pub fn locale(&self) -> &str {
        &self.header.locale
    }

    pub fn lookup_unigram(&self, word: &str) -> Option<&UnigramEntry> {
        self.unigrams.get(word)
    }

    pub fn lookup_ngram(&self, context: &[WordInfo], word: &str) -> Option<&NgramEntry> {
        self.ngrams.get(context).and_then(|inner| inner.get(word))
    }

    /// Words recorded after `context`, with their entries.
    pub fn successors(&self, context: &[WordInfo]) -> impl Iterator<Item = (&str, &NgramEntry)> {
        self.ngrams
            .get(context)
            .into_iter()
            .flat_map(|inner| inner.iter().map(|(w, e)| (w.as_str(), e)))
    }

    pub fn unigram_count(&self) -> usize {
        self.unigrams.len()
    }

    pub fn ngram_count(&self) -> usize {
        self.ngrams.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.unigrams.is_empty() && self.ngrams.is_empty()
    }

    /// Iterate over all unigrams, then all n-grams. Order within each group
    /// is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = StoreEntry<'_>> {
        let unigrams = self.unigrams.iter().map(|(word, entry)| StoreEntry::Unigram {
            word,
            entry: *entry,
        });
        let ngrams = self.ngrams.iter().flat_map(|(context, inner)| {
            inner.iter().map(move |(word, entry)| StoreEntry::Ngram {
                context,
                word,
                entry: *entry,
            })
        });
        unigrams.chain(ngrams)
    }

    /// Return a new store with `overlay` merged in.
    pub fn apply_mutations(&self, overlay: &Overlay) -> Self {
        let mut next = self.clone();
        next.merge(overlay);
        next
    }

    /// Merge `overlay` into this store in place.
    pub fn merge(&mut self, overlay: &Overlay) {
        for (word, entry) in &overlay.unigrams {
            self.unigrams.insert(word.clone(), *entry);
        }
        for (context, inner) in &overlay.ngrams {
            let target = self.ngrams.entry(context.clone()).or_default();
            for (word, entry) in inner {
                target.insert(word.clone(), *entry);
            }
        }
    }

    /// Remove a unigram together with every n-gram that predicts it.
    pub(crate) fn remove_unigram(&mut self, word: &str) -> bool {
        if self.unigrams.remove(word).is_none() {
            return false;
        }
        self.ngrams.retain(|_, inner| {
            inner.remove(word);
            !inner.is_empty()
        });
        true
    }

    pub(crate) fn remove_ngram(&mut self, context: &[WordInfo], word: &str) -> bool {
        let Some(inner) = self.ngrams.get_mut(context) else {
            return false;
        };
        let removed = inner.remove(word).is_some();
        if inner.is_empty() {
            self.ngrams.remove(context);
        }
        removed
    }

    pub(crate) fn insert_unigram(&mut self, word: &str, entry: UnigramEntry) {
        self.unigrams.insert(word.to_string(), entry);
    }

    pub(crate) fn insert_ngram(&mut self, context: &[WordInfo], word: &str, entry: NgramEntry) {
        self.ngrams
            .entry(context.to_vec())
            .or_default()
            .insert(word.to_string(), entry);
    }
}
