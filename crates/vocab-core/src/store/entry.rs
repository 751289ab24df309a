use serde::{Deserialize, Serialize};

use crate::ngram_context::WordInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnigramEntry {
    pub frequency: u8,
    /// Kept only as n-gram context; never offered as a suggestion.
    pub is_not_a_word: bool,
    pub is_possibly_offensive: bool,
    /// Seconds since the epoch; `None` for entries that never decay.
    pub last_touched: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramEntry {
    pub frequency: u8,
    pub last_touched: Option<u64>,
}

/// One item produced by `DictionaryStore::iter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEntry<'a> {
    Unigram {
        word: &'a str,
        #[serde(flatten)]
        entry: UnigramEntry,
    },
    Ngram {
        context: &'a [WordInfo],
        word: &'a str,
        #[serde(flatten)]
        entry: NgramEntry,
    },
}

impl StoreEntry<'_> {
    pub fn word(&self) -> &str {
        match self {
            StoreEntry::Unigram { word, .. } | StoreEntry::Ngram { word, .. } => word,
        }
    }

    pub fn frequency(&self) -> u8 {
        match self {
            StoreEntry::Unigram { entry, .. } => entry.frequency,
            StoreEntry::Ngram { entry, .. } => entry.frequency,
        }
    }
}
