//! Merge-and-evict pass that bounds the size of a store.
//!
//! The overlay being merged is the set of entries touched since the last
//! pass; none of them is evicted. Untouched entries are scored by their
//! effective (decayed) frequency.

use tracing::{debug, debug_span};

use crate::ngram_context::WordInfo;
use crate::policy::{effective_frequency, FrequencyPolicy};
use crate::settings::Settings;
use crate::store::{DictionaryStore, Overlay, StoreEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcBudget {
    /// Effective frequency at or below which an entry counts as faded.
    /// Faded entries are evicted first and lookups back off past them.
    pub eviction_threshold: u8,
    pub max_unigrams: usize,
    pub max_ngrams: usize,
}

impl GcBudget {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            eviction_threshold: s.gc.eviction_threshold,
            max_unigrams: s.gc.max_unigrams,
            max_ngrams: s.gc.max_ngrams,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub merged: usize,
    pub forgotten: usize,
    pub evicted_unigrams: usize,
    pub evicted_ngrams: usize,
}

/// Merge `overlay` into `store`, then drop fully forgotten entries and evict
/// the lowest-scoring untouched entries until both tables fit the budget.
///
/// Deterministic: ties on score are broken by key order.
pub fn run_gc(
    store: &mut DictionaryStore,
    overlay: &Overlay,
    policy: &dyn FrequencyPolicy,
    budget: &GcBudget,
    now: u64,
) -> GcStats {
    let _span = debug_span!("run_gc", pending = overlay.pending()).entered();
    let mut stats = GcStats {
        merged: overlay.pending(),
        ..GcStats::default()
    };
    store.merge(overlay);

    let curve = store.header().uses_forgetting_curve();
    let score = |freq: u8, last: Option<u64>| effective_frequency(policy, curve, freq, last, now);

    // Unigrams
    if curve || store.unigram_count() > budget.max_unigrams {
        evict_unigrams(store, overlay, budget, curve, &score, &mut stats);
    }
    // N-grams. Checked after unigram eviction, which cascades.
    if curve || store.ngram_count() > budget.max_ngrams {
        evict_ngrams(store, overlay, budget, curve, &score, &mut stats);
    }

    debug!(
        merged = stats.merged,
        forgotten = stats.forgotten,
        evicted_unigrams = stats.evicted_unigrams,
        evicted_ngrams = stats.evicted_ngrams,
        unigrams = store.unigram_count(),
        ngrams = store.ngram_count(),
    );
    stats
}

fn evict_unigrams(
    store: &mut DictionaryStore,
    overlay: &Overlay,
    budget: &GcBudget,
    curve: bool,
    score: &dyn Fn(u8, Option<u64>) -> u8,
    stats: &mut GcStats,
) {
    let mut unigrams: Vec<(u8, String)> = store
        .iter()
        .filter_map(|e| match e {
            StoreEntry::Unigram { word, entry } if overlay.unigram(word).is_none() => {
                Some((score(entry.frequency, entry.last_touched), word.to_string()))
            }
            _ => None,
        })
        .collect();
    if curve {
        unigrams.retain(|(s, word)| {
            if *s == 0 {
                store.remove_unigram(word);
                stats.forgotten += 1;
                false
            } else {
                true
            }
        });
    }
    let excess = store.unigram_count().saturating_sub(budget.max_unigrams);
    for (_, word) in lowest(unigrams, excess) {
        store.remove_unigram(&word);
        stats.evicted_unigrams += 1;
    }
}

fn evict_ngrams(
    store: &mut DictionaryStore,
    overlay: &Overlay,
    budget: &GcBudget,
    curve: bool,
    score: &dyn Fn(u8, Option<u64>) -> u8,
    stats: &mut GcStats,
) {
    let mut ngrams: Vec<(u8, (Vec<WordInfo>, String))> = store
        .iter()
        .filter_map(|e| match e {
            StoreEntry::Ngram {
                context,
                word,
                entry,
            } if overlay.ngram(context, word).is_none() => Some((
                score(entry.frequency, entry.last_touched),
                (context.to_vec(), word.to_string()),
            )),
            _ => None,
        })
        .collect();
    if curve {
        ngrams.retain(|(s, (context, word))| {
            if *s == 0 {
                store.remove_ngram(context, word);
                stats.forgotten += 1;
                false
            } else {
                true
            }
        });
    }
    let excess = store.ngram_count().saturating_sub(budget.max_ngrams);
    for (_, (context, word)) in lowest(ngrams, excess) {
        store.remove_ngram(&context, &word);
        stats.evicted_ngrams += 1;
    }
}

/// The `n` lowest-scoring candidates.
fn lowest<K: Ord>(mut all: Vec<(u8, K)>, n: usize) -> Vec<(u8, K)> {
    if n == 0 {
        return Vec::new();
    }
    if n < all.len() {
        // Partial sort: the lowest `n` entries end up in all[..n].
        all.select_nth_unstable(n - 1);
        all.truncate(n);
    }
    all
}
