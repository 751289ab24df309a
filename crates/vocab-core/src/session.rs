//! The locked mutation surface.
//!
//! A `WriteSession` borrows the dictionary's working state for one logical
//! unit of work (a typed word, a full source load) while the caller holds
//! the dictionary's mutation lock. Every mutation is recorded in the overlay
//! with its final, already-blended value.

use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::config::DictionaryConfig;
use crate::gc::{self, GcStats};
use crate::ngram_context::{NgramContext, WordInfo};
use crate::policy::{effective_frequency, FrequencyPolicy};
use crate::settings::MAX_FREQUENCY;
use crate::snapshot::Snapshot;
use crate::store::{DictionaryStore, Header, NgramEntry, Overlay, UnigramEntry};

/// Persisted store plus the mutations recorded since the last GC pass.
#[derive(Debug, Clone, Default)]
pub struct Working {
    store: Arc<DictionaryStore>,
    overlay: Overlay,
}

impl Working {
    pub fn new(store: DictionaryStore) -> Self {
        Self {
            store: Arc::new(store),
            overlay: Overlay::new(),
        }
    }

    pub fn empty(header: Header) -> Self {
        Self::new(DictionaryStore::new(header))
    }

    pub fn header(&self) -> &Header {
        self.store.header()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(Arc::clone(&self.store), Arc::new(self.overlay.clone()))
    }

    fn unigram(&self, word: &str) -> Option<UnigramEntry> {
        self.overlay
            .unigram(word)
            .or_else(|| self.store.lookup_unigram(word))
            .copied()
    }

    fn ngram(&self, context: &[WordInfo], word: &str) -> Option<NgramEntry> {
        self.overlay
            .ngram(context, word)
            .or_else(|| self.store.lookup_ngram(context, word))
            .copied()
    }
}

pub struct WriteSession<'a> {
    working: &'a mut Working,
    config: &'a DictionaryConfig,
    policy: &'a dyn FrequencyPolicy,
    clock: &'a dyn Clock,
    mutations: usize,
    gc_passes: usize,
}

impl<'a> WriteSession<'a> {
    pub fn new(
        working: &'a mut Working,
        config: &'a DictionaryConfig,
        policy: &'a dyn FrequencyPolicy,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            working,
            config,
            policy,
            clock,
            mutations: 0,
            gc_passes: 0,
        }
    }

    pub fn config(&self) -> &DictionaryConfig {
        self.config
    }

    pub fn header(&self) -> &Header {
        self.working.header()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Number of mutations recorded through this session.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Whether anything changed, including GC evictions.
    pub fn is_modified(&self) -> bool {
        self.mutations > 0 || self.gc_passes > 0
    }

    /// Words of one codepoint are ambiguous (capitalization of "i") and words
    /// over the limit are noise; neither is stored.
    pub fn is_acceptable_word(&self, word: &str) -> bool {
        let len = word.chars().count();
        len > 1 && len <= self.config.max_word_length
    }

    /// Insert a word, or blend `frequency` into the existing entry.
    pub fn add_unigram(
        &mut self,
        word: &str,
        frequency: u8,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
        timestamp: Option<u64>,
    ) {
        if !self.is_acceptable_word(word) {
            debug!(word, "rejected unigram");
            return;
        }
        self.run_gc_if_required(false);
        self.put_unigram(
            word,
            frequency,
            is_not_a_word,
            is_possibly_offensive,
            timestamp,
        );
    }

    /// Insert or blend the n-gram `(context, word)`. No-op for an invalid
    /// context. The key is the longest valid suffix of `context`, at most
    /// `max_prev_word_count` words.
    pub fn add_ngram_entry(
        &mut self,
        context: &NgramContext,
        word: &str,
        frequency: u8,
        timestamp: Option<u64>,
    ) {
        if !context.is_valid() || !self.is_acceptable_word(word) {
            debug!(%context, word, "rejected n-gram");
            return;
        }
        let Some(key) = context
            .suffixes()
            .take(self.config.max_prev_word_count)
            .last()
        else {
            return;
        };
        self.run_gc_if_required(false);
        self.put_ngram(key, word, frequency, timestamp);
    }

    /// Record one typed occurrence (times `count`) of `word` after `context`:
    /// the unigram, then an n-gram for every valid suffix of the context.
    /// An invalid word is recorded as context only.
    pub fn update_entries_for_word(
        &mut self,
        context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) {
        if !self.is_acceptable_word(word) || count == 0 {
            debug!(word, "rejected update");
            return;
        }
        self.run_gc_if_required(false);
        let observed = (self.config.history_increment as u32)
            .saturating_mul(count)
            .min(MAX_FREQUENCY as u32) as u8;
        self.put_unigram(word, observed, !is_valid, false, Some(timestamp));
        for suffix in context.suffixes().take(self.config.max_prev_word_count) {
            self.put_ngram(suffix, word, observed, Some(timestamp));
        }
    }

    /// Run GC when the overlay has reached its threshold, or whenever there
    /// are pending entries and the caller accepts the latency.
    pub fn run_gc_if_required(&mut self, mind_blocking: bool) -> Option<GcStats> {
        let pending = self.working.overlay.pending();
        let required = pending >= self.config.overlay_threshold || (mind_blocking && pending > 0);
        required.then(|| self.run_gc())
    }

    pub fn run_gc(&mut self) -> GcStats {
        let now = self.clock.now();
        let store = Arc::make_mut(&mut self.working.store);
        let stats = gc::run_gc(
            store,
            &self.working.overlay,
            self.policy,
            &self.config.gc,
            now,
        );
        self.working.overlay.clear();
        self.gc_passes += 1;
        stats
    }

    fn decayed(&self, frequency: u8, last_touched: Option<u64>) -> u8 {
        effective_frequency(
            self.policy,
            self.working.header().uses_forgetting_curve(),
            frequency,
            last_touched,
            self.clock.now(),
        )
    }

    fn put_unigram(
        &mut self,
        word: &str,
        frequency: u8,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
        timestamp: Option<u64>,
    ) {
        let entry = match self.working.unigram(word) {
            None => UnigramEntry {
                frequency,
                is_not_a_word,
                is_possibly_offensive,
                last_touched: timestamp,
            },
            Some(old) => UnigramEntry {
                frequency: self
                    .policy
                    .blend(self.decayed(old.frequency, old.last_touched), frequency),
                // A word stays a word once it has been recorded as one.
                is_not_a_word: old.is_not_a_word && is_not_a_word,
                is_possibly_offensive: old.is_possibly_offensive || is_possibly_offensive,
                last_touched: latest(old.last_touched, timestamp),
            },
        };
        self.working.overlay.put_unigram(word, entry);
        self.mutations += 1;
    }

    fn put_ngram(
        &mut self,
        context: &[WordInfo],
        word: &str,
        frequency: u8,
        timestamp: Option<u64>,
    ) {
        // The predicted word must exist as a unigram; touch it so this pass
        // keeps it alive alongside the n-gram.
        match self.working.unigram(word) {
            Some(entry) => {
                if self.working.overlay.unigram(word).is_none() {
                    self.working.overlay.put_unigram(word, entry);
                }
            }
            None => self.put_unigram(word, frequency, true, false, timestamp),
        }

        let entry = match self.working.ngram(context, word) {
            None => NgramEntry {
                frequency,
                last_touched: timestamp,
            },
            Some(old) => NgramEntry {
                frequency: self
                    .policy
                    .blend(self.decayed(old.frequency, old.last_touched), frequency),
                last_touched: latest(old.last_touched, timestamp),
            },
        };
        self.working.overlay.put_ngram(context, word, entry);
        self.mutations += 1;
    }
}

fn latest(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
