use crate::gc::GcBudget;
use crate::settings::{settings, Settings};

/// Per-dictionary tunables. Defaults come from the global settings; tests
/// and tools may shrink budgets on a single instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryConfig {
    pub max_word_length: usize,
    pub max_prev_word_count: usize,
    /// Pending overlay entries that trigger a GC pass.
    pub overlay_threshold: usize,
    pub gc: GcBudget,
    /// Frequency of one observation of a typed word.
    pub history_increment: u8,
    /// Incremental updates between background flushes.
    pub updates_per_flush: usize,
}

impl DictionaryConfig {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            max_word_length: s.engine.max_word_length,
            max_prev_word_count: s.engine.max_prev_word_count,
            overlay_threshold: s.gc.overlay_threshold,
            gc: GcBudget::from_settings(s),
            history_increment: s.frequency.history_increment,
            updates_per_flush: s.flush.updates_per_flush,
        }
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self::from_settings(settings())
    }
}
