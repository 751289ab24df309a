//! Personal vocabulary dictionaries for predictive text.
//!
//! The engine lives in `vocab_core`; this crate wires the per-user set of
//! dictionaries together and owns logging setup.

mod personal;
mod trace_init;

pub use personal::PersonalDictionaries;
pub use trace_init::init_tracing;

pub use vocab_core::dictionary::{
    Dictionary, DictionaryOptions, LoadOutcome, ReloadHandle, ReloadState,
};
pub use vocab_core::ngram_context::{NgramContext, WordInfo};
pub use vocab_core::registry::DictionaryKind;
pub use vocab_core::settings::{init_custom, settings, SettingsError};
pub use vocab_core::source::{MemorySource, SourceError, SourceItem, VocabularySource};

pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
