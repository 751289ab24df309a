//! Persistent unigram/n-gram store.
//!
//! `DictionaryStore` keeps word and n-gram entries in hash tables keyed by
//! word and by context. `Overlay` collects pending mutations that
//! `DictionaryStore::apply_mutations` merges into a new store. The binary
//! layout (VCDX) lives in `store_io`.

mod dictionary_store;
mod entry;
mod header;
mod overlay;
mod store_io;

pub use dictionary_store::DictionaryStore;
pub use entry::{NgramEntry, StoreEntry, UnigramEntry};
pub use header::{
    Header, ATTRIBUTE_VALUE_TRUE, DICTIONARY_ID_KEY, DICTIONARY_LOCALE_KEY,
    DICTIONARY_VERSION_KEY, HAS_HISTORICAL_INFO_KEY, USES_FORGETTING_CURVE_KEY,
};
pub use overlay::Overlay;

use std::io;

/// Errors raised while reading or writing a store file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected VCDX)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch (expected {expected:#010x}, found {actual:#010x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("section exceeds u32::MAX: {0}")]
    TooLarge(&'static str),
}

impl StoreError {
    /// The backing file does not exist. Every other error means the file is
    /// unreadable or corrupt.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
