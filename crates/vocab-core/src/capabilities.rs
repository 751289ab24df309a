//! Per-kind hooks that specialize the shared dictionary engine.

use std::collections::BTreeMap;

use crate::session::WriteSession;
use crate::source::{ChangeListener, SourceError};
use crate::store::UnigramEntry;

pub trait Capabilities: Send + Sync {
    /// Populate a fresh (or, see `retains_content_on_reload`, the current)
    /// working state from the backing source. Runs on the loader thread
    /// while the dictionary's mutation lock is held.
    fn load_initial_contents(&self, session: &mut WriteSession<'_>) -> Result<(), SourceError>;

    /// Whether `word` counts as an existing word for this dictionary.
    fn is_valid_word(&self, _word: &str, entry: Option<&UnigramEntry>) -> bool {
        entry.is_some_and(|e| !e.is_not_a_word)
    }

    /// Add kind-specific header attributes.
    fn header_attributes(&self, _attributes: &mut BTreeMap<String, String>) {}

    /// Content accumulated locally (typing history) survives a reload;
    /// content derived from the source is rebuilt from scratch.
    fn retains_content_on_reload(&self) -> bool {
        false
    }

    /// Hook the source's change notifications.
    fn register_change_listener(&self, _listener: ChangeListener) {}

    /// Release source resources. Called once from `Dictionary::close`.
    fn close(&self) {}
}
