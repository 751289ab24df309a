//! Boundary with the content sources that feed dictionaries.

use std::sync::{Arc, Mutex, RwLock};

/// Callback invoked whenever a source's content changes. Returns `false`
/// once the listener is no longer interested and can be dropped.
pub type ChangeListener = Box<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// One candidate produced by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    /// Free text (a contact's display name) to split into words.
    Name(String),
    /// A single token stored as-is, e.g. a device account address.
    Word {
        word: String,
        timestamp: Option<u64>,
    },
    /// A typed word and whether it was accepted as a real word.
    Typed { word: String, is_valid: bool },
}

pub trait VocabularySource: Send + Sync {
    fn enumerate(&self) -> Result<Vec<SourceItem>, SourceError>;

    fn register_change_listener(&self, listener: ChangeListener);
}

/// In-memory source. `replace` swaps the content and notifies listeners.
#[derive(Default)]
pub struct MemorySource {
    items: RwLock<Vec<SourceItem>>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl MemorySource {
    pub fn new(items: Vec<SourceItem>) -> Arc<Self> {
        Arc::new(Self {
            items: RwLock::new(items),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn from_names<I, S>(names: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| SourceItem::Name(n.into())).collect())
    }

    pub fn replace(&self, items: Vec<SourceItem>) {
        if let Ok(mut current) = self.items.write() {
            *current = items;
        }
        self.notify();
    }

    pub fn notify(&self) {
        let Ok(mut listeners) = self.listeners.lock() else {
            return;
        };
        listeners.retain(|listener| listener());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map_or(0, |listeners| listeners.len())
    }
}

impl VocabularySource for MemorySource {
    fn enumerate(&self) -> Result<Vec<SourceItem>, SourceError> {
        self.items
            .read()
            .map(|items| items.clone())
            .map_err(|_| SourceError::Unavailable("poisoned".into()))
    }

    fn register_change_listener(&self, listener: ChangeListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }
}

/// Split free text into letter runs. A run continues through letters,
/// apostrophes and hyphens ("O'Brien", "Jean-Luc").
pub fn letter_runs(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let start = rest.find(|c: char| c.is_alphabetic())?;
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| !(c.is_alphabetic() || c == '\'' || c == '-'))
            .unwrap_or(tail.len());
        let (run, next) = tail.split_at(end);
        rest = next;
        Some(run)
    })
}
