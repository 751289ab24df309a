//! A personal dictionary: one store, one source, one backing file.
//!
//! All mutation goes through a single mutex-guarded `Working` state. After
//! every completed mutation an immutable `Snapshot` is published; lookups
//! read that snapshot and never wait on writers, loads or flushes.

mod flush;
mod reload;
#[cfg(test)]
mod tests;

pub use reload::{LoadOutcome, ReloadHandle, ReloadState};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::clock::{Clock, SystemClock};
use crate::config::DictionaryConfig;
use crate::ngram_context::NgramContext;
use crate::policy::{effective_frequency, ForgettingCurve, FrequencyPolicy};
use crate::session::{Working, WriteSession};
use crate::settings::settings;
use crate::snapshot::Snapshot;
use crate::store::{
    DictionaryStore, Header, DICTIONARY_ID_KEY, DICTIONARY_LOCALE_KEY, DICTIONARY_VERSION_KEY,
};

use flush::{FlushWorker, Published};
use reload::ReloadSlot;

/// Extension of dictionary files.
pub const DICT_FILE_EXTENSION: &str = ".dict";

/// `<dir>/<name>.dict`
pub fn dict_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{DICT_FILE_EXTENSION}"))
}

pub struct DictionaryOptions {
    name: String,
    locale: String,
    path: Option<PathBuf>,
    config: DictionaryConfig,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn FrequencyPolicy>,
}

impl DictionaryOptions {
    /// In-memory dictionary with default settings and the system clock.
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
            path: None,
            config: DictionaryConfig::default(),
            clock: Arc::new(SystemClock),
            policy: Arc::new(ForgettingCurve::from_settings(settings())),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_config(mut self, config: DictionaryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn FrequencyPolicy>) -> Self {
        self.policy = policy;
        self
    }
}

pub(crate) struct Inner {
    name: String,
    locale: String,
    path: Option<PathBuf>,
    config: DictionaryConfig,
    capabilities: Arc<dyn Capabilities>,
    policy: Arc<dyn FrequencyPolicy>,
    clock: Arc<dyn Clock>,
    working: Mutex<Working>,
    published: Arc<Published>,
    reload: Mutex<ReloadSlot>,
    /// Bumped by every source change notification.
    generation: AtomicU64,
    closed: AtomicBool,
    updates_since_flush: AtomicUsize,
    flusher: Mutex<Option<FlushWorker>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn lock_working(&self) -> MutexGuard<'_, Working> {
        lock(&self.working)
    }

    fn lock_reload(&self) -> MutexGuard<'_, ReloadSlot> {
        lock(&self.reload)
    }

    fn new_header(&self) -> Header {
        let mut attributes = BTreeMap::new();
        attributes.insert(DICTIONARY_ID_KEY.to_string(), self.name.clone());
        attributes.insert(DICTIONARY_LOCALE_KEY.to_string(), self.locale.clone());
        attributes.insert(
            DICTIONARY_VERSION_KEY.to_string(),
            self.clock.now().to_string(),
        );
        self.capabilities.header_attributes(&mut attributes);
        Header::new(self.locale.clone(), attributes)
    }

    /// A persisted store is reused only if it was written for the same
    /// locale and with the same decay semantics.
    fn is_compatible(&self, loaded: &Header) -> bool {
        let expected = self.new_header();
        loaded.locale == expected.locale
            && loaded.uses_forgetting_curve() == expected.uses_forgetting_curve()
            && loaded.has_historical_info() == expected.has_historical_info()
    }

    fn request_flush(&self) {
        if let Some(worker) = lock(&self.flusher).as_ref() {
            worker.request();
        }
    }

    /// `false` once closed, so the source can drop the listener.
    fn set_needs_to_recreate(&self) -> bool {
        let open = !self.closed.load(Ordering::SeqCst);
        if open {
            reload::needs_to_recreate(self);
        }
        open
    }
}

pub struct Dictionary {
    inner: Arc<Inner>,
}

impl Dictionary {
    /// Open a dictionary, loading its backing file if there is one. A
    /// missing, corrupt or incompatible file leaves the dictionary `Empty`;
    /// the next flush overwrites it.
    pub fn open(options: DictionaryOptions, capabilities: Arc<dyn Capabilities>) -> Self {
        let DictionaryOptions {
            name,
            locale,
            path,
            config,
            clock,
            policy,
        } = options;

        let mut inner = Inner {
            name,
            locale,
            path,
            config,
            capabilities,
            policy,
            clock,
            working: Mutex::new(Working::default()),
            published: Arc::new(Published::default()),
            reload: Mutex::new(ReloadSlot::new(ReloadState::Empty)),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            updates_since_flush: AtomicUsize::new(0),
            flusher: Mutex::new(None),
        };

        let (working, state) = match inner.path.as_deref().map(DictionaryStore::open) {
            Some(Ok(store)) if inner.is_compatible(store.header()) => {
                info!(
                    dictionary = %inner.name,
                    unigrams = store.unigram_count(),
                    ngrams = store.ngram_count(),
                    "loaded"
                );
                (Working::new(store), ReloadState::Ready)
            }
            Some(Ok(store)) => {
                warn!(
                    dictionary = %inner.name,
                    found = %store.locale(),
                    "incompatible header, starting empty"
                );
                (Working::empty(inner.new_header()), ReloadState::Empty)
            }
            Some(Err(e)) if e.is_not_found() => {
                debug!(dictionary = %inner.name, "no backing file yet");
                (Working::empty(inner.new_header()), ReloadState::Empty)
            }
            Some(Err(e)) => {
                warn!(dictionary = %inner.name, "unreadable backing file, starting empty: {e}");
                (Working::empty(inner.new_header()), ReloadState::Empty)
            }
            None => (Working::empty(inner.new_header()), ReloadState::Empty),
        };

        inner.published = Arc::new(Published::new(working.snapshot()));
        inner.working = Mutex::new(working);
        inner.reload = Mutex::new(ReloadSlot::new(state));

        if let Some(path) = &inner.path {
            match FlushWorker::spawn(&inner.name, path.clone(), Arc::clone(&inner.published)) {
                Ok(worker) => inner.flusher = Mutex::new(Some(worker)),
                Err(e) => warn!(dictionary = %inner.name, "flush worker unavailable: {e}"),
            }
        }

        let inner = Arc::new(inner);
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner
            .capabilities
            .register_change_listener(Box::new(move || {
                weak.upgrade()
                    .is_some_and(|inner| inner.set_needs_to_recreate())
            }));
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn locale(&self) -> &str {
        &self.inner.locale
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn config(&self) -> &DictionaryConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ReloadState {
        self.inner.lock_reload().state
    }

    /// The most recently published view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.published.current()
    }

    pub fn header_attributes(&self) -> BTreeMap<String, String> {
        self.snapshot().header().attributes.clone()
    }

    /// Copy of the current content with pending mutations applied.
    pub fn entries(&self) -> DictionaryStore {
        self.snapshot().merged()
    }

    /// Effective frequency of `word`. Context-only placeholders and fully
    /// decayed entries are not reported.
    pub fn lookup_unigram(&self, word: &str) -> Option<u8> {
        let snapshot = self.snapshot();
        let entry = snapshot.unigram(word).filter(|e| !e.is_not_a_word)?;
        let frequency = self.effective(&snapshot, entry.frequency, entry.last_touched);
        (frequency > 0).then_some(frequency)
    }

    /// Effective frequency of `word` after the longest matching suffix of
    /// `context`. A faded match backs off to shorter suffixes and is only
    /// reported when none of them scores higher.
    pub fn lookup_ngram(&self, context: &NgramContext, word: &str) -> Option<u8> {
        let snapshot = self.snapshot();
        let faded = self.inner.config.gc.eviction_threshold;
        let suffixes: Vec<_> = context
            .suffixes()
            .take(self.inner.config.max_prev_word_count)
            .collect();
        let mut fallback = None;
        for suffix in suffixes.iter().rev() {
            let Some(entry) = snapshot.ngram(suffix, word) else {
                continue;
            };
            let frequency = self.effective(&snapshot, entry.frequency, entry.last_touched);
            if frequency > faded {
                return Some(frequency);
            }
            fallback = fallback.max(Some(frequency));
        }
        fallback.filter(|&frequency| frequency > 0)
    }

    fn effective(&self, snapshot: &Snapshot, frequency: u8, last_touched: Option<u64>) -> u8 {
        effective_frequency(
            &*self.inner.policy,
            snapshot.header().uses_forgetting_curve(),
            frequency,
            last_touched,
            self.inner.clock.now(),
        )
    }

    pub fn is_valid_word(&self, word: &str) -> bool {
        let snapshot = self.snapshot();
        self.inner
            .capabilities
            .is_valid_word(word, snapshot.unigram(word))
    }

    /// Record `count` typed occurrences of `word` after `context`.
    pub fn update_entries_for_word(
        &self,
        context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) {
        self.write(|session| {
            session.update_entries_for_word(context, word, is_valid, count, timestamp)
        });
    }

    /// Entry point for typed words: one occurrence, stamped with the
    /// dictionary clock.
    pub fn add_to_dictionary(&self, context: &NgramContext, word: &str, is_valid: bool) {
        if word.chars().count() > self.inner.config.max_word_length {
            debug!(word, "word too long for history");
            return;
        }
        let timestamp = self.inner.clock.now();
        self.update_entries_for_word(context, word, is_valid, 1, timestamp);
    }

    /// Run `f` under the mutation lock, then publish. Returns `None` once
    /// the dictionary is closed.
    pub fn write<R>(&self, f: impl FnOnce(&mut WriteSession<'_>) -> R) -> Option<R> {
        let inner = &*self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            debug!(dictionary = %inner.name, "write after close ignored");
            return None;
        }
        let (result, modified) = {
            let mut working = inner.lock_working();
            let mut session =
                WriteSession::new(&mut working, &inner.config, &*inner.policy, &*inner.clock);
            let result = f(&mut session);
            let modified = session.is_modified();
            if modified {
                inner.published.publish(working.snapshot(), true);
            }
            (result, modified)
        };
        if modified {
            let pending = inner.updates_since_flush.fetch_add(1, Ordering::SeqCst) + 1;
            if pending >= inner.config.updates_per_flush {
                inner.updates_since_flush.store(0, Ordering::SeqCst);
                inner.request_flush();
            }
        }
        Some(result)
    }

    /// Load from the source if the dictionary is `Empty` or `Stale`.
    pub fn reload_dictionary_if_required(&self) -> ReloadHandle {
        reload::reload_if_required(&self.inner)
    }

    /// Flag the content as outdated. Equivalent to a source change signal.
    pub fn set_needs_to_recreate(&self) {
        self.inner.set_needs_to_recreate();
    }

    /// Schedule a background flush.
    pub fn async_flush(&self) {
        self.inner.request_flush();
    }

    /// Persist now and wait. `true` if the file is up to date (or there is
    /// no file).
    pub fn flush(&self) -> bool {
        match lock(&self.inner.flusher).as_ref() {
            Some(worker) => worker.flush_and_wait(),
            None => true,
        }
    }

    /// Stop loading, write the final state and release the source.
    /// Idempotent.
    pub fn close(&self) {
        let inner = &*self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let loader = inner.lock_reload().close();
        if let Some(loader) = loader {
            if loader.join().is_err() {
                warn!(dictionary = %inner.name, "loader panicked");
            }
        }
        let worker = lock(&inner.flusher).take();
        if let Some(worker) = worker {
            if !worker.shutdown() {
                warn!(dictionary = %inner.name, "final flush failed");
            }
        }
        inner.capabilities.close();
        info!(dictionary = %inner.name, "closed");
    }
}

impl Drop for Dictionary {
    fn drop(&mut self) {
        self.close();
    }
}
