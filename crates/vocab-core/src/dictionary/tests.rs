use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::clock::ManualClock;
use crate::contacts::ContactsCapabilities;
use crate::source::{ChangeListener, MemorySource, SourceError, SourceItem, VocabularySource};
use crate::store::{StoreEntry, HAS_HISTORICAL_INFO_KEY, USES_FORGETTING_CURVE_KEY};
use crate::user_history::UserHistoryCapabilities;

use super::*;

const NOW: u64 = 1_700_000_000;

fn options(name: &str) -> DictionaryOptions {
    DictionaryOptions::new(name, "en_US").with_clock(Arc::new(ManualClock::new(NOW)))
}

fn account(word: &str) -> SourceItem {
    SourceItem::Word {
        word: word.to_string(),
        timestamp: None,
    }
}

fn contacts(source: Arc<dyn VocabularySource>) -> Arc<dyn Capabilities> {
    Arc::new(ContactsCapabilities::new(source, "en_US"))
}

/// Source whose first enumeration blocks until released, so a test can
/// change the content while a load is in flight.
struct GatedSource {
    inner: Arc<MemorySource>,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl GatedSource {
    fn new(inner: Arc<MemorySource>) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = Arc::new(Self {
            inner,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (source, entered_rx, release_tx)
    }
}

impl VocabularySource for GatedSource {
    fn enumerate(&self) -> Result<Vec<SourceItem>, SourceError> {
        let items = self.inner.enumerate();
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(()).unwrap();
            if let Some(release) = self.release.lock().unwrap().take() {
                release.recv().unwrap();
            }
        }
        items
    }

    fn register_change_listener(&self, listener: ChangeListener) {
        self.inner.register_change_listener(listener);
    }
}

struct BrokenSource;

impl VocabularySource for BrokenSource {
    fn enumerate(&self) -> Result<Vec<SourceItem>, SourceError> {
        Err(SourceError::Unavailable("provider gone".into()))
    }

    fn register_change_listener(&self, _listener: ChangeListener) {}
}

// --- reload state machine ---

#[test]
fn test_in_memory_dictionary_starts_empty() {
    let dict = Dictionary::open(options("c"), contacts(MemorySource::from_names(["Alice"])));
    assert_eq!(dict.state(), ReloadState::Empty);
    assert_eq!(dict.lookup_unigram("Alice"), None);

    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    assert_eq!(dict.state(), ReloadState::Ready);
    assert_eq!(dict.lookup_unigram("Alice"), Some(40));
    assert!(dict.is_valid_word("Alice"));
}

#[test]
fn test_ready_reload_is_not_required() {
    let dict = Dictionary::open(options("c"), contacts(MemorySource::from_names(["Alice"])));
    dict.reload_dictionary_if_required().wait();
    let handle = dict.reload_dictionary_if_required();
    assert!(handle.is_finished());
    assert_eq!(handle.wait(), LoadOutcome::NotRequired);
}

#[test]
fn test_change_marks_stale_and_reload_replaces_content() {
    let source = MemorySource::new(vec![account("alice@x.com")]);
    let dict = Dictionary::open(options("c"), contacts(source.clone()));
    dict.reload_dictionary_if_required().wait();

    source.replace(vec![account("bob@y.com")]);
    assert_eq!(dict.state(), ReloadState::Stale);
    // Stale content is still served until the rebuild.
    assert!(dict.lookup_unigram("alice@x.com").is_some());

    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    assert_eq!(dict.lookup_unigram("alice@x.com"), None);
    assert!(dict.lookup_unigram("bob@y.com").is_some());
    assert_eq!(dict.state(), ReloadState::Ready);
}

#[test]
fn test_changed_names_replace_split_words() {
    let source = MemorySource::from_names(["alice@x.com"]);
    let dict = Dictionary::open(options("c"), contacts(source.clone()));
    dict.reload_dictionary_if_required().wait();
    assert!(dict.lookup_unigram("alice").is_some());

    source.replace(vec![SourceItem::Name("bob@y.com".into())]);
    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    assert_eq!(dict.lookup_unigram("alice"), None);
    assert!(dict.lookup_unigram("bob").is_some());
}

#[test]
fn test_closed_dictionary_stops_listening() {
    let source = MemorySource::from_names(["Alice"]);
    for _ in 0..3 {
        let dict = Dictionary::open(options("c"), contacts(source.clone()));
        dict.close();
    }
    let live = Dictionary::open(options("c"), contacts(source.clone()));
    assert_eq!(source.listener_count(), 4);
    source.replace(vec![SourceItem::Name("Bob".into())]);
    assert_eq!(source.listener_count(), 1);
    assert_eq!(live.state(), ReloadState::Empty);
}

#[test]
fn test_change_during_load_supersedes_it() {
    let memory = MemorySource::new(vec![account("alice@x.com")]);
    let (source, entered, release) = GatedSource::new(memory.clone());
    let dict = Dictionary::open(options("c"), contacts(source));

    let handle = dict.reload_dictionary_if_required();
    entered.recv().unwrap();
    assert_eq!(dict.state(), ReloadState::Loading);

    memory.replace(vec![account("bob@y.com")]);
    // Still loading: a change never turns a running load into Stale.
    assert_eq!(dict.state(), ReloadState::Loading);
    release.send(()).unwrap();

    assert_eq!(handle.wait(), LoadOutcome::Loaded);
    assert_eq!(dict.state(), ReloadState::Ready);
    assert_eq!(dict.lookup_unigram("alice@x.com"), None);
    assert!(dict.lookup_unigram("bob@y.com").is_some());
}

#[test]
fn test_reload_while_loading_returns_running_handle() {
    let memory = MemorySource::new(vec![account("carol@z.com")]);
    let (source, entered, release) = GatedSource::new(memory);
    let dict = Dictionary::open(options("c"), contacts(source));

    let first = dict.reload_dictionary_if_required();
    entered.recv().unwrap();
    let second = dict.reload_dictionary_if_required();
    assert!(!second.is_finished());
    assert_eq!(second.wait_timeout(Duration::from_millis(20)), None);

    release.send(()).unwrap();
    assert_eq!(second.wait(), LoadOutcome::Loaded);
    assert_eq!(first.peek(), Some(LoadOutcome::Loaded));
}

#[test]
fn test_failed_load_reverts_state() {
    let dict = Dictionary::open(options("c"), contacts(Arc::new(BrokenSource)));
    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Failed);
    assert_eq!(dict.state(), ReloadState::Empty);
    // Still usable.
    dict.update_entries_for_word(&NgramContext::empty(3), "hello", true, 1, NOW);
    assert!(dict.lookup_unigram("hello").is_some());
}

#[test]
fn test_history_reload_keeps_content() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    dict.set_needs_to_recreate();
    assert_eq!(dict.state(), ReloadState::Stale);
    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    assert!(dict.lookup_unigram("hello").is_some());
}

// --- caller surface ---

#[test]
fn test_lookup_ngram_backs_off_to_shorter_context() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    let ctx = NgramContext::from_words(["I", "love"], 3);
    dict.update_entries_for_word(&ctx, "rust", true, 1, NOW);

    assert!(dict.lookup_ngram(&ctx, "rust").is_some());
    let other = NgramContext::from_words(["we", "love"], 3);
    assert!(dict.lookup_ngram(&other, "rust").is_some());
    assert_eq!(dict.lookup_ngram(&NgramContext::invalid(3), "rust"), None);
    assert_eq!(dict.lookup_ngram(&ctx, "go"), None);
}

#[test]
fn test_context_longer_than_limit_is_capped() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    let limit = dict.config().max_prev_word_count;
    let ctx = NgramContext::from_words(["a1", "b2", "c3", "d4", "e5"], 5);
    dict.update_entries_for_word(&ctx, "next", true, 1, NOW);

    let longest = dict
        .entries()
        .iter()
        .filter_map(|entry| match entry {
            StoreEntry::Ngram { context, .. } => Some(context.len()),
            StoreEntry::Unigram { .. } => None,
        })
        .max();
    assert_eq!(longest, Some(limit));
    assert!(dict.lookup_ngram(&ctx, "next").is_some());
}

#[test]
fn test_faded_long_context_backs_off() {
    let clock = Arc::new(ManualClock::new(NOW));
    let dict = Dictionary::open(
        DictionaryOptions::new("h", "en_US").with_clock(clock.clone()),
        Arc::new(UserHistoryCapabilities),
    );
    let long = NgramContext::from_words(["we", "love"], 3);
    dict.update_entries_for_word(&long, "rust", true, 1, NOW);

    // One year later the long entry has faded; a fresh bigram is stronger.
    let later = NOW + 365 * 24 * 3600;
    clock.advance(365 * 24 * 3600);
    let short = NgramContext::from_words(["love"], 3);
    for _ in 0..3 {
        dict.update_entries_for_word(&short, "rust", true, 1, later);
    }
    let fresh = dict.lookup_ngram(&short, "rust");
    assert!(fresh.is_some_and(|f| f > dict.config().gc.eviction_threshold));
    assert_eq!(dict.lookup_ngram(&long, "rust"), fresh);
}

#[test]
fn test_history_header_and_validity() {
    let dict = Dictionary::open(options("UserHistoryDictionary.en_US"), Arc::new(UserHistoryCapabilities));
    let attributes = dict.header_attributes();
    assert_eq!(attributes.get(USES_FORGETTING_CURVE_KEY).map(String::as_str), Some("1"));
    assert_eq!(attributes.get(HAS_HISTORICAL_INFO_KEY).map(String::as_str), Some("1"));
    assert_eq!(
        attributes.get(DICTIONARY_ID_KEY).map(String::as_str),
        Some("UserHistoryDictionary.en_US")
    );

    dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    assert!(dict.lookup_unigram("hello").is_some());
    assert!(!dict.is_valid_word("hello"));
}

#[test]
fn test_invalid_word_is_context_only() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    dict.add_to_dictionary(&NgramContext::empty(3), "asdfg", false);
    assert_eq!(dict.lookup_unigram("asdfg"), None);
    assert!(dict.snapshot().unigram("asdfg").is_some_and(|e| e.is_not_a_word));
}

#[test]
fn test_add_to_dictionary_rejects_long_words() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    let long = "a".repeat(dict.config().max_word_length + 1);
    dict.add_to_dictionary(&NgramContext::empty(3), &long, true);
    assert!(dict.entries().is_empty());
}

#[test]
fn test_concurrent_updates_are_all_visible() {
    let dict = Arc::new(Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities)));
    let writers: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|prefix| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || {
                let mut ctx = NgramContext::beginning_of_sentence(3);
                for i in 0..50 {
                    let word = format!("{prefix}{i}");
                    dict.update_entries_for_word(&ctx, &word, true, 1, NOW);
                    ctx = ctx.next_word(&word);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    for i in 0..50 {
        assert!(dict.lookup_unigram(&format!("left{i}")).is_some());
        assert!(dict.lookup_unigram(&format!("right{i}")).is_some());
    }
    assert_eq!(dict.entries().unigram_count(), 100);
}

#[test]
fn test_write_after_close_is_ignored() {
    let dict = Dictionary::open(options("h"), Arc::new(UserHistoryCapabilities));
    dict.close();
    assert_eq!(dict.state(), ReloadState::Closed);
    dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    assert_eq!(dict.lookup_unigram("hello"), None);
    assert!(dict.write(|s| s.mutations()).is_none());
    assert_eq!(
        dict.reload_dictionary_if_required().wait(),
        LoadOutcome::NotRequired
    );
    // Idempotent.
    dict.close();
}

// --- persistence ---

#[test]
fn test_close_flushes_and_reopen_is_ready() {
    let dir = tempfile::tempdir().unwrap();
    let path = dict_file(dir.path(), "UserHistoryDictionary.en_US");
    {
        let dict = Dictionary::open(
            options("UserHistoryDictionary.en_US").with_path(&path),
            Arc::new(UserHistoryCapabilities),
        );
        assert_eq!(dict.state(), ReloadState::Empty);
        let ctx = NgramContext::from_words(["good"], 3);
        dict.update_entries_for_word(&ctx, "morning", true, 1, NOW);
        dict.close();
    }
    assert!(path.exists());

    let dict = Dictionary::open(
        options("UserHistoryDictionary.en_US").with_path(&path),
        Arc::new(UserHistoryCapabilities),
    );
    assert_eq!(dict.state(), ReloadState::Ready);
    assert_eq!(dict.lookup_unigram("morning"), Some(80));
    let ctx = NgramContext::from_words(["good"], 3);
    assert_eq!(dict.lookup_ngram(&ctx, "morning"), Some(80));
}

#[test]
fn test_flush_waits_for_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.dict");
    let dict = Dictionary::open(options("h").with_path(&path), Arc::new(UserHistoryCapabilities));
    dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    assert!(dict.flush());

    let store = DictionaryStore::open(&path).unwrap();
    assert!(store.lookup_unigram("hello").is_some());
    assert!(store.header().uses_forgetting_curve());
}

#[test]
fn test_load_is_flushed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.dict");
    let dict = Dictionary::open(
        options("c").with_path(&path),
        contacts(MemorySource::from_names(["Alice Liddell"])),
    );
    dict.reload_dictionary_if_required().wait();
    assert!(dict.flush());
    let store = DictionaryStore::open(&path).unwrap();
    assert!(store.lookup_unigram("Liddell").is_some());
}

#[test]
fn test_corrupt_file_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.dict");
    std::fs::write(&path, b"VCDX garbage that is not a dictionary").unwrap();

    let dict = Dictionary::open(
        options("c").with_path(&path),
        contacts(MemorySource::from_names(["Alice"])),
    );
    assert_eq!(dict.state(), ReloadState::Empty);
    assert_eq!(dict.reload_dictionary_if_required().wait(), LoadOutcome::Loaded);
    dict.close();

    let reopened = Dictionary::open(
        options("c").with_path(&path),
        contacts(MemorySource::from_names(["Alice"])),
    );
    assert_eq!(reopened.state(), ReloadState::Ready);
    assert!(reopened.lookup_unigram("Alice").is_some());
}

#[test]
fn test_incompatible_locale_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.dict");
    {
        let dict = Dictionary::open(options("h").with_path(&path), Arc::new(UserHistoryCapabilities));
        dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    }
    let dict = Dictionary::open(
        DictionaryOptions::new("h", "fr_FR")
            .with_clock(Arc::new(ManualClock::new(NOW)))
            .with_path(&path),
        Arc::new(UserHistoryCapabilities),
    );
    assert_eq!(dict.state(), ReloadState::Empty);
    assert_eq!(dict.lookup_unigram("hello"), None);
}

#[test]
fn test_history_decays_on_lookup() {
    let clock = Arc::new(ManualClock::new(NOW));
    let dict = Dictionary::open(
        DictionaryOptions::new("h", "en_US").with_clock(clock.clone()),
        Arc::new(UserHistoryCapabilities),
    );
    dict.add_to_dictionary(&NgramContext::empty(3), "hello", true);
    assert_eq!(dict.lookup_unigram("hello"), Some(80));
    clock.advance(168 * 3600);
    assert_eq!(dict.lookup_unigram("hello"), Some(40));
}
