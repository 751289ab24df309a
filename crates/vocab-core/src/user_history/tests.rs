use std::sync::Arc;

use crate::clock::ManualClock;
use crate::config::DictionaryConfig;
use crate::dictionary::{Dictionary, DictionaryOptions};
use crate::ngram_context::NgramContext;

use super::*;

const NOW: u64 = 1_700_000_000;
const DAY: u64 = 24 * 3600;

fn history(clock: Arc<ManualClock>, config: DictionaryConfig) -> Dictionary {
    Dictionary::open(
        DictionaryOptions::new(user_history_dict_name("en_US", None), "en_US")
            .with_clock(clock)
            .with_config(config),
        Arc::new(UserHistoryCapabilities),
    )
}

#[test]
fn test_dict_name() {
    assert_eq!(user_history_dict_name("en_US", None), "UserHistoryDictionary.en_US");
    assert_eq!(
        user_history_dict_name("en_US", Some("me@example.com")),
        "UserHistoryDictionary.en_US.me@example.com"
    );
    assert_eq!(user_history_dict_name("en_US", Some("")), "UserHistoryDictionary.en_US");
}

#[test]
fn test_record_unigram_and_bigram() {
    let dict = history(Arc::new(ManualClock::new(NOW)), DictionaryConfig::default());
    let ctx = NgramContext::beginning_of_sentence(3);
    dict.add_to_dictionary(&ctx, "today", true);
    dict.add_to_dictionary(&ctx.next_word("today"), "is", true);

    assert!(dict.lookup_unigram("today").unwrap() > 0);
    assert!(dict.lookup_ngram(&ctx, "today").unwrap() > 0);
    assert!(dict.lookup_ngram(&ctx.next_word("today"), "is").unwrap() > 0);
}

#[test]
fn test_frequency_increment() {
    let dict = history(Arc::new(ManualClock::new(NOW)), DictionaryConfig::default());
    let ctx = NgramContext::empty(3);
    dict.add_to_dictionary(&ctx, "today", true);
    let once = dict.lookup_unigram("today").unwrap();
    dict.add_to_dictionary(&ctx, "today", true);
    let twice = dict.lookup_unigram("today").unwrap();
    assert!(twice > once, "{twice} should exceed {once}");
}

#[test]
fn test_typed_words_are_never_valid() {
    let dict = history(Arc::new(ManualClock::new(NOW)), DictionaryConfig::default());
    dict.add_to_dictionary(&NgramContext::empty(3), "today", true);
    assert!(!dict.is_valid_word("today"));
}

#[test]
fn test_unused_words_are_forgotten() {
    let clock = Arc::new(ManualClock::new(NOW));
    let config = DictionaryConfig {
        overlay_threshold: 1,
        ..DictionaryConfig::default()
    };
    let dict = history(clock.clone(), config);
    let ctx = NgramContext::empty(3);
    dict.add_to_dictionary(&ctx, "fleeting", true);

    clock.advance(3 * 365 * DAY);
    // The next write runs GC, which drops the stale word but keeps the new
    // one.
    dict.add_to_dictionary(&ctx, "fresh", true);
    dict.add_to_dictionary(&ctx, "fresher", true);
    let entries = dict.entries();
    assert!(entries.lookup_unigram("fleeting").is_none());
    assert!(entries.lookup_unigram("fresh").is_some());
    assert!(entries.lookup_unigram("fresher").is_some());
}

#[test]
fn test_history_is_bounded() {
    let mut config = DictionaryConfig::default();
    config.overlay_threshold = 4;
    config.gc.max_unigrams = 10;
    let dict = history(Arc::new(ManualClock::new(NOW)), config);
    let ctx = NgramContext::empty(3);
    for i in 0..40 {
        dict.add_to_dictionary(&ctx, &format!("word{i}"), true);
    }
    dict.write(|session| session.run_gc());
    assert!(dict.entries().unigram_count() <= 10);
}
