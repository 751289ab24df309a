use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process;

use serde::Serialize;
use vocab_core::clock::{Clock, SystemClock};
use vocab_core::ngram_context::{NgramContext, WordInfo};
use vocab_core::policy::{effective_frequency, ForgettingCurve};
use vocab_core::settings::settings;
use vocab_core::store::{DictionaryStore, StoreEntry};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

fn open_store(file: &str) -> DictionaryStore {
    die!(
        DictionaryStore::open(Path::new(file)),
        "Error loading {file}: {}"
    )
}

#[derive(Serialize)]
struct InfoReport<'a> {
    file: &'a str,
    size_bytes: u64,
    locale: &'a str,
    attributes: &'a BTreeMap<String, String>,
    unigrams: usize,
    not_a_word: usize,
    ngrams: usize,
}

pub fn info(file: &str, json: bool) {
    let store = open_store(file);
    let report = InfoReport {
        file,
        size_bytes: fs::metadata(file).map(|m| m.len()).unwrap_or(0),
        locale: store.locale(),
        attributes: store.header_attributes(),
        unigrams: store.unigram_count(),
        not_a_word: store
            .iter()
            .filter(|e| matches!(e, StoreEntry::Unigram { entry, .. } if entry.is_not_a_word))
            .count(),
        ngrams: store.ngram_count(),
    };

    if json {
        let text = die!(serde_json::to_string_pretty(&report), "Error: {}");
        println!("{text}");
        return;
    }
    println!("File:       {}", report.file);
    println!("Size:       {} bytes", report.size_bytes);
    println!("Locale:     {}", report.locale);
    println!(
        "Unigrams:   {} ({} context-only)",
        report.unigrams, report.not_a_word
    );
    println!("N-grams:    {}", report.ngrams);
    for (key, value) in report.attributes {
        println!("  {key} = {value}");
    }
}

/// One JSON object per line, sorted by kind, context and word.
pub fn dump(file: &str) {
    let store = open_store(file);
    let mut entries: Vec<StoreEntry<'_>> = store.iter().collect();
    entries.sort_by_cached_key(sort_key);
    for entry in entries {
        let line = die!(serde_json::to_string(&entry), "Error: {}");
        println!("{line}");
    }
}

fn sort_key<'a>(entry: &StoreEntry<'a>) -> (u8, String, &'a str) {
    match *entry {
        StoreEntry::Unigram { word, .. } => (0, String::new(), word),
        StoreEntry::Ngram { context, word, .. } => (1, context_label(context), word),
    }
}

fn context_label(context: &[WordInfo]) -> String {
    let words: Vec<String> = context.iter().map(ToString::to_string).collect();
    format!("[{}]", words.join(" "))
}

pub fn lookup(file: &str, word: &str, context: &[String]) {
    let store = open_store(file);
    let s = settings();
    let curve = ForgettingCurve::from_settings(s);
    let uses_curve = store.header().uses_forgetting_curve();
    let now = SystemClock.now();

    match store.lookup_unigram(word) {
        Some(e) => println!(
            "unigram {word}: frequency={} effective={} not_a_word={} offensive={} last_touched={:?}",
            e.frequency,
            effective_frequency(&curve, uses_curve, e.frequency, e.last_touched, now),
            e.is_not_a_word,
            e.is_possibly_offensive,
            e.last_touched,
        ),
        None => println!("unigram {word}: (not found)"),
    }

    if context.is_empty() {
        return;
    }
    let ctx = NgramContext::from_words(context.iter().cloned(), s.engine.max_prev_word_count);
    for suffix in ctx.suffixes() {
        let label = context_label(suffix);
        match store.lookup_ngram(suffix, word) {
            Some(e) => println!(
                "ngram {label} {word}: frequency={} effective={} last_touched={:?}",
                e.frequency,
                effective_frequency(&curve, uses_curve, e.frequency, e.last_touched, now),
                e.last_touched,
            ),
            None => println!("ngram {label} {word}: (not found)"),
        }
    }
}
