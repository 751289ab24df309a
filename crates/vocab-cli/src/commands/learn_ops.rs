use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

use vocab_core::contacts::ContactsCapabilities;
use vocab_core::dictionary::{Dictionary, DictionaryOptions, LoadOutcome};
use vocab_core::ngram_context::NgramContext;
use vocab_core::settings::settings;
use vocab_core::source::{letter_runs, MemorySource};
use vocab_core::user_history::UserHistoryCapabilities;

use crate::text::parse_names;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

fn dict_name(file: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => Path::new(file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vocab".to_string()),
    }
}

fn report(dict: &Dictionary) {
    let store = dict.entries();
    eprintln!(
        "{}: {} unigrams, {} n-grams",
        dict.name(),
        store.unigram_count(),
        store.ngram_count()
    );
}

/// Build (or rebuild) a contacts dictionary file from a names file.
pub fn import_names(file: &str, names_file: &str, locale: &str, name: Option<&str>) {
    let content = die!(
        fs::read_to_string(names_file),
        "Error reading {names_file}: {}"
    );
    let items = die!(parse_names(&content), "Error parsing {names_file}: {}");
    eprintln!("Read {} items from {names_file}", items.len());

    let source = MemorySource::new(items);
    let dict = Dictionary::open(
        DictionaryOptions::new(dict_name(file, name), locale).with_path(file),
        Arc::new(ContactsCapabilities::new(source, locale)),
    );
    // Always rebuild from the names file, even over an existing dictionary.
    dict.set_needs_to_recreate();
    match dict.reload_dictionary_if_required().wait() {
        LoadOutcome::Loaded | LoadOutcome::NotRequired => {}
        outcome => {
            eprintln!("Error: load {outcome:?}");
            process::exit(1);
        }
    }
    if !dict.flush() {
        eprintln!("Error writing {file}");
        process::exit(1);
    }
    report(&dict);
    dict.close();
}

/// Feed text into a user history dictionary, one sentence per line.
pub fn learn(file: &str, text: &str, locale: &str, name: Option<&str>) {
    let max_prev = settings().engine.max_prev_word_count;
    let dict = Dictionary::open(
        DictionaryOptions::new(dict_name(file, name), locale).with_path(file),
        Arc::new(UserHistoryCapabilities),
    );

    let mut words = 0usize;
    for line in text.lines() {
        let mut context = NgramContext::beginning_of_sentence(max_prev);
        for word in letter_runs(line) {
            dict.add_to_dictionary(&context, word, true);
            context = context.next_word(word);
            words += 1;
        }
    }
    eprintln!("Learned {words} words");
    if !dict.flush() {
        eprintln!("Error writing {file}");
        process::exit(1);
    }
    report(&dict);
    dict.close();
}

/// `learn` with the text read from a file.
pub fn learn_file(file: &str, text_file: &str, locale: &str, name: Option<&str>) {
    let text = die!(
        fs::read_to_string(text_file),
        "Error reading {text_file}: {}"
    );
    learn(file, &text, locale, name);
}
