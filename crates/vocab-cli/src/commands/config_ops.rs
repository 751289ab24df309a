use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", vocab_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        vocab_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: engine.max_word_length={}, forgetting.half_life_hours={}, gc.max_unigrams={}, gc.max_ngrams={}",
        s.engine.max_word_length, s.forgetting.half_life_hours, s.gc.max_unigrams, s.gc.max_ngrams
    );
}
