//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Upper bound of every stored frequency.
pub const MAX_FREQUENCY: u8 = u8::MAX;

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineSettings,
    pub frequency: FrequencySettings,
    pub forgetting: ForgettingSettings,
    pub gc: GcSettings,
    pub flush: FlushSettings,
    pub personalization: PersonalizationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub max_word_length: usize,
    pub max_prev_word_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrequencySettings {
    pub contacts: u8,
    pub contacts_bigram: u8,
    pub history_increment: u8,
    pub retention: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgettingSettings {
    pub half_life_hours: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcSettings {
    pub overlay_threshold: usize,
    pub eviction_threshold: u8,
    pub max_unigrams: usize,
    pub max_ngrams: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlushSettings {
    pub updates_per_flush: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizationSettings {
    pub use_contacts_dict: bool,
    pub use_personalized_dicts: bool,
    #[serde(default)]
    pub per_account_history: bool,
    #[serde(default)]
    pub no_first_last_bigram_languages: Vec<String>,
}

impl PersonalizationSettings {
    /// Whether contact names in `locale` are written "first last" so that
    /// consecutive name parts are worth a bigram.
    pub fn use_first_last_bigrams(&self, locale: &str) -> bool {
        let language = locale
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        !self
            .no_first_last_bigram_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&language))
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    // A single-letter word is never stored, so a limit below 2 admits nothing.
    if s.engine.max_word_length < 2 {
        return Err(SettingsError::InvalidValue {
            field: "engine.max_word_length".to_string(),
            reason: "must be at least 2".to_string(),
        });
    }
    check_positive!(engine.max_prev_word_count);

    check_positive!(frequency.contacts);
    check_positive!(frequency.contacts_bigram);
    check_positive!(frequency.history_increment);
    if !(0.0..1.0).contains(&s.frequency.retention) {
        return Err(SettingsError::InvalidValue {
            field: "frequency.retention".to_string(),
            reason: "must be in [0.0, 1.0)".to_string(),
        });
    }

    if s.forgetting.half_life_hours <= 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "forgetting.half_life_hours".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    check_positive!(gc.overlay_threshold);
    check_positive!(gc.max_unigrams);
    check_positive!(gc.max_ngrams);

    check_positive!(flush.updates_per_flush);

    Ok(())
}
