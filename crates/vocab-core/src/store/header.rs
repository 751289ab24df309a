use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DICTIONARY_ID_KEY: &str = "dictionary";
pub const DICTIONARY_LOCALE_KEY: &str = "locale";
pub const DICTIONARY_VERSION_KEY: &str = "version";
/// Frequencies decay with time since last touch.
pub const USES_FORGETTING_CURVE_KEY: &str = "USES_FORGETTING_CURVE";
/// Entries carry meaningful last-touch timestamps.
pub const HAS_HISTORICAL_INFO_KEY: &str = "HAS_HISTORICAL_INFO";
pub const ATTRIBUTE_VALUE_TRUE: &str = "1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub locale: String,
    pub attributes: BTreeMap<String, String>,
}

impl Header {
    pub fn new(locale: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        Self {
            locale: locale.into(),
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        self.attribute(key) == Some(ATTRIBUTE_VALUE_TRUE)
    }

    pub fn uses_forgetting_curve(&self) -> bool {
        self.flag(USES_FORGETTING_CURVE_KEY)
    }

    pub fn has_historical_info(&self) -> bool {
        self.flag(HAS_HISTORICAL_INFO_KEY)
    }
}
