//! Vocabulary learned from typed text.
//!
//! Entries carry last-touch timestamps and decay with the forgetting curve;
//! nothing is seeded from a source, so content survives reloads and only
//! GC ever removes it.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use crate::capabilities::Capabilities;
use crate::session::WriteSession;
use crate::source::SourceError;
use crate::store::{
    UnigramEntry, ATTRIBUTE_VALUE_TRUE, HAS_HISTORICAL_INFO_KEY, USES_FORGETTING_CURVE_KEY,
};

pub const USER_HISTORY_KIND: &str = "UserHistoryDictionary";

/// `<kind>.<locale>` or, with per-account history, `<kind>.<locale>.<account>`.
pub fn user_history_dict_name(locale: &str, account: Option<&str>) -> String {
    match account.filter(|a| !a.is_empty()) {
        Some(account) => format!("{USER_HISTORY_KIND}.{locale}.{account}"),
        None => format!("{USER_HISTORY_KIND}.{locale}"),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserHistoryCapabilities;

impl Capabilities for UserHistoryCapabilities {
    fn load_initial_contents(&self, _session: &mut WriteSession<'_>) -> Result<(), SourceError> {
        Ok(())
    }

    /// History only ranks; it never vouches for a word.
    fn is_valid_word(&self, _word: &str, _entry: Option<&UnigramEntry>) -> bool {
        false
    }

    fn header_attributes(&self, attributes: &mut BTreeMap<String, String>) {
        attributes.insert(
            USES_FORGETTING_CURVE_KEY.to_string(),
            ATTRIBUTE_VALUE_TRUE.to_string(),
        );
        attributes.insert(
            HAS_HISTORICAL_INFO_KEY.to_string(),
            ATTRIBUTE_VALUE_TRUE.to_string(),
        );
    }

    fn retains_content_on_reload(&self) -> bool {
        true
    }
}
