use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use vocab_core::dictionary::{Dictionary, ReloadHandle};
use vocab_core::ngram_context::NgramContext;
use vocab_core::registry::DictionaryKind;
use vocab_core::settings::{settings, PersonalizationSettings};
use vocab_core::source::VocabularySource;

/// The personal dictionaries of one user and locale, as enabled by the
/// personalization settings.
pub struct PersonalDictionaries {
    locale: String,
    contacts: Option<Dictionary>,
    user_history: Option<Dictionary>,
}

impl PersonalDictionaries {
    pub fn open(
        dir: &Path,
        locale: &str,
        account: Option<&str>,
        contacts_source: Option<Arc<dyn VocabularySource>>,
    ) -> Self {
        Self::open_with(
            dir,
            locale,
            account,
            contacts_source,
            &settings().personalization,
        )
    }

    pub fn open_with(
        dir: &Path,
        locale: &str,
        account: Option<&str>,
        contacts_source: Option<Arc<dyn VocabularySource>>,
        personalization: &PersonalizationSettings,
    ) -> Self {
        let contacts = personalization
            .use_contacts_dict
            .then(|| DictionaryKind::Contacts.open_in(dir, locale, None, contacts_source));
        let history_account = account.filter(|_| personalization.per_account_history);
        let user_history = personalization.use_personalized_dicts.then(|| {
            DictionaryKind::UserHistory.open_in(dir, locale, history_account, None)
        });
        info!(
            locale,
            contacts = contacts.is_some(),
            user_history = user_history.is_some(),
            "personal dictionaries opened"
        );
        Self {
            locale: locale.to_string(),
            contacts,
            user_history,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn contacts(&self) -> Option<&Dictionary> {
        self.contacts.as_ref()
    }

    pub fn user_history(&self) -> Option<&Dictionary> {
        self.user_history.as_ref()
    }

    pub fn dictionaries(&self) -> impl Iterator<Item = &Dictionary> {
        self.contacts.iter().chain(self.user_history.iter())
    }

    /// Start a load for every dictionary that needs one.
    pub fn reload_if_required(&self) -> Vec<ReloadHandle> {
        self.dictionaries()
            .map(Dictionary::reload_dictionary_if_required)
            .collect()
    }

    /// Record a committed word in the user history.
    pub fn learn(&self, context: &NgramContext, word: &str, is_valid: bool) {
        match &self.user_history {
            Some(history) => history.add_to_dictionary(context, word, is_valid),
            None => debug!(word, "personalized dictionaries disabled"),
        }
    }

    pub fn is_contact_word(&self, word: &str) -> bool {
        self.contacts
            .as_ref()
            .is_some_and(|contacts| contacts.is_valid_word(word))
    }

    /// Flush every dictionary and wait. `true` if all files are current.
    pub fn flush(&self) -> bool {
        self.dictionaries().fold(true, |ok, dict| dict.flush() && ok)
    }

    pub fn close(&self) {
        for dict in self.dictionaries() {
            dict.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use vocab_core::ngram_context::NgramContext;
    use vocab_core::source::MemorySource;

    use super::*;

    fn personalization(contacts: bool, history: bool, per_account: bool) -> PersonalizationSettings {
        PersonalizationSettings {
            use_contacts_dict: contacts,
            use_personalized_dicts: history,
            per_account_history: per_account,
            no_first_last_bigram_languages: vec!["ja".into()],
        }
    }

    #[test]
    fn opens_enabled_dictionaries() {
        let dir = tempfile::tempdir().unwrap();
        let dicts = PersonalDictionaries::open_with(
            dir.path(),
            "en_US",
            None,
            Some(MemorySource::from_names(["Ada Lovelace"])),
            &personalization(true, false, false),
        );
        assert!(dicts.contacts().is_some());
        assert!(dicts.user_history().is_none());
        for handle in dicts.reload_if_required() {
            handle.wait();
        }
        assert!(dicts.is_contact_word("Lovelace"));
        // No history: learning is a no-op.
        dicts.learn(&NgramContext::empty(3), "hello", true);
        assert!(dicts.flush());
        dicts.close();
        assert!(dir.path().join("ContactsDictionary.en_US.dict").exists());
    }

    #[test]
    fn per_account_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let dicts = PersonalDictionaries::open_with(
            dir.path(),
            "en_US",
            Some("me@example.com"),
            None,
            &personalization(false, true, true),
        );
        dicts.learn(&NgramContext::beginning_of_sentence(3), "hello", true);
        assert!(dicts
            .user_history()
            .and_then(|h| h.lookup_unigram("hello"))
            .is_some());
        dicts.close();
        assert!(dir
            .path()
            .join("UserHistoryDictionary.en_US.me@example.com.dict")
            .exists());
    }

    #[test]
    fn shared_history_ignores_account() {
        let dir = tempfile::tempdir().unwrap();
        let dicts = PersonalDictionaries::open_with(
            dir.path(),
            "fr_FR",
            Some("me@example.com"),
            None,
            &personalization(false, true, false),
        );
        assert_eq!(
            dicts.user_history().map(Dictionary::name),
            Some("UserHistoryDictionary.fr_FR")
        );
    }
}
