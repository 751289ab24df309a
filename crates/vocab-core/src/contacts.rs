//! Contact names and device account addresses.

use std::sync::Arc;

use tracing::debug;

use crate::capabilities::Capabilities;
use crate::ngram_context::NgramContext;
use crate::session::WriteSession;
use crate::settings::{settings, Settings};
use crate::source::{letter_runs, ChangeListener, SourceError, SourceItem, VocabularySource};

pub struct ContactsCapabilities {
    source: Arc<dyn VocabularySource>,
    use_first_last_bigrams: bool,
    unigram_frequency: u8,
    bigram_frequency: u8,
}

impl ContactsCapabilities {
    pub fn new(source: Arc<dyn VocabularySource>, locale: &str) -> Self {
        Self::from_settings(source, locale, settings())
    }

    pub fn from_settings(source: Arc<dyn VocabularySource>, locale: &str, s: &Settings) -> Self {
        Self {
            source,
            use_first_last_bigrams: s.personalization.use_first_last_bigrams(locale),
            unigram_frequency: s.frequency.contacts,
            bigram_frequency: s.frequency.contacts_bigram,
        }
    }

    /// Split a display name into words. Consecutive parts form bigrams
    /// ("John" → "Smith") in locales that write names first-last.
    fn add_name(&self, session: &mut WriteSession<'_>, name: &str) {
        let mut context = NgramContext::empty(session.config().max_prev_word_count);
        for word in letter_runs(name) {
            if !session.is_acceptable_word(word) {
                continue;
            }
            session.run_gc_if_required(true);
            session.add_unigram(word, self.unigram_frequency, false, false, None);
            if self.use_first_last_bigrams && context.is_valid() {
                session.add_ngram_entry(&context, word, self.bigram_frequency, None);
            }
            context = context.next_word(word);
        }
    }
}

impl Capabilities for ContactsCapabilities {
    fn load_initial_contents(&self, session: &mut WriteSession<'_>) -> Result<(), SourceError> {
        let items = self.source.enumerate()?;
        debug!(items = items.len(), "loading contacts");
        for item in items {
            match item {
                SourceItem::Name(name) => self.add_name(session, &name),
                // Account addresses are kept whole.
                SourceItem::Word { word, timestamp } => {
                    session.run_gc_if_required(true);
                    session.add_unigram(&word, self.unigram_frequency, false, false, timestamp);
                }
                SourceItem::Typed { word, is_valid } => {
                    session.run_gc_if_required(true);
                    session.add_unigram(&word, self.unigram_frequency, !is_valid, false, None);
                }
            }
        }
        Ok(())
    }

    fn register_change_listener(&self, listener: ChangeListener) {
        self.source.register_change_listener(listener);
    }
}
