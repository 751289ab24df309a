//! Dictionary kinds and their constructors.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::contacts::ContactsCapabilities;
use crate::dictionary::{dict_file, Dictionary, DictionaryOptions};
use crate::source::{MemorySource, VocabularySource};
use crate::user_history::{user_history_dict_name, UserHistoryCapabilities, USER_HISTORY_KIND};

pub const CONTACTS_KIND: &str = "ContactsDictionary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryKind {
    Contacts,
    UserHistory,
}

type Constructor = fn(&str, Option<Arc<dyn VocabularySource>>) -> Arc<dyn Capabilities>;

const CONSTRUCTORS: &[(DictionaryKind, Constructor)] = &[
    (DictionaryKind::Contacts, |locale, source| {
        // Without a source the dictionary stays empty until one is wired.
        let source = source.unwrap_or_else(|| MemorySource::new(Vec::new()));
        Arc::new(ContactsCapabilities::new(source, locale))
    }),
    (DictionaryKind::UserHistory, |_, _| {
        Arc::new(UserHistoryCapabilities)
    }),
];

impl DictionaryKind {
    pub const ALL: [DictionaryKind; 2] = [DictionaryKind::Contacts, DictionaryKind::UserHistory];

    pub fn as_str(self) -> &'static str {
        match self {
            DictionaryKind::Contacts => CONTACTS_KIND,
            DictionaryKind::UserHistory => USER_HISTORY_KIND,
        }
    }

    /// File stem for this kind: `<prefix><kind>.<locale>` for contacts,
    /// `<kind>.<locale>[.<account>]` for user history.
    pub fn dict_name(self, prefix: &str, locale: &str, account: Option<&str>) -> String {
        match self {
            DictionaryKind::Contacts => format!("{prefix}{CONTACTS_KIND}.{locale}"),
            DictionaryKind::UserHistory => user_history_dict_name(locale, account),
        }
    }

    pub fn capabilities(
        self,
        locale: &str,
        source: Option<Arc<dyn VocabularySource>>,
    ) -> Arc<dyn Capabilities> {
        let (_, construct) = CONSTRUCTORS
            .iter()
            .find(|(kind, _)| *kind == self)
            .copied()
            .unwrap_or(CONSTRUCTORS[0]);
        construct(locale, source)
    }

    pub fn open(
        self,
        options: DictionaryOptions,
        source: Option<Arc<dyn VocabularySource>>,
    ) -> Dictionary {
        let capabilities = self.capabilities(options.locale(), source);
        Dictionary::open(options, capabilities)
    }

    /// Open the kind's dictionary under `dir` with default settings.
    pub fn open_in(
        self,
        dir: &Path,
        locale: &str,
        account: Option<&str>,
        source: Option<Arc<dyn VocabularySource>>,
    ) -> Dictionary {
        let name = self.dict_name("", locale, account);
        let options = DictionaryOptions::new(name.clone(), locale).with_path(dict_file(dir, &name));
        self.open(options, source)
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown dictionary kind: {0}")]
pub struct UnknownKind(String);

impl FromStr for DictionaryKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contacts" | "contactsdictionary" => Ok(DictionaryKind::Contacts),
            "history" | "user_history" | "userhistorydictionary" => {
                Ok(DictionaryKind::UserHistory)
            }
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}
