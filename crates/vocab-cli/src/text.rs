//! Plain-text inputs for `vocabtool`.
//!
//! A names file holds one contact display name per line. Lines starting
//! with `account:` carry a device account address that is stored whole.
//! Blank lines and `#` comments are skipped.

use vocab_core::source::SourceItem;

const ACCOUNT_PREFIX: &str = "account:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: empty account")]
    EmptyAccount { line: usize },
    #[error("line {line}: account contains whitespace: {value}")]
    InvalidAccount { line: usize, value: String },
}

pub fn parse_names(content: &str) -> Result<Vec<SourceItem>, ParseError> {
    let mut items = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.strip_prefix(ACCOUNT_PREFIX) {
            Some(account) => {
                let account = account.trim();
                if account.is_empty() {
                    return Err(ParseError::EmptyAccount { line: i + 1 });
                }
                if account.contains(char::is_whitespace) {
                    return Err(ParseError::InvalidAccount {
                        line: i + 1,
                        value: account.to_string(),
                    });
                }
                items.push(SourceItem::Word {
                    word: account.to_string(),
                    timestamp: None,
                });
            }
            None => items.push(SourceItem::Name(line.to_string())),
        }
    }
    Ok(items)
}
