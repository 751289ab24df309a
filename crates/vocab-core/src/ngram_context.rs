//! Bounded window of previous words used as the key prefix of n-grams.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One slot of an n-gram context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WordInfo {
    /// Unusable context, e.g. the slot after a non-word token.
    Empty,
    /// Start of input or sentence.
    BeginningOfSentence,
    Word(String),
}

impl WordInfo {
    pub fn word(word: impl Into<String>) -> Self {
        WordInfo::Word(word.into())
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, WordInfo::Empty)
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            WordInfo::Word(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for WordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordInfo::Empty => f.write_str("<empty>"),
            WordInfo::BeginningOfSentence => f.write_str("<s>"),
            WordInfo::Word(w) => f.write_str(w),
        }
    }
}

/// Immutable sliding window of at most `max_len` previous words, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NgramContext {
    words: Vec<WordInfo>,
    max_len: usize,
}

impl NgramContext {
    /// No previous words. Not usable as an n-gram context.
    pub fn empty(max_len: usize) -> Self {
        Self {
            words: Vec::new(),
            max_len,
        }
    }

    /// Context after a token that cannot start an n-gram.
    pub fn invalid(max_len: usize) -> Self {
        Self {
            words: vec![WordInfo::Empty],
            max_len,
        }
    }

    pub fn beginning_of_sentence(max_len: usize) -> Self {
        Self {
            words: vec![WordInfo::BeginningOfSentence],
            max_len,
        }
    }

    /// Build from previous words, oldest first. Only the last `max_len` are kept.
    pub fn from_words<I, S>(words: I, max_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut words: Vec<WordInfo> = words.into_iter().map(WordInfo::word).collect();
        if words.len() > max_len {
            words.drain(..words.len() - max_len);
        }
        Self { words, max_len }
    }

    /// Append `info` as the most recent word, dropping the oldest entry once
    /// the window exceeds `max_len`.
    pub fn next_context(&self, info: WordInfo) -> Self {
        let mut words = Vec::with_capacity(self.max_len.min(self.words.len() + 1));
        let keep = (self.words.len() + 1).saturating_sub(self.max_len);
        words.extend(self.words.iter().skip(keep).cloned());
        if self.max_len > 0 {
            words.push(info);
        }
        Self {
            words,
            max_len: self.max_len,
        }
    }

    pub fn next_word(&self, word: &str) -> Self {
        self.next_context(WordInfo::word(word))
    }

    /// Usable as an n-gram key: the most recent slot exists and is not the
    /// empty marker.
    pub fn is_valid(&self) -> bool {
        self.words.last().is_some_and(WordInfo::is_valid)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Oldest first.
    pub fn words(&self) -> &[WordInfo] {
        &self.words
    }

    /// The `n`-th previous word, 1 being the most recent.
    pub fn prev_word(&self, n: usize) -> Option<&WordInfo> {
        if n == 0 || n > self.words.len() {
            return None;
        }
        self.words.get(self.words.len() - n)
    }

    /// Valid suffixes from shortest (most recent word only) to longest. A
    /// suffix stops growing at the first empty marker.
    pub fn suffixes(&self) -> impl Iterator<Item = &[WordInfo]> + '_ {
        let valid = self
            .words
            .iter()
            .rev()
            .take_while(|w| w.is_valid())
            .count();
        (1..=valid).map(move |n| &self.words[self.words.len() - n..])
    }
}

impl fmt::Display for NgramContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{w}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn words(ctx: &NgramContext) -> Vec<String> {
        ctx.words().iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn sliding_window_keeps_latest() {
        let mut ctx = NgramContext::empty(2);
        for w in ["a", "b", "c", "d"] {
            ctx = ctx.next_word(w);
        }
        assert_eq!(words(&ctx), vec!["c", "d"]);
    }

    #[test]
    fn empty_and_invalid_are_not_valid() {
        assert!(!NgramContext::empty(3).is_valid());
        assert!(!NgramContext::invalid(3).is_valid());
        assert!(NgramContext::beginning_of_sentence(3).is_valid());
        assert!(NgramContext::invalid(3).next_word("hello").is_valid());
    }

    #[test]
    fn suffixes_stop_at_empty_marker() {
        let ctx = NgramContext::invalid(3).next_word("good").next_word("morning");
        let suffixes: Vec<Vec<String>> = ctx
            .suffixes()
            .map(|s| s.iter().map(|w| w.to_string()).collect())
            .collect();
        assert_eq!(
            suffixes,
            vec![vec!["morning".to_string()], vec!["good".into(), "morning".into()]]
        );
    }

    #[test]
    fn prev_word_counts_from_most_recent() {
        let ctx = NgramContext::from_words(["one", "two", "three"], 3);
        assert_eq!(ctx.prev_word(1), Some(&WordInfo::word("three")));
        assert_eq!(ctx.prev_word(3), Some(&WordInfo::word("one")));
        assert_eq!(ctx.prev_word(0), None);
        assert_eq!(ctx.prev_word(4), None);
    }

    #[test]
    fn from_words_truncates_oldest() {
        let ctx = NgramContext::from_words(["a", "b", "c", "d"], 3);
        assert_eq!(words(&ctx), vec!["b", "c", "d"]);
    }

    #[test]
    fn display() {
        let ctx = NgramContext::beginning_of_sentence(3).next_word("hi");
        assert_eq!(ctx.to_string(), "[<s> hi]");
    }

    proptest! {
        #[test]
        fn window_never_exceeds_bound(
            k in 1usize..5,
            input in proptest::collection::vec("[a-z]{1,6}", 0..20),
        ) {
            let mut ctx = NgramContext::empty(k);
            for w in &input {
                ctx = ctx.next_word(w);
                prop_assert!(ctx.len() <= k);
            }
            let expected: Vec<String> = input
                .iter()
                .skip(input.len().saturating_sub(k))
                .cloned()
                .collect();
            prop_assert_eq!(words(&ctx), expected);
        }
    }
}
