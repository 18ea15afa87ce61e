// Stop-word set: Russian and English lists plus a few wall-specific words.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

/// Words that are frequent on Russian-language walls but carry no topic.
/// These are lemmas, matched against lemmatized tokens.
pub const ADDITIONAL_STOP_WORDS: &[&str] = &[
    "который", "также", "это", "свой", "весь", "самый", "наш", "мочь",
];

/// A set of words to drop from the normalized token stream.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl Default for StopWords {
    /// Russian + English lists from the `stop-words` crate plus
    /// [`ADDITIONAL_STOP_WORDS`].
    fn default() -> Self {
        let mut words: HashSet<String> = HashSet::new();
        words.extend(get(LANGUAGE::Russian));
        words.extend(get(LANGUAGE::English));
        words.extend(ADDITIONAL_STOP_WORDS.iter().map(|w| w.to_string()));
        Self::from_words(words)
    }
}

impl StopWords {
    /// Build a set from an explicit word list. Words are lowercased.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Add more words to the set.
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.words
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
