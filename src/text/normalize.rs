// Text normalization: turns raw wall posts into a clean token stream.
//
// Pipeline: concatenate post texts, drop links and hashtags, keep only
// letters, lemmatize each word, then remove stop-words and single-letter
// leftovers. The output is the input for the bag-of-words corpus.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::debug;

use super::lemmatize::{Lemmatizer, SnowballLemmatizer};
use super::stopwords::StopWords;
use crate::vk::wall::WallPost;

/// Tokens matching this are links or hashtags and are dropped whole.
static LINK_OR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://|#").expect("static regex"));

/// Concatenate the text of the first `count` posts, each followed by a space.
pub fn concat_posts(posts: &[WallPost], count: usize) -> String {
    let mut text = String::new();
    for post in posts.iter().take(count) {
        text.push_str(&post.text);
        text.push(' ');
    }
    text
}

/// Drop every whitespace-separated token that contains a link or a `#`.
pub fn strip_links_and_tags(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !LINK_OR_TAG.is_match(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep letters and spaces. Newlines become spaces; anything else
/// (digits, punctuation, emoji) is removed in place.
pub fn keep_alphabetic(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' => Some(' '),
            ' ' => Some(' '),
            c if c.is_alphabetic() => Some(c),
            _ => None,
        })
        .collect()
}

/// The full normalization pipeline with its lemmatizer and stop-word set.
pub struct Normalizer {
    lemmatizer: Box<dyn Lemmatizer>,
    stop_words: StopWords,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Box::new(SnowballLemmatizer::default()), StopWords::default())
    }
}

impl Normalizer {
    pub fn new(lemmatizer: Box<dyn Lemmatizer>, stop_words: StopWords) -> Self {
        Self {
            lemmatizer,
            stop_words,
        }
    }

    /// The default normalizer with extra words added to the stop list.
    pub fn with_extra_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop_words = StopWords::default();
        stop_words.extend(words);
        Self::new(Box::new(SnowballLemmatizer::default()), stop_words)
    }

    /// Normalize already-concatenated text into lemmas.
    ///
    /// A word is dropped when its lowercase form or its lemma is a
    /// stop-word, or when the lemma is a single character.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let cleaned = keep_alphabetic(&strip_links_and_tags(text));

        let mut tokens = Vec::new();
        let mut dropped = 0usize;
        for word in cleaned.split_whitespace() {
            let lower = word.to_lowercase();
            let lemma = self.lemmatizer.lemma(word);
            if self.stop_words.contains(&lower)
                || self.stop_words.contains(&lemma)
                || lemma.chars().count() <= 1
            {
                dropped += 1;
                continue;
            }
            tokens.push(lemma);
        }

        debug!(kept = tokens.len(), dropped = dropped, "Normalized text");

        tokens
    }

    /// Prepare the first `count` posts of a wall for topic modeling.
    pub fn prep_text(&self, posts: &[WallPost], count: usize) -> Vec<String> {
        self.normalize(&concat_posts(posts, count))
    }
}
