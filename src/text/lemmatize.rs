// Lemmatizer trait: swap-ready abstraction.
//
// The normalizer only needs "give me the normal form of this word". The
// default implementation reduces words with Snowball stemmers, picking the
// Russian or English algorithm from the script the word is written in.
// A dictionary-based morphological analyzer could replace it later.

use rust_stemmers::{Algorithm, Stemmer};

/// Trait for reducing a word to its normal form.
pub trait Lemmatizer: Send + Sync {
    /// Return the normal form of `word`. Output is always lowercase.
    fn lemma(&self, word: &str) -> String;
}

/// Which script a word is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Cyrillic,
    Latin,
    Other,
}

/// Classify a word by the first alphabetic character that belongs to a
/// known script.
pub fn detect_script(word: &str) -> Script {
    for c in word.chars() {
        if is_cyrillic(c) {
            return Script::Cyrillic;
        }
        if c.is_ascii_alphabetic() {
            return Script::Latin;
        }
    }
    Script::Other
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
}

/// Snowball-based lemmatizer for Russian and English text.
pub struct SnowballLemmatizer {
    russian: Stemmer,
    english: Stemmer,
}

impl Default for SnowballLemmatizer {
    fn default() -> Self {
        Self {
            russian: Stemmer::create(Algorithm::Russian),
            english: Stemmer::create(Algorithm::English),
        }
    }
}

impl Lemmatizer for SnowballLemmatizer {
    fn lemma(&self, word: &str) -> String {
        // The Russian stemmer expects ё folded to е
        let lower = word.to_lowercase().replace('ё', "е");
        match detect_script(&lower) {
            Script::Cyrillic => self.russian.stem(&lower).into_owned(),
            Script::Latin => self.english.stem(&lower).into_owned(),
            Script::Other => lower,
        }
    }
}

/// Lemmatizer that only lowercases.
#[cfg(test)]
pub(crate) struct LowercaseLemmatizer;

#[cfg(test)]
impl Lemmatizer for LowercaseLemmatizer {
    fn lemma(&self, word: &str) -> String {
        word.to_lowercase()
    }
}
