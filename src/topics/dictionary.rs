// Dictionary and bag-of-words corpus.
//
// The dictionary assigns each distinct token an integer id in first-seen
// order and tracks how many documents contain it. A document becomes a
// sparse list of (token id, count) pairs sorted by id.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A bag-of-words document: (token id, count) pairs sorted by id.
pub type BowDocument = Vec<(usize, usize)>;

/// A corpus of bag-of-words documents.
pub type Corpus = Vec<BowDocument>;

/// Token <-> id mapping with document frequencies.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    doc_freq: Vec<usize>,
    num_docs: usize,
}

impl Dictionary {
    /// Build a dictionary from tokenized documents.
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut dictionary = Self::default();
        for doc in documents {
            dictionary.add_document(doc);
        }
        dictionary
    }

    /// Add one document's tokens, assigning ids to unseen tokens.
    pub fn add_document(&mut self, tokens: &[String]) {
        self.num_docs += 1;
        let mut seen_in_doc: HashSet<usize> = HashSet::new();
        for token in tokens {
            let id = match self.token2id.get(token) {
                Some(&id) => id,
                None => {
                    let id = self.id2token.len();
                    self.token2id.insert(token.clone(), id);
                    self.id2token.push(token.clone());
                    self.doc_freq.push(0);
                    id
                }
            };
            seen_in_doc.insert(id);
        }
        for id in seen_in_doc {
            self.doc_freq[id] += 1;
        }
    }

    /// Convert tokens to a bag-of-words vector. Unknown tokens are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> BowDocument {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }

    /// Build the corpus for a set of documents against this dictionary.
    pub fn corpus(&self, documents: &[Vec<String>]) -> Corpus {
        documents.iter().map(|doc| self.doc2bow(doc)).collect()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(|s| s.as_str())
    }

    /// Number of documents containing the token with this id.
    pub fn doc_freq(&self, id: usize) -> usize {
        self.doc_freq.get(id).copied().unwrap_or(0)
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }
}

/// How normalized tokens are grouped into model documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentMode {
    /// Every token from every wall in one document.
    #[default]
    Combined,
    /// One document per wall.
    PerWall,
    /// One document per post.
    PerPost,
}

/// Group per-wall, per-post token lists into documents.
///
/// `walls[w][p]` is the token list of post `p` on wall `w`. Empty
/// documents are dropped.
pub fn group_documents(walls: Vec<Vec<Vec<String>>>, mode: DocumentMode) -> Vec<Vec<String>> {
    let documents: Vec<Vec<String>> = match mode {
        DocumentMode::Combined => vec![walls.into_iter().flatten().flatten().collect()],
        DocumentMode::PerWall => walls
            .into_iter()
            .map(|posts| posts.into_iter().flatten().collect())
            .collect(),
        DocumentMode::PerPost => walls.into_iter().flatten().collect(),
    };
    documents.into_iter().filter(|d| !d.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_ids_in_first_seen_order() {
        let dict = Dictionary::from_documents(&[tokens(&["b", "a", "b"]), tokens(&["c", "a"])]);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.id("b"), Some(0));
        assert_eq!(dict.id("a"), Some(1));
        assert_eq!(dict.id("c"), Some(2));
        assert_eq!(dict.token(2), Some("c"));
        assert_eq!(dict.num_docs(), 2);
    }

    #[test]
    fn test_doc_freq_counts_documents_not_occurrences() {
        let dict = Dictionary::from_documents(&[tokens(&["a", "a", "a"]), tokens(&["a", "b"])]);
        assert_eq!(dict.doc_freq(0), 2);
        assert_eq!(dict.doc_freq(1), 1);
        assert_eq!(dict.doc_freq(99), 0);
    }

    #[test]
    fn test_doc2bow_sorted_and_ignores_unknown() {
        let dict = Dictionary::from_documents(&[tokens(&["x", "y", "z"])]);
        let bow = dict.doc2bow(&tokens(&["z", "x", "z", "unknown"]));
        assert_eq!(bow, vec![(0, 1), (2, 2)]);
    }

    #[test]
    fn test_group_documents_modes() {
        let walls = vec![
            vec![tokens(&["a", "b"]), tokens(&["c"])],
            vec![tokens(&[]), tokens(&["d"])],
        ];

        let combined = group_documents(walls.clone(), DocumentMode::Combined);
        assert_eq!(combined, vec![tokens(&["a", "b", "c", "d"])]);

        let per_wall = group_documents(walls.clone(), DocumentMode::PerWall);
        assert_eq!(per_wall, vec![tokens(&["a", "b", "c"]), tokens(&["d"])]);

        let per_post = group_documents(walls, DocumentMode::PerPost);
        assert_eq!(per_post.len(), 3);
    }

    #[test]
    fn test_group_documents_drops_empty() {
        let walls = vec![vec![tokens(&[])]];
        assert!(group_documents(walls, DocumentMode::Combined).is_empty());
    }
}
