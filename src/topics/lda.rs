//! Latent Dirichlet Allocation (LDA)
//!
//! A generative probabilistic topic model fitted with collapsed Gibbs
//! sampling. The model works on a bag-of-words corpus and a fixed number
//! of topics.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use super::dictionary::Corpus;

/// Errors that can occur while fitting LDA
#[derive(Error, Debug, PartialEq)]
pub enum LdaError {
    #[error("Number of topics must be positive")]
    InvalidTopicCount,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("Corpus has no tokens")]
    EmptyCorpus,

    #[error("Token id {id} is outside a vocabulary of {vocab_size}")]
    UnknownTerm { id: usize, vocab_size: usize },
}

/// LDA model configuration
#[derive(Debug, Clone)]
pub struct LdaConfig {
    /// Number of topics
    pub num_topics: usize,
    /// Document-topic prior
    pub alpha: f64,
    /// Topic-word prior
    pub beta: f64,
    /// Number of Gibbs sweeps over the corpus
    pub iterations: usize,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LdaConfig {
    /// Configuration with a symmetric `1 / num_topics` document prior.
    pub fn new(num_topics: usize) -> Self {
        Self {
            num_topics,
            alpha: 1.0 / num_topics.max(1) as f64,
            beta: 0.01,
            iterations: 500,
            seed: None,
        }
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), LdaError> {
        if self.num_topics == 0 {
            return Err(LdaError::InvalidTopicCount);
        }
        if self.alpha.is_nan() || self.alpha <= 0.0 {
            return Err(LdaError::InvalidParameter("alpha must be positive".into()));
        }
        if self.beta.is_nan() || self.beta <= 0.0 {
            return Err(LdaError::InvalidParameter("beta must be positive".into()));
        }
        Ok(())
    }
}

/// A fitted LDA model.
#[derive(Debug, Clone)]
pub struct LdaModel {
    num_topics: usize,
    vocab_size: usize,
    /// p(word | topic), num_topics x vocab_size, rows sum to 1
    topic_term: Array2<f64>,
    /// p(topic | document), num_docs x num_topics, rows sum to 1
    doc_topic: Array2<f64>,
    /// Tokens assigned to each topic in the final sample
    topic_tokens: Array1<usize>,
    /// Corpus-wide count of each term
    term_frequency: Vec<usize>,
    /// Token count of each document
    doc_lengths: Vec<usize>,
    log_likelihood: f64,
}

impl LdaModel {
    /// Fit a model on `corpus`, whose term ids must be below `vocab_size`.
    pub fn fit(corpus: &Corpus, vocab_size: usize, config: &LdaConfig) -> Result<Self, LdaError> {
        config.validate()?;

        let k = config.num_topics;
        let v = vocab_size;

        // Expand bag-of-words into one entry per token occurrence
        let mut docs: Vec<Vec<usize>> = Vec::with_capacity(corpus.len());
        let mut term_frequency = vec![0usize; v];
        for bow in corpus {
            let mut words = Vec::new();
            for &(id, count) in bow {
                if id >= v {
                    return Err(LdaError::UnknownTerm { id, vocab_size: v });
                }
                term_frequency[id] += count;
                words.extend(std::iter::repeat_n(id, count));
            }
            docs.push(words);
        }

        let total_tokens: usize = docs.iter().map(|d| d.len()).sum();
        if total_tokens == 0 || v == 0 {
            return Err(LdaError::EmptyCorpus);
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut topic_word: Array2<usize> = Array2::zeros((k, v));
        let mut doc_topic: Array2<usize> = Array2::zeros((docs.len(), k));
        let mut topic_counts: Array1<usize> = Array1::zeros(k);

        // Random initial assignment
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(docs.len());
        for (d, words) in docs.iter().enumerate() {
            let mut z = Vec::with_capacity(words.len());
            for &w in words {
                let t = rng.random_range(0..k);
                z.push(t);
                topic_word[[t, w]] += 1;
                doc_topic[[d, t]] += 1;
                topic_counts[t] += 1;
            }
            assignments.push(z);
        }

        let alpha = config.alpha;
        let beta = config.beta;
        let beta_sum = beta * v as f64;
        let mut probs = vec![0.0f64; k];

        for iter in 0..config.iterations {
            for (d, words) in docs.iter().enumerate() {
                for (i, &w) in words.iter().enumerate() {
                    let old = assignments[d][i];
                    topic_word[[old, w]] -= 1;
                    doc_topic[[d, old]] -= 1;
                    topic_counts[old] -= 1;

                    // p(t | rest) ~ (n_dt + alpha) * (n_tw + beta) / (n_t + V*beta)
                    let mut total = 0.0;
                    for t in 0..k {
                        let p = (doc_topic[[d, t]] as f64 + alpha)
                            * (topic_word[[t, w]] as f64 + beta)
                            / (topic_counts[t] as f64 + beta_sum);
                        total += p;
                        probs[t] = total;
                    }

                    let threshold = rng.random::<f64>() * total;
                    let new = probs.iter().position(|&c| c >= threshold).unwrap_or(k - 1);

                    assignments[d][i] = new;
                    topic_word[[new, w]] += 1;
                    doc_topic[[d, new]] += 1;
                    topic_counts[new] += 1;
                }
            }

            if iter % 100 == 0 {
                debug!(iteration = iter, "Gibbs sweep");
            }
        }

        let topic_term = Array2::from_shape_fn((k, v), |(t, w)| {
            (topic_word[[t, w]] as f64 + beta) / (topic_counts[t] as f64 + beta_sum)
        });

        let k_alpha = k as f64 * alpha;
        let doc_lengths: Vec<usize> = docs.iter().map(|d| d.len()).collect();
        let theta = Array2::from_shape_fn((docs.len(), k), |(d, t)| {
            (doc_topic[[d, t]] as f64 + alpha) / (doc_lengths[d] as f64 + k_alpha)
        });

        let mut model = Self {
            num_topics: k,
            vocab_size: v,
            topic_term,
            doc_topic: theta,
            topic_tokens: topic_counts,
            term_frequency,
            doc_lengths,
            log_likelihood: 0.0,
        };
        model.log_likelihood = model.corpus_log_likelihood(&docs);

        info!(
            topics = k,
            vocabulary = v,
            documents = docs.len(),
            tokens = total_tokens,
            perplexity = model.perplexity(),
            "Fitted LDA model"
        );

        Ok(model)
    }

    /// Sum over all tokens of ln sum_t p(t|d) p(w|t).
    fn corpus_log_likelihood(&self, docs: &[Vec<usize>]) -> f64 {
        let mut ll = 0.0;
        for (d, words) in docs.iter().enumerate() {
            for &w in words {
                let p = self.doc_topic.row(d).dot(&self.topic_term.column(w));
                ll += p.ln();
            }
        }
        ll
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// p(word | topic), one row per topic.
    pub fn topic_term(&self) -> &Array2<f64> {
        &self.topic_term
    }

    /// p(topic | document), one row per document.
    pub fn doc_topic(&self) -> &Array2<f64> {
        &self.doc_topic
    }

    /// Number of tokens assigned to each topic.
    pub fn topic_tokens(&self) -> &Array1<usize> {
        &self.topic_tokens
    }

    pub fn term_frequency(&self) -> &[usize] {
        &self.term_frequency
    }

    pub fn doc_lengths(&self) -> &[usize] {
        &self.doc_lengths
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// exp(-log_likelihood / tokens); lower is better.
    pub fn perplexity(&self) -> f64 {
        let tokens: usize = self.doc_lengths.iter().sum();
        if tokens == 0 {
            return f64::INFINITY;
        }
        (-self.log_likelihood / tokens as f64).exp()
    }

    /// The `n` most probable terms of a topic as (term id, p(w|t)).
    pub fn top_terms(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics {
            return Vec::new();
        }
        let row = self.topic_term.row(topic);
        let mut terms: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        terms.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        terms.truncate(n);
        terms
    }
}
