// Visualization data: everything the HTML page needs, computed up front.
//
// For each topic: its share of the corpus, a 2-D position (topics with
// similar word distributions sit close together), and the candidate terms
// for the relevance-ranked bar chart. Positions come from Jensen-Shannon
// divergence between topic-term distributions, projected to 2-D with
// classical multidimensional scaling.
//
// Relevance of term w for topic t:
//   lambda * ln p(w|t) + (1 - lambda) * ln(p(w|t) / p(w))
// lambda = 1 ranks by in-topic probability, lambda = 0 by lift.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use serde::Serialize;

use super::dictionary::Dictionary;
use super::lda::LdaModel;

/// Default relevance weight.
pub const DEFAULT_LAMBDA: f64 = 0.6;

/// Terms shown per topic in the bar chart.
pub const TERMS_PER_TOPIC: usize = 30;

/// Step of the lambda grid used to collect candidate terms.
const LAMBDA_STEP: f64 = 0.01;

/// One term's statistics within a topic.
#[derive(Debug, Clone, Serialize)]
pub struct TermInfo {
    pub term: String,
    /// p(w | t)
    pub prob: f64,
    /// p(w) over the whole corpus
    pub marginal: f64,
    /// Estimated count of the term inside the topic
    pub freq: f64,
    /// Count of the term in the corpus
    pub total: usize,
}

impl TermInfo {
    pub fn relevance(&self, lambda: f64) -> f64 {
        relevance(self.prob, self.marginal, lambda)
    }
}

/// A term ranked by saliency for the overview chart.
#[derive(Debug, Clone, Serialize)]
pub struct SalientTerm {
    pub term: String,
    pub saliency: f64,
    pub total: usize,
    /// Documents containing the term
    pub documents: usize,
}

/// A topic ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    /// 1-based rank by prevalence
    pub rank: usize,
    /// Index of the topic inside the model
    pub model_index: usize,
    /// Share of corpus tokens (0.0 to 1.0)
    pub prevalence: f64,
    pub x: f64,
    pub y: f64,
    /// Candidate terms, ordered by relevance at the default lambda
    pub terms: Vec<TermInfo>,
}

impl TopicSummary {
    /// The `n` most relevant terms at `lambda`.
    pub fn top_relevant(&self, lambda: f64, n: usize) -> Vec<&TermInfo> {
        let mut terms: Vec<&TermInfo> = self.terms.iter().collect();
        terms.sort_by(|a, b| {
            b.relevance(lambda)
                .partial_cmp(&a.relevance(lambda))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        terms.truncate(n);
        terms
    }
}

/// Complete data behind the topic visualization.
#[derive(Debug, Clone, Serialize)]
pub struct Visualization {
    /// Topics ordered by prevalence, largest first
    pub topics: Vec<TopicSummary>,
    /// Most salient terms over all topics
    pub salient: Vec<SalientTerm>,
    pub lambda: f64,
    pub terms_per_topic: usize,
    pub num_documents: usize,
    pub num_tokens: usize,
    pub vocab_size: usize,
    pub perplexity: f64,
}

pub fn relevance(prob: f64, marginal: f64, lambda: f64) -> f64 {
    if prob <= 0.0 || marginal <= 0.0 {
        return f64::NEG_INFINITY;
    }
    lambda * prob.ln() + (1.0 - lambda) * (prob / marginal).ln()
}

/// Build the visualization data for a fitted model.
pub fn prepare(model: &LdaModel, dictionary: &Dictionary, lambda: f64) -> Visualization {
    let k = model.num_topics();
    let v = model.vocab_size();
    let phi = model.topic_term();
    let tf = model.term_frequency();
    let num_tokens: usize = tf.iter().sum();
    let lambda = lambda.clamp(0.0, 1.0);

    // p(w) from corpus counts
    let marginal: Vec<f64> = tf
        .iter()
        .map(|&c| c as f64 / num_tokens.max(1) as f64)
        .collect();

    // p(t) weighted by document length
    let lengths = model.doc_lengths();
    let weights = Array1::from_iter(lengths.iter().map(|&len| len as f64));
    let mut prevalence = model.doc_topic().t().dot(&weights);
    let prevalence_sum = prevalence.sum();
    if prevalence_sum > 0.0 {
        prevalence /= prevalence_sum;
    }

    let coords = mds_2d(&js_distance_matrix(phi));

    let lambdas: Vec<f64> = (0..=((1.0 / LAMBDA_STEP).round() as usize))
        .map(|i| i as f64 * LAMBDA_STEP)
        .collect();

    let mut topics: Vec<TopicSummary> = (0..k)
        .map(|t| {
            // Union of the top terms over the lambda grid, so the page can
            // re-rank for any slider position without the full matrix.
            let mut candidates: BTreeSet<usize> = BTreeSet::new();
            for &l in &lambdas {
                candidates.extend(top_by(v, TERMS_PER_TOPIC, |w| {
                    relevance(phi[[t, w]], marginal[w], l)
                }));
            }

            let topic_tokens = prevalence[t] * num_tokens as f64;
            let mut terms: Vec<TermInfo> = candidates
                .into_iter()
                .filter(|&w| tf[w] > 0)
                .map(|w| TermInfo {
                    term: dictionary.token(w).unwrap_or_default().to_string(),
                    prob: phi[[t, w]],
                    marginal: marginal[w],
                    freq: (phi[[t, w]] * topic_tokens).min(tf[w] as f64),
                    total: tf[w],
                })
                .collect();
            terms.sort_by(|a, b| {
                b.relevance(lambda)
                    .partial_cmp(&a.relevance(lambda))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            TopicSummary {
                rank: 0,
                model_index: t,
                prevalence: prevalence[t],
                x: coords[t].0,
                y: coords[t].1,
                terms,
            }
        })
        .collect();

    topics.sort_by(|a, b| {
        b.prevalence
            .partial_cmp(&a.prevalence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, topic) in topics.iter_mut().enumerate() {
        topic.rank = i + 1;
    }

    let salient = salient_terms(model, dictionary, &prevalence, &marginal, TERMS_PER_TOPIC);

    Visualization {
        topics,
        salient,
        lambda,
        terms_per_topic: TERMS_PER_TOPIC,
        num_documents: lengths.len(),
        num_tokens,
        vocab_size: v,
        perplexity: model.perplexity(),
    }
}

/// Indices of the `n` largest scores among `0..len`.
fn top_by<F: Fn(usize) -> f64>(len: usize, n: usize, score: F) -> Vec<usize> {
    let descending =
        |a: &(usize, f64), b: &(usize, f64)| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal);

    let mut scored: Vec<(usize, f64)> = (0..len).map(|i| (i, score(i))).collect();
    if n == 0 {
        return Vec::new();
    }
    if n < scored.len() {
        scored.select_nth_unstable_by(n - 1, descending);
        scored.truncate(n);
    }
    scored.sort_by(descending);
    scored.into_iter().map(|(i, _)| i).collect()
}

/// Saliency(w) = p(w) * KL(p(t|w) || p(t)).
fn salient_terms(
    model: &LdaModel,
    dictionary: &Dictionary,
    prevalence: &Array1<f64>,
    marginal: &[f64],
    n: usize,
) -> Vec<SalientTerm> {
    let phi = model.topic_term();
    let tf = model.term_frequency();

    let saliency = |w: usize| -> f64 {
        let joint = &phi.column(w) * prevalence;
        let norm = joint.sum();
        if norm <= 0.0 {
            return 0.0;
        }
        let distinctiveness: f64 = joint
            .iter()
            .zip(prevalence)
            .filter(|(&j, &p)| j > 0.0 && p > 0.0)
            .map(|(&j, &p)| {
                let cond = j / norm;
                cond * (cond / p).ln()
            })
            .sum();
        marginal[w] * distinctiveness
    };

    top_by(model.vocab_size(), n, &saliency)
        .into_iter()
        .filter(|&w| tf[w] > 0)
        .map(|w| SalientTerm {
            term: dictionary.token(w).unwrap_or_default().to_string(),
            saliency: saliency(w),
            total: tf[w],
            documents: dictionary.doc_freq(w),
        })
        .collect()
}

/// Jensen-Shannon divergence (natural log) between two distributions.
pub fn jensen_shannon(p: ArrayView1<f64>, q: ArrayView1<f64>) -> f64 {
    let m = (&p + &q) * 0.5;
    let kl = |a: ArrayView1<f64>| -> f64 {
        Zip::from(&a)
            .and(&m)
            .fold(0.0, |acc, &x, &y| if x > 0.0 && y > 0.0 { acc + x * (x / y).ln() } else { acc })
    };
    0.5 * kl(p) + 0.5 * kl(q)
}

/// Pairwise Jensen-Shannon divergence between rows.
pub fn js_distance_matrix(rows: &Array2<f64>) -> Array2<f64> {
    let n = rows.nrows();
    let mut dist = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = jensen_shannon(rows.row(i), rows.row(j));
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

/// Classical MDS (principal coordinate analysis) down to two dimensions.
///
/// Topics are few, so a Jacobi eigen-decomposition of the double-centered
/// matrix is plenty.
pub fn mds_2d(dist: &Array2<f64>) -> Vec<(f64, f64)> {
    let n = dist.nrows();
    if n <= 1 {
        return vec![(0.0, 0.0); n];
    }

    // B = -1/2 * J D^2 J
    let sq = dist.mapv(|d| d * d);
    let row_mean = sq.sum_axis(Axis(1)) / n as f64;
    let grand_mean = row_mean.sum() / n as f64;
    let b = Array2::from_shape_fn((n, n), |(i, j)| {
        -0.5 * (sq[[i, j]] - row_mean[i] - row_mean[j] + grand_mean)
    });

    let (values, vectors) = jacobi_eigen(b);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &c| {
        values[c]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let axis = |k: usize, i: usize| -> f64 {
        order
            .get(k)
            .map(|&e| vectors[[i, e]] * values[e].max(0.0).sqrt())
            .unwrap_or(0.0)
    };

    (0..n).map(|i| (axis(0, i), axis(1, i))).collect()
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns (eigenvalues, eigenvectors as columns).
fn jacobi_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::eye(n);

    for _sweep in 0..100 {
        let off = a.iter().map(|x| x * x).sum::<f64>() - a.diag().iter().map(|x| x * x).sum::<f64>();
        if off < 1e-22 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                rotate(&mut a, Axis(1), p, q, c, s);
                rotate(&mut a, Axis(0), p, q, c, s);
                rotate(&mut v, Axis(1), p, q, c, s);
            }
        }
    }

    (a.diag().to_owned(), v)
}

/// Apply a Givens rotation to lanes `p` and `q` along `axis`.
fn rotate(m: &mut Array2<f64>, axis: Axis, p: usize, q: usize, c: f64, s: f64) {
    let lane_p = m.index_axis(axis, p).to_owned();
    let lane_q = m.index_axis(axis, q).to_owned();
    m.index_axis_mut(axis, p).assign(&(&lane_p * c - &lane_q * s));
    m.index_axis_mut(axis, q).assign(&(&lane_p * s + &lane_q * c));
}
