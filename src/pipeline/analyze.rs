// Topic analysis: normalized walls in, visualization data out.

use anyhow::{Context, Result};
use tracing::info;

use super::fetch::SavedWall;
use crate::text::normalize::Normalizer;
use crate::topics::dictionary::{group_documents, Dictionary, DocumentMode};
use crate::topics::lda::{LdaConfig, LdaModel};
use crate::topics::prepare::{prepare, Visualization};

/// Options for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Posts taken from the start of each wall
    pub posts_per_wall: usize,
    pub documents: DocumentMode,
    pub lda: LdaConfig,
    pub lambda: f64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            posts_per_wall: 3000,
            documents: DocumentMode::Combined,
            lda: LdaConfig::new(3),
            lambda: crate::topics::prepare::DEFAULT_LAMBDA,
        }
    }
}

/// Normalize every post of every wall (first `posts_per_wall` posts each).
///
/// Returns `walls[w][p]` = tokens of post `p` on wall `w`. Joining a wall's
/// post token lists gives the same stream as normalizing its concatenated
/// text.
pub fn normalize_walls(
    normalizer: &Normalizer,
    walls: &[SavedWall],
    posts_per_wall: usize,
) -> Vec<Vec<Vec<String>>> {
    walls
        .iter()
        .map(|wall| {
            let tokens: Vec<Vec<String>> = wall
                .posts
                .iter()
                .take(posts_per_wall)
                .map(|post| normalizer.prep_text(std::slice::from_ref(post), 1))
                .collect();
            info!(
                wall = wall.wall.as_str(),
                posts = tokens.len(),
                tokens = tokens.iter().map(|t| t.len()).sum::<usize>(),
                "Normalized wall"
            );
            tokens
        })
        .collect()
}

/// Run the whole model side: documents, dictionary, LDA, visualization data.
pub fn analyze(
    normalizer: &Normalizer,
    walls: &[SavedWall],
    options: &AnalyzeOptions,
) -> Result<Visualization> {
    let normalized = normalize_walls(normalizer, walls, options.posts_per_wall);
    let documents = group_documents(normalized, options.documents);
    if documents.is_empty() {
        anyhow::bail!("No words left after normalization; nothing to model");
    }

    let dictionary = Dictionary::from_documents(&documents);
    let corpus = dictionary.corpus(&documents);

    info!(
        documents = dictionary.num_docs(),
        vocabulary = dictionary.len(),
        topics = options.lda.num_topics,
        "Fitting topic model"
    );

    let model = LdaModel::fit(&corpus, dictionary.len(), &options.lda)
        .context("Failed to fit topic model")?;

    Ok(prepare(&model, &dictionary, options.lambda))
}
