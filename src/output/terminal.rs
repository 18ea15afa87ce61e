// Colored terminal output for fetched walls and fitted topics.

use colored::Colorize;

use crate::topics::prepare::Visualization;
use crate::vk::wall::WallPost;

/// Terms listed under each topic in the terminal.
const TERMS_SHOWN: usize = 10;

/// Display the topics as a bar chart with their most relevant terms.
pub fn display_topics(vis: &Visualization) {
    println!(
        "\n{}",
        format!(
            "=== {} topics ({} documents, {} tokens, {} terms) ===",
            vis.topics.len(),
            vis.num_documents,
            vis.num_tokens,
            vis.vocab_size
        )
        .bold()
    );
    println!();

    let bar_width: usize = 20;

    for topic in &vis.topics {
        let filled = (topic.prevalence * bar_width as f64).round() as usize;
        let empty = bar_width.saturating_sub(filled);
        let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(empty));

        let colored_bar = if topic.prevalence >= 0.25 {
            bar.bright_green()
        } else if topic.prevalence >= 0.10 {
            bar.bright_yellow()
        } else {
            bar.bright_blue()
        };

        println!(
            "  {:>2}. {:<10} {} {:.2}",
            topic.rank,
            format!("Topic {}", topic.rank).bold(),
            colored_bar,
            topic.prevalence
        );

        let terms: Vec<&str> = topic
            .top_relevant(vis.lambda, TERMS_SHOWN)
            .into_iter()
            .map(|t| t.term.as_str())
            .collect();
        println!("      Terms: {}", terms.join(", ").dimmed());
        println!();
    }

    if !vis.salient.is_empty() {
        let salient: Vec<String> = vis
            .salient
            .iter()
            .take(TERMS_SHOWN)
            .map(|t| format!("{} ({}/{} docs)", t.term, t.documents, vis.num_documents))
            .collect();
        println!("  {} {}", "Most salient:".bold(), salient.join(", "));
        println!();
    }

    println!(
        "  {}",
        format!("Perplexity: {:.1}  (lambda = {:.2})", vis.perplexity, vis.lambda).dimmed()
    );
}

/// Display a short summary of a fetched wall.
pub fn display_wall_summary(label: &str, posts: &[WallPost]) {
    println!(
        "\n{}",
        format!("=== @{label} ({} posts) ===", posts.len()).bold()
    );

    if posts.is_empty() {
        println!("  No posts returned.");
        return;
    }

    let dates: Vec<_> = posts.iter().filter_map(|p| p.published_at()).collect();
    if let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) {
        println!(
            "  Range: {} .. {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }

    let with_text = posts.iter().filter(|p| !p.text.trim().is_empty()).count();
    let likes: i64 = posts.iter().map(|p| p.likes.count).sum();
    println!("  With text: {with_text}  |  Total likes: {likes}");

    for post in posts.iter().filter(|p| !p.text.trim().is_empty()).take(3) {
        let preview = super::truncate_chars(&post.text.replace('\n', " "), 100);
        println!("    - {}", preview.dimmed());
    }
}
