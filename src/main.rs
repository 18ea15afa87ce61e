use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use walltopics::config::Config;
use walltopics::pipeline::analyze::{analyze, AnalyzeOptions};
use walltopics::pipeline::fetch::{fetch_walls, SavedWall};
use walltopics::text::normalize::Normalizer;
use walltopics::topics::dictionary::DocumentMode;
use walltopics::topics::lda::LdaConfig;
use walltopics::vk::client::VkClient;
use walltopics::vk::rate_limit::RateLimiter;
use walltopics::vk::wall::{get_wall, WallQuery};

/// Walls used by the demo run.
const DEMO_WALLS: &[&str] = &["itmoru", "lentach", "dotatoday"];

/// Walltopics: topic modeling for VK wall posts.
///
/// Fetches posts from one or more walls, normalizes the text, fits an LDA
/// topic model, and renders an interactive HTML map of the topics.
#[derive(Parser)]
#[command(name = "walltopics", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a wall and save its posts as JSON
    Fetch {
        /// Short address of the wall (e.g. itmoru)
        #[arg(long, conflicts_with = "owner_id", required_unless_present = "owner_id")]
        domain: Option<String>,

        /// Numeric owner id (negative for communities)
        #[arg(long, allow_hyphen_values = true)]
        owner_id: Option<String>,

        /// Number of posts to fetch
        #[arg(long, default_value = "100")]
        count: usize,

        /// Number of posts to skip from the top of the wall
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Which posts to return: owner, others, all, postponed, suggests
        #[arg(long, default_value = "owner")]
        filter: String,

        /// Write posts to this JSON file instead of printing a summary
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build and render a topic model from walls
    Analyze {
        /// Wall to fetch (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,

        /// Wall saved by `fetch --out` (repeatable)
        #[arg(long = "input")]
        inputs: Vec<PathBuf>,

        /// Posts per wall
        #[arg(long, default_value = "3000")]
        count: usize,

        /// Number of topics
        #[arg(long, default_value = "3")]
        topics: usize,

        /// Gibbs sampling sweeps
        #[arg(long, default_value = "500")]
        iterations: usize,

        /// Random seed for a reproducible model
        #[arg(long)]
        seed: Option<u64>,

        /// How posts are grouped into model documents
        #[arg(long, value_enum, default_value = "combined")]
        documents: Documents,

        /// Extra word to ignore (repeatable)
        #[arg(long = "stop-word")]
        stop_words: Vec<String>,

        /// HTML output path (default: WALLTOPICS_OUTPUT or LDA.html)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Open the visualization in a browser when done
        #[arg(long)]
        open: bool,
    },

    /// Model itmoru, lentach and dotatoday (3000 posts each, 3 topics)
    Demo {
        /// Open the visualization in a browser when done
        #[arg(long)]
        open: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Documents {
    Combined,
    PerWall,
    PerPost,
}

impl From<Documents> for DocumentMode {
    fn from(d: Documents) -> Self {
        match d {
            Documents::Combined => DocumentMode::Combined,
            Documents::PerWall => DocumentMode::PerWall,
            Documents::PerPost => DocumentMode::PerPost,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("walltopics=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            domain,
            owner_id,
            count,
            offset,
            filter,
            out,
        } => {
            let config = Config::load()?;
            let client = VkClient::from_config(&config)?;
            let limiter = RateLimiter::vk_default();

            let mut query = match (domain, owner_id) {
                (Some(domain), _) => WallQuery::for_domain(&domain, count),
                (None, Some(owner_id)) => WallQuery::for_owner(&owner_id, count),
                (None, None) => anyhow::bail!("Pass --domain or --owner-id"),
            };
            query.offset = offset;
            query.filter = filter;
            query.v = client.version().to_string();

            println!("Fetching {} posts from @{}...", count, query.label());
            let posts = get_wall(&client, &limiter, &query).await?;

            walltopics::output::terminal::display_wall_summary(query.label(), &posts);

            if let Some(path) = out {
                SavedWall::new(query.label(), posts).save(&path)?;
                println!("\n{}", format!("Saved to: {}", path.display()).bold());
            }
        }

        Commands::Analyze {
            domains,
            inputs,
            count,
            topics,
            iterations,
            seed,
            documents,
            stop_words,
            output,
            open,
        } => {
            if domains.is_empty() && inputs.is_empty() {
                anyhow::bail!("Nothing to analyze. Pass --domain and/or --input.");
            }

            let config = Config::load()?;
            let mut walls = Vec::new();

            for path in &inputs {
                let wall = SavedWall::load(path)?;
                println!("Loaded {} posts of @{} from {}", wall.posts.len(), wall.wall, path.display());
                walls.push(wall);
            }

            if !domains.is_empty() {
                let client = VkClient::from_config(&config)?;
                let limiter = RateLimiter::vk_default();
                let queries = wall_queries(&domains, count, client.version());
                println!("Fetching {} walls...", queries.len());
                walls.extend(fetch_walls(&client, &limiter, &queries).await?);
            }

            let mut lda = LdaConfig::new(topics).iterations(iterations);
            if let Some(seed) = seed {
                lda = lda.seed(seed);
            }
            let options = AnalyzeOptions {
                posts_per_wall: count,
                documents: documents.into(),
                lda,
                ..Default::default()
            };

            let path = output.unwrap_or_else(|| config.output_path.clone());
            let normalizer = Normalizer::with_extra_stop_words(&stop_words);
            run_analysis(&normalizer, &walls, &options, &path, open)?;
        }

        Commands::Demo { open } => {
            let config = Config::load()?;
            let client = VkClient::from_config(&config)?;
            let limiter = RateLimiter::vk_default();

            let domains: Vec<String> = DEMO_WALLS.iter().map(|d| d.to_string()).collect();
            let options = AnalyzeOptions::default();
            let queries = wall_queries(&domains, options.posts_per_wall, client.version());

            println!("Fetching demo walls: {}...", DEMO_WALLS.join(", "));
            let walls = fetch_walls(&client, &limiter, &queries).await?;

            run_analysis(&Normalizer::default(), &walls, &options, &config.output_path, open)?;
        }
    }

    Ok(())
}

fn wall_queries(domains: &[String], count: usize, version: &str) -> Vec<WallQuery> {
    domains
        .iter()
        .map(|d| {
            let mut query = WallQuery::for_domain(d.trim_start_matches('@'), count);
            query.v = version.to_string();
            query
        })
        .collect()
}

fn run_analysis(
    normalizer: &Normalizer,
    walls: &[SavedWall],
    options: &AnalyzeOptions,
    path: &std::path::Path,
    open: bool,
) -> Result<()> {
    let total: usize = walls.iter().map(|w| w.posts.len()).sum();
    println!("Normalizing {} posts from {} walls...", total, walls.len());

    let vis = analyze(normalizer, walls, options)?;

    walltopics::output::terminal::display_topics(&vis);

    let written = walltopics::output::html::save_html(&vis, path)?;
    info!(path = %written.display(), "Visualization ready");
    println!(
        "\n{}",
        format!("Topic map saved to: {}", written.display()).bold()
    );

    if open {
        walltopics::output::html::show(&written);
    }

    Ok(())
}
