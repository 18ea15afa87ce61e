// Interactive HTML topic map.
//
// Produces one self-contained page: the visualization data is embedded as
// JSON and drawn with inline SVG by a small script. The stylesheet and
// script live in `assets/` and are compiled into the binary.
//
// Left panel: topics as circles at their MDS coordinates, area proportional
// to prevalence. Right panel: bar chart of the most relevant terms for the selected topic (or
// the most salient terms overall), re-ranked live by the lambda slider.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::topics::prepare::Visualization;

/// Render the visualization as a complete HTML document.
pub fn render(vis: &Visualization) -> Result<String> {
    let data = serde_json::to_string(vis).context("Failed to serialize visualization data")?;
    // Keep the JSON from closing the script element early
    let data = data.replace("</", "<\\/");

    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"ru\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\">")?;
    writeln!(
        html,
        "<title>Topic model: {} topics, {} tokens</title>",
        vis.topics.len(),
        vis.num_tokens
    )?;
    writeln!(html, "<style>{STYLE}</style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<header>")?;
    writeln!(html, "  <h1>Topic model</h1>")?;
    writeln!(
        html,
        "  <p class=\"meta\">{} topics &middot; {} documents &middot; {} tokens &middot; {} terms &middot; perplexity {:.1}</p>",
        vis.topics.len(),
        vis.num_documents,
        vis.num_tokens,
        vis.vocab_size,
        vis.perplexity
    )?;
    writeln!(html, "  <div class=\"controls\">")?;
    writeln!(
        html,
        "    <button id=\"prev\">&larr;</button> <span id=\"current\">All topics</span> <button id=\"next\">&rarr;</button> <button id=\"clear\">Clear</button>"
    )?;
    writeln!(
        html,
        "    <label>&lambda; = <span id=\"lambda-value\">{:.2}</span> <input id=\"lambda\" type=\"range\" min=\"0\" max=\"1\" step=\"0.01\" value=\"{:.2}\"></label>",
        vis.lambda, vis.lambda
    )?;
    writeln!(html, "  </div>")?;
    writeln!(html, "</header>")?;
    writeln!(html, "<main>")?;
    writeln!(
        html,
        "  <section><h2>Intertopic distance map</h2><svg id=\"map\" viewBox=\"0 0 520 520\"></svg></section>"
    )?;
    writeln!(
        html,
        "  <section><h2 id=\"bars-title\">Most salient terms</h2><svg id=\"bars\" viewBox=\"0 0 560 640\"></svg></section>"
    )?;
    writeln!(html, "</main>")?;
    writeln!(html, "<script>const DATA = {data};</script>")?;
    writeln!(html, "<script>{SCRIPT}</script>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;

    Ok(html)
}

/// Write the page to `path`, creating parent directories. Returns the path.
pub fn save_html(vis: &Visualization, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let html = render(vis)?;
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Saved topic visualization");

    Ok(path.to_path_buf())
}

/// Open the page in the default browser. Failure only logs a warning.
pub fn show(path: &Path) {
    // Wait on the launcher so it is reaped; it exits once the browser has the file
    match browser_command(path).status() {
        Ok(status) if status.success() => {
            info!(path = %path.display(), "Opened visualization in browser")
        }
        Ok(status) => warn!(%status, "Browser launcher failed; open the file manually"),
        Err(e) => warn!(error = %e, "Could not open a browser; open the file manually"),
    }
}

/// The platform command that opens `path` in a browser.
fn browser_command(path: &Path) -> Command {
    if cfg!(target_os = "windows") {
        // `start` rejects the `\\?\` form canonicalize produces
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        return command;
    }

    let target = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    let mut command = Command::new(if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    });
    command.arg(target);
    command
}

// Page assets, embedded at compile time
const STYLE: &str = include_str!("assets/topics.css");
const SCRIPT: &str = include_str!("assets/topics.js");
