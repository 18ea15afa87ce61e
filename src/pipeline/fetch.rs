// Wall collection: from the API or from files saved by `walltopics fetch`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::vk::client::ExecuteApi;
use crate::vk::rate_limit::RateLimiter;
use crate::vk::wall::{get_wall, WallPost, WallQuery};

/// A fetched wall as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedWall {
    /// Domain or owner id the posts came from
    pub wall: String,
    /// When the wall was fetched
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub posts: Vec<WallPost>,
}

impl SavedWall {
    pub fn new(wall: &str, posts: Vec<WallPost>) -> Self {
        Self {
            wall: wall.to_string(),
            fetched_at: chrono::Utc::now(),
            posts,
        }
    }

    /// Write the wall as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize wall")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), posts = self.posts.len(), "Saved wall");
        Ok(())
    }

    /// Read a wall saved by [`SavedWall::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse saved wall {}", path.display()))
    }
}

/// Fetch several walls one after another through a shared limiter.
///
/// A wall that fails to fetch is skipped with a warning so one private or
/// deleted community doesn't sink the whole run. Fails only if every wall
/// fails.
pub async fn fetch_walls(
    api: &dyn ExecuteApi,
    limiter: &RateLimiter,
    queries: &[WallQuery],
) -> Result<Vec<SavedWall>> {
    let mut walls = Vec::with_capacity(queries.len());
    let mut last_error = None;

    for query in queries {
        match get_wall(api, limiter, query).await {
            Ok(posts) => walls.push(SavedWall::new(query.label(), posts)),
            Err(e) => {
                warn!(wall = query.label(), error = %e, "Failed to fetch wall, skipping");
                last_error = Some(e);
            }
        }
    }

    if walls.is_empty() {
        if let Some(e) = last_error {
            return Err(e.context("No walls could be fetched"));
        }
    }

    Ok(walls)
}
