// Wall fetching: batched `wall.get` calls through `execute`.
//
// `wall.get` returns at most 100 posts per call, and `execute` runs at most
// 25 calls per request. So one request covers up to 2500 posts, and a wall
// of N posts needs ceil(N / 2500) requests. Each request is throttled by the
// shared rate limiter.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::client::{ExecuteApi, DEFAULT_API_VERSION};
use super::rate_limit::RateLimiter;

/// Maximum posts a single `wall.get` call returns.
pub const POSTS_PER_CALL: usize = 100;

/// Maximum API calls inside one `execute` script.
pub const CALLS_PER_EXECUTE: usize = 25;

/// Posts covered by one full `execute` batch.
pub const POSTS_PER_BATCH: usize = POSTS_PER_CALL * CALLS_PER_EXECUTE;

/// Parameters of a `wall.get` request.
///
/// Either `owner_id` or `domain` identifies the wall. `count` is the total
/// number of posts wanted; the fetcher splits it into calls of 100.
#[derive(Debug, Clone, Serialize)]
pub struct WallQuery {
    pub owner_id: String,
    pub domain: String,
    pub offset: usize,
    pub count: usize,
    pub filter: String,
    pub extended: u8,
    pub fields: String,
    pub v: String,
}

impl Default for WallQuery {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            domain: String::new(),
            offset: 0,
            count: 10,
            filter: "owner".to_string(),
            extended: 0,
            fields: String::new(),
            v: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl WallQuery {
    /// Query for a wall by its short address (e.g. "itmoru").
    pub fn for_domain(domain: &str, count: usize) -> Self {
        Self {
            domain: domain.to_string(),
            count,
            ..Default::default()
        }
    }

    /// Query for a wall by numeric owner id (negative for communities).
    pub fn for_owner(owner_id: &str, count: usize) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            count,
            ..Default::default()
        }
    }

    /// Human-readable name of the wall for logs.
    pub fn label(&self) -> &str {
        if self.domain.is_empty() {
            &self.owner_id
        } else {
            &self.domain
        }
    }
}

/// A counter object such as `{"count": 12}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counter {
    #[serde(default)]
    pub count: i64,
}

/// A wall post: just the fields needed for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallPost {
    pub id: i64,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub from_id: i64,
    /// Unix timestamp
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub likes: Counter,
    #[serde(default)]
    pub reposts: Counter,
    #[serde(default)]
    pub views: Counter,
}

impl WallPost {
    /// Publication time, if the timestamp is valid.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }
}

/// One `execute` request: `calls` sub-queries starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub offset: usize,
    pub count: usize,
}

impl Batch {
    /// Number of `wall.get` calls in this batch.
    pub fn calls(&self) -> usize {
        self.count.div_ceil(POSTS_PER_CALL)
    }

    /// (offset, count) of each `wall.get` call; the last one takes the remainder.
    pub fn call_ranges(&self) -> Vec<(usize, usize)> {
        (0..self.calls())
            .map(|i| {
                let start = i * POSTS_PER_CALL;
                (self.offset + start, (self.count - start).min(POSTS_PER_CALL))
            })
            .collect()
    }
}

/// Split `count` posts starting at `offset` into `execute` batches.
pub fn batch_plan(offset: usize, count: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut remaining = count;
    let mut offset = offset;

    while remaining > 0 {
        let size = remaining.min(POSTS_PER_BATCH);
        batches.push(Batch {
            offset,
            count: size,
        });
        remaining -= size;
        offset += size;
    }

    batches
}

/// The per-call parameter object embedded in the VKScript program.
#[derive(Serialize)]
struct CallParams<'a> {
    owner_id: &'a str,
    domain: &'a str,
    offset: usize,
    count: usize,
    filter: &'a str,
    extended: u8,
    fields: &'a str,
    v: &'a str,
}

/// Build the VKScript program for one batch:
/// `return [API.wall.get({...}), API.wall.get({...})];`
pub fn build_execute_code(query: &WallQuery, batch: Batch) -> Result<String> {
    let mut calls = Vec::with_capacity(batch.calls());
    for (offset, count) in batch.call_ranges() {
        let params = CallParams {
            owner_id: &query.owner_id,
            domain: &query.domain,
            offset,
            count,
            filter: &query.filter,
            extended: query.extended,
            fields: &query.fields,
            v: &query.v,
        };
        let json = serde_json::to_string(&params).context("Failed to encode wall.get params")?;
        calls.push(format!("API.wall.get({json})"));
    }

    Ok(format!("return [{}];", calls.join(", ")))
}

/// Posts gathered from one `execute` response.
#[derive(Debug, Default)]
pub struct BatchItems {
    pub posts: Vec<WallPost>,
    /// Sub-calls that came back as `false` and were skipped
    pub failed_calls: usize,
    /// A successful sub-call returned fewer posts than it asked for
    pub exhausted: bool,
}

/// Pull the posts out of one `execute` response array for `batch`.
///
/// A sub-call that failed shows up as `false` (its error is reported in
/// `execute_errors`); those are skipped and do not mark the wall as
/// exhausted. Only a successful short page does.
pub fn collect_items(response: &Value, batch: Batch) -> Result<BatchItems> {
    let results = response
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("execute response is not an array"))?;

    let ranges = batch.call_ranges();
    let mut out = BatchItems::default();
    for (i, result) in results.iter().enumerate() {
        let Some(items) = result.get("items") else {
            warn!(call = i, "wall.get sub-call returned no items, skipping");
            out.failed_calls += 1;
            continue;
        };
        let page: Vec<WallPost> = serde_json::from_value(items.clone())
            .with_context(|| format!("Failed to parse items of wall.get call {i}"))?;
        if let Some(&(_, requested)) = ranges.get(i) {
            if page.len() < requested {
                out.exhausted = true;
            }
        }
        out.posts.extend(page);
    }

    Ok(out)
}

/// Fetch `query.count` posts from a wall, batching and throttling requests.
///
/// Posts are returned in API order (newest first). Stops early once a
/// successful sub-call comes back short, which means the wall has no
/// more posts. Failed sub-calls leave a gap but do not end the fetch.
pub async fn get_wall(
    api: &dyn ExecuteApi,
    limiter: &RateLimiter,
    query: &WallQuery,
) -> Result<Vec<WallPost>> {
    let plan = batch_plan(query.offset, query.count);
    let mut wall = Vec::with_capacity(query.count);

    if plan.is_empty() {
        return Ok(wall);
    }

    let pb = ProgressBar::new(plan.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Fetching [{bar:30}] {pos}/{len} batches ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for batch in plan {
        limiter.acquire().await;

        let code = build_execute_code(query, batch)?;
        let response = api
            .execute(&code)
            .await
            .with_context(|| format!("Failed to fetch wall of {}", query.label()))?;
        let items = collect_items(&response, batch)?;

        debug!(
            offset = batch.offset,
            requested = batch.count,
            received = items.posts.len(),
            failed_calls = items.failed_calls,
            "Fetched batch for {}",
            query.label()
        );

        if items.failed_calls > 0 {
            warn!(
                wall = query.label(),
                offset = batch.offset,
                failed_calls = items.failed_calls,
                "Some wall.get calls failed; their posts are missing"
            );
        }

        wall.extend(items.posts);
        pb.inc(1);

        if items.exhausted {
            break;
        }
    }

    pb.finish_and_clear();

    info!(count = wall.len(), wall = query.label(), "Collected wall posts");

    Ok(wall)
}
