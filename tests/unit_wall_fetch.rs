// Unit tests for the batched wall fetch loop.
//
// A fake `ExecuteApi` plays the server: it parses each `API.wall.get({...})`
// call out of the VKScript program and answers with synthetic posts, so the
// batching, ordering, early stop, and error paths run without network access.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{Duration, Instant};

use walltopics::pipeline::fetch::{fetch_walls, SavedWall};
use walltopics::vk::client::ExecuteApi;
use walltopics::vk::rate_limit::RateLimiter;
use walltopics::vk::wall::{get_wall, WallQuery};

/// Serves a wall of `size` posts with ids 0..size (newest first).
struct FakeWall {
    size: usize,
    codes: Mutex<Vec<String>>,
    fail_domain: Option<String>,
    /// Sub-call of the first request that comes back as `false`
    false_call: Option<usize>,
}

impl FakeWall {
    fn new(size: usize) -> Self {
        Self {
            size,
            codes: Mutex::new(Vec::new()),
            fail_domain: None,
            false_call: None,
        }
    }

    fn requests(&self) -> usize {
        self.codes.lock().unwrap().len()
    }
}

/// Pull the JSON parameter objects out of a `return [API.wall.get(...), ...];` program.
fn parse_calls(code: &str) -> Vec<Value> {
    code.split("API.wall.get(")
        .skip(1)
        .map(|chunk| {
            let end = chunk.find("})").expect("call closes") + 1;
            serde_json::from_str(&chunk[..end]).expect("call params are JSON")
        })
        .collect()
}

#[async_trait]
impl ExecuteApi for FakeWall {
    async fn execute(&self, code: &str) -> Result<Value> {
        let request = {
            let mut codes = self.codes.lock().unwrap();
            codes.push(code.to_string());
            codes.len() - 1
        };

        let calls = parse_calls(code);
        if let Some(domain) = &self.fail_domain {
            if calls.iter().any(|c| c["domain"] == json!(domain)) {
                anyhow::bail!("VK execute failed with error 15: Access denied");
            }
        }

        let results: Vec<Value> = calls
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if request == 0 && self.false_call == Some(i) {
                    return Value::Bool(false);
                }
                let offset = c["offset"].as_u64().unwrap() as usize;
                let count = c["count"].as_u64().unwrap() as usize;
                let items: Vec<Value> = (offset..(offset + count).min(self.size))
                    .map(|id| json!({"id": id, "text": format!("post {id}")}))
                    .collect();
                json!({"count": self.size, "items": items})
            })
            .collect();
        Ok(Value::Array(results))
    }
}

fn fast_limiter() -> RateLimiter {
    RateLimiter::new(1000, Duration::from_secs(1), Duration::ZERO)
}

#[tokio::test]
async fn fetches_3000_posts_in_two_batches() {
    let api = FakeWall::new(10_000);
    let query = WallQuery::for_domain("itmoru", 3000);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    assert_eq!(posts.len(), 3000);
    assert_eq!(api.requests(), 2);

    let codes = api.codes.lock().unwrap();
    assert_eq!(parse_calls(&codes[0]).len(), 25);
    assert_eq!(parse_calls(&codes[1]).len(), 5);
    assert_eq!(parse_calls(&codes[1])[0]["offset"], json!(2500));
}

#[tokio::test]
async fn posts_come_back_in_order_without_duplicates() {
    let api = FakeWall::new(10_000);
    let query = WallQuery::for_domain("lentach", 2750);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let expected: Vec<i64> = (0..2750).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn respects_offset() {
    let api = FakeWall::new(1000);
    let mut query = WallQuery::for_domain("dotatoday", 50);
    query.offset = 120;

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    assert_eq!(posts.len(), 50);
    assert_eq!(posts[0].id, 120);
    assert_eq!(posts[49].id, 169);
}

#[tokio::test]
async fn count_below_one_call_still_fetches() {
    let api = FakeWall::new(1000);
    let query = WallQuery::for_domain("itmoru", 42);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    assert_eq!(posts.len(), 42);
    let codes = api.codes.lock().unwrap();
    let calls = parse_calls(&codes[0]);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["count"], json!(42));
}

#[tokio::test]
async fn zero_count_makes_no_request() {
    let api = FakeWall::new(1000);
    let query = WallQuery::for_domain("itmoru", 0);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    assert!(posts.is_empty());
    assert_eq!(api.requests(), 0);
}

#[tokio::test]
async fn stops_when_wall_is_exhausted() {
    let api = FakeWall::new(2600);
    let query = WallQuery::for_domain("itmoru", 10_000);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    assert_eq!(posts.len(), 2600);
    // Batch 2 came back short, so batches 3 and 4 are never sent
    assert_eq!(api.requests(), 2);
}

#[tokio::test]
async fn failed_sub_call_does_not_end_the_fetch() {
    let mut api = FakeWall::new(10_000);
    api.false_call = Some(3);
    let query = WallQuery::for_domain("itmoru", 7500);

    let posts = get_wall(&api, &fast_limiter(), &query).await.unwrap();

    // Batches 2 and 3 are still requested; only the failed page is missing
    assert_eq!(api.requests(), 3);
    assert_eq!(posts.len(), 7400);
    assert!(posts.iter().all(|p| !(300..400).contains(&p.id)));
    assert_eq!(posts.last().map(|p| p.id), Some(7499));
}

#[tokio::test]
async fn api_error_propagates_with_wall_name() {
    let mut api = FakeWall::new(100);
    api.fail_domain = Some("closed".to_string());
    let query = WallQuery::for_domain("closed", 10);

    let err = get_wall(&api, &fast_limiter(), &query).await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("closed"), "got: {chain}");
    assert!(chain.contains("Access denied"), "got: {chain}");
}

#[tokio::test]
async fn fourth_request_waits_for_the_window() {
    let api = FakeWall::new(20_000);
    let query = WallQuery::for_domain("itmoru", 4 * 2500);
    let limiter = RateLimiter::vk_default();

    let start = Instant::now();
    let posts = get_wall(&api, &limiter, &query).await.unwrap();

    assert_eq!(posts.len(), 10_000);
    assert_eq!(api.requests(), 4);
    assert!(
        start.elapsed() >= Duration::from_millis(950),
        "4 requests at 3/s must take about a second, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn fetch_walls_skips_failing_wall() {
    let mut api = FakeWall::new(300);
    api.fail_domain = Some("private".to_string());
    let queries = vec![
        WallQuery::for_domain("itmoru", 100),
        WallQuery::for_domain("private", 100),
        WallQuery::for_domain("lentach", 100),
    ];

    let walls = fetch_walls(&api, &fast_limiter(), &queries).await.unwrap();

    let names: Vec<&str> = walls.iter().map(|w| w.wall.as_str()).collect();
    assert_eq!(names, vec!["itmoru", "lentach"]);
    assert!(walls.iter().all(|w| w.posts.len() == 100));
}

#[tokio::test]
async fn fetch_walls_fails_when_every_wall_fails() {
    let mut api = FakeWall::new(300);
    api.fail_domain = Some("private".to_string());
    let queries = vec![WallQuery::for_domain("private", 100)];

    assert!(fetch_walls(&api, &fast_limiter(), &queries).await.is_err());
}

#[test]
fn saved_wall_roundtrips_through_disk() {
    let post = serde_json::from_value(json!({
        "id": 7, "owner_id": -1, "date": 1577836800, "text": "Привет",
        "likes": {"count": 3}, "reposts": {"count": 1}
    }))
    .unwrap();
    let wall = SavedWall::new("itmoru", vec![post]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walls").join("itmoru.json");
    wall.save(&path).unwrap();
    let loaded = SavedWall::load(&path).unwrap();

    assert_eq!(loaded.wall, "itmoru");
    assert_eq!(loaded.posts.len(), 1);
    assert_eq!(loaded.posts[0].text, "Привет");
    assert_eq!(loaded.posts[0].likes.count, 3);
    assert_eq!(loaded.posts[0].views.count, 0);
}
