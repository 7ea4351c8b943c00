//! Page fetching: paced HTTP with retries and rotating user agents, plus an on-disk page cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubcite_core::PubciteConfig;
use pubcite_core::config::FetchConfig;
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, ScienceError};

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
];

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Used when a 429 response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const MAX_BACKOFF_SECS: u64 = 300;

// ─── PageFetcher ──────────────────────────────────────────────────────────────

/// Anything that can turn a URL into page text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

// ─── UserAgentPool ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    /// Empty input falls back to the built-in browser list.
    pub fn new(agents: Vec<String>) -> Self {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if agents.is_empty() {
            return Self::default();
        }
        Self { agents }
    }

    pub fn fixed(agent: &str) -> Self {
        Self::new(vec![agent.to_string()])
    }

    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// Keeps consecutive requests at least `min_interval` apart.
struct Pacer {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let gap = previous.elapsed();
            if gap < self.min_interval {
                sleep(self.min_interval - gap).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct RateLimitedClient {
    http: reqwest::Client,
    pacer: Pacer,
    max_retries: u32,
    agents: UserAgentPool,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        max_retries: u32,
        agents: UserAgentPool,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            pacer: Pacer::new(min_interval),
            max_retries,
            agents,
        })
    }

    pub fn from_config(fetch: &FetchConfig) -> Result<Self> {
        Self::new(
            Duration::from_millis(fetch.min_interval_ms),
            fetch.max_retries,
            UserAgentPool::new(fetch.user_agents.clone()),
            Duration::from_secs(fetch.timeout_secs),
        )
    }

    async fn send(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .get(url)
            .header(USER_AGENT, self.agents.pick())
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
    }

    /// GET `url` as text. 429s wait for `Retry-After`; transport errors back off
    /// exponentially; any other non-success status fails at once.
    pub async fn get(&self, url: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.pacer.wait_turn().await;
            let exhausted = attempt >= self.max_retries;
            let delay = match self.send(url).await {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry_after_secs(&resp);
                    if exhausted {
                        return Err(ScienceError::RateLimit(url.to_string(), wait));
                    }
                    warn!(url, wait, "rate limited, backing off");
                    Duration::from_secs(wait)
                }
                Ok(resp) if resp.status().is_success() => return Ok(resp.text().await?),
                Ok(resp) => return Err(status_error(url, resp).await),
                Err(e) if exhausted => return Err(e.into()),
                Err(e) => {
                    let backoff = transport_backoff(attempt);
                    debug!(url, attempt, ?backoff, "request failed, retrying: {e}");
                    backoff
                }
            };
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// `2^attempt` seconds, capped at [`MAX_BACKOFF_SECS`].
fn transport_backoff(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

fn retry_after_secs(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

async fn status_error(url: &str, resp: reqwest::Response) -> ScienceError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    ScienceError::ApiError(url.to_string(), format!("HTTP {status}: {snippet}"))
}

// ─── PageCache ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct CachedPage {
    url: String,
    fetched_at: DateTime<Utc>,
    body: String,
}

/// Fetched pages on disk, one JSON file per URL.
pub struct PageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl PageCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), "cannot create page cache directory: {e}");
        }
        Self { dir, ttl }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        self.dir.join(format!("{:016x}.json", hasher.finish()))
    }

    /// Cached body for `url`, unless it is missing, unreadable or older than the TTL.
    pub async fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let data = tokio::fs::read(&path).await.ok()?;
        let page: CachedPage = serde_json::from_slice(&data).ok()?;
        if page.url != url {
            return None;
        }
        let age = Utc::now()
            .signed_duration_since(page.fetched_at)
            .to_std()
            .unwrap_or_default();
        if age > self.ttl {
            debug!(url, ?age, "cached page is stale");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(page.body)
    }

    pub async fn put(&self, url: &str, body: &str) {
        let page = CachedPage {
            url: url.to_string(),
            fetched_at: Utc::now(),
            body: body.to_string(),
        };
        match serde_json::to_vec(&page) {
            Ok(data) => {
                if let Err(e) = tokio::fs::write(self.path_for(url), data).await {
                    warn!(url, "cannot write cached page: {e}");
                }
            }
            Err(e) => warn!(url, "cannot encode cached page: {e}"),
        }
    }

    pub async fn remove(&self, url: &str) {
        let _ = tokio::fs::remove_file(self.path_for(url)).await;
    }
}

// ─── PageClient ───────────────────────────────────────────────────────────────

/// Production fetcher: rate-limited HTTP with an optional page cache in front.
pub struct PageClient {
    client: RateLimitedClient,
    cache: Option<PageCache>,
}

impl PageClient {
    pub fn new(client: RateLimitedClient, cache: Option<PageCache>) -> Self {
        Self { client, cache }
    }

    pub fn from_config(config: &PubciteConfig) -> Result<Self> {
        let client = RateLimitedClient::from_config(&config.fetch)?;
        let cache = config.cache.enabled.then(|| {
            PageCache::new(
                config.cache_dir(),
                Duration::from_secs(config.cache.ttl_hours * 3600),
            )
        });
        Ok(Self::new(client, cache))
    }
}

#[async_trait]
impl PageFetcher for PageClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(cache) = &self.cache
            && let Some(page) = cache.get(url).await
        {
            debug!(url, "page served from cache");
            return Ok(page);
        }

        let page = self.client.get(url).await?;
        if let Some(cache) = &self.cache {
            cache.put(url, &page).await;
        }
        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for RateLimitedClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.get(url).await
    }
}
