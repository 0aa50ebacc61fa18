use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, ScienceError};

pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

// ─── Backoff ──────────────────────────────────────────────────────────────────

/// Where backoff waits go. Swapped out in tests to observe the schedule.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Bounded exponential backoff: attempt `n` (from 0) waits `unit * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Drive `send` until it yields a non-throttled reply.
///
/// * 429 → wait `2^attempt` units and try again.
/// * other non-2xx → `ApiError`, no retry.
/// * transport error → retried on the same schedule, surfaced once attempts run out.
/// * throttled on every attempt → `Ok(None)`.
///
/// No wait follows the final attempt.
pub async fn send_with_backoff<F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    url: &str,
    mut send: F,
) -> Result<Option<String>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    for attempt in 0..policy.max_attempts {
        let is_last = attempt + 1 >= policy.max_attempts;
        match send().await {
            Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                if is_last {
                    break;
                }
                let wait = policy.backoff(attempt);
                debug!(url, attempt, wait_ms = wait.as_millis() as u64, "throttled, backing off");
                sleeper.sleep(wait).await;
            }
            Ok(response) if !(200..300).contains(&response.status) => {
                return Err(ScienceError::ApiError(
                    url.to_string(),
                    format!("HTTP {}: {}", response.status, response.body),
                ));
            }
            Ok(response) => return Ok(Some(response.body)),
            Err(ScienceError::Http(e)) if !is_last => {
                let wait = policy.backoff(attempt);
                debug!(url, attempt, error = %e, "transport error, backing off");
                sleeper.sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }

    warn!(url, attempts = policy.max_attempts, "throttled on every attempt");
    Ok(None)
}

// ─── RateLimitedClient ────────────────────────────────────────────────────────

pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitedClient {
    pub fn new(min_interval: Duration, policy: RetryPolicy, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET with query parameters. `Ok(None)` means the server kept throttling.
    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<Option<String>> {
        let send = move || async move {
            self.wait_for_rate_limit().await;
            let response = self.client.get(url).query(params).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(RawResponse { status, body })
        };
        send_with_backoff(&self.policy, self.sleeper.as_ref(), url, send).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>> {
        let Some(text) = self.get(url, params).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ScienceError::Parse(e.to_string()))
    }
}
