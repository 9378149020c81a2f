// Fetching with bounded retry and exponential backoff.
//
// FeedClient is the network seam: HttpFeedClient in production,
// testing::MockFeedClient in tests. RetryingFetcher wraps a client with a
// per-attempt timeout and the retry policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pulse_common::{Config, RetryPolicy, SignalError, SignalResult, Source};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Raw document transport for one source.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the raw document body for `source`.
    async fn fetch(&self, source: &Source) -> SignalResult<Vec<u8>>;
}

// --- HTTP ---

pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedClient {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.user_agent, config.fetch_timeout)
    }

    fn transport_error(&self, source: &Source, e: reqwest::Error) -> SignalError {
        if e.is_timeout() {
            SignalError::Timeout {
                name: source.name.clone(),
                timeout: self.timeout,
            }
        } else {
            SignalError::SourceFetch {
                name: source.name.clone(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, source: &Source) -> SignalResult<Vec<u8>> {
        let resp = self
            .client
            .get(&source.endpoint)
            .send()
            .await
            .map_err(|e| self.transport_error(source, e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(SignalError::RateLimited {
                name: source.name.clone(),
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(SignalError::SourceFetch {
                name: source.name.clone(),
                message: format!("HTTP {status}"),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(source, e))?;
        debug!(source = %source.name, bytes = body.len(), "Fetched document");
        Ok(body.to_vec())
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// --- Retry ---

/// Run `op` up to `policy.max_retries` times (at least once), sleeping
/// `policy.backoff(n)` after the n-th failure. A rate-limit error that carries
/// `retry_after` waits at least that long. Returns the last error when every
/// attempt fails.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> SignalResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SignalResult<T>>,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let backoff = policy.backoff(attempt);
                let delay = e.retry_after().map_or(backoff, |wait| wait.max(backoff));
                warn!(
                    source = label,
                    attempt,
                    kind = e.kind(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Fetch attempt failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(source = label, attempts, kind = e.kind(), error = %e, "Giving up on source");
                return Err(e);
            }
        }
    }
}

/// A FeedClient bounded by a per-attempt timeout and a retry policy.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Arc<dyn FeedClient>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RetryingFetcher {
    pub fn new(
        client: Arc<dyn FeedClient>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            policy,
            attempt_timeout,
        }
    }

    pub fn from_config(client: Arc<dyn FeedClient>, config: &Config) -> Self {
        Self::new(client, config.retry, config.fetch_timeout)
    }

    pub async fn fetch(&self, source: &Source) -> SignalResult<Vec<u8>> {
        let client = &self.client;
        let timeout = self.attempt_timeout;
        retry_with_backoff(&self.policy, &source.name, || async move {
            match tokio::time::timeout(timeout, client.fetch(source)).await {
                Ok(result) => result,
                Err(_) => Err(SignalError::Timeout {
                    name: source.name.clone(),
                    timeout,
                }),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;
    use crate::testing::{source, MockFeedClient, MockReply};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    fn fetch_error() -> SignalError {
        SignalError::SourceFetch {
            name: "flaky".into(),
            message: "connection reset".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures_with_exponential_waits() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_with_backoff(&policy(3), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(fetch_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_when_attempts_are_exhausted() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: SignalResult<()> = retry_with_backoff(&policy(3), "down", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Err(SignalError::SourceFetch {
                    name: "down".into(),
                    message: format!("attempt {n}"),
                })
            }
        })
        .await;

        match result.unwrap_err() {
            SignalError::SourceFetch { message, .. } => assert_eq!(message, "attempt 3"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No sleep after the final attempt.
        assert!(start.elapsed() < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: SignalResult<()> = retry_with_backoff(&policy(0), "once", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(fetch_error()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_for_retry_after_when_longer_than_backoff() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_with_backoff(&policy(2), "busy", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err(SignalError::RateLimited {
                        name: "busy".into(),
                        retry_after: Some(Duration::from_secs(5)),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_millis(5100));
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_bounded_by_the_timeout() {
        let client = Arc::new(MockFeedClient::new().on("slow", MockReply::Hang));
        let fetcher = RetryingFetcher::new(client.clone(), policy(2), Duration::from_secs(10));
        let start = Instant::now();

        let err = fetcher.fetch(&source("slow")).await.unwrap_err();

        assert!(matches!(err, SignalError::Timeout { .. }));
        assert_eq!(client.calls("slow"), 2);
        // 10s attempt + 1s backoff + 10s attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(21), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(21_100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn fetcher_recovers_from_transient_failure() {
        let client = Arc::new(MockFeedClient::new().on_sequence(
            "flaky",
            vec![
                MockReply::Fail("503".into()),
                MockReply::Body(b"[]".to_vec()),
            ],
        ));
        let fetcher = RetryingFetcher::new(client.clone(), policy(3), Duration::from_secs(10));

        let body = fetcher.fetch(&source("flaky")).await.unwrap();

        assert_eq!(body, b"[]");
        assert_eq!(client.calls("flaky"), 2);
    }

    #[test]
    fn retry_after_parses_delta_seconds_only() {
        assert_eq!(parse_retry_after(" 120 "), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
