use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::types::Source;

/// Bounded retry with exponential backoff: the n-th retry waits
/// `base_delay * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Size and age bounds for the context cache, plus the hybrid eviction weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_size: usize,
    /// Fraction of `max_size` kept after an eviction sweep.
    pub keep_ratio: f64,
    pub access_weight: f64,
    pub age_weight: f64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_size: 100,
            keep_ratio: 0.8,
            access_weight: 0.7,
            age_weight: 0.3,
        }
    }
}

impl CachePolicy {
    /// Entries retained by an eviction sweep. Never zero.
    pub fn retain_count(&self) -> usize {
        ((self.max_size as f64 * self.keep_ratio).floor() as usize).max(1)
    }
}

/// Ratios comparing the recent window count against the prior window count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumThresholds {
    pub rising_ratio: f64,
    pub declining_ratio: f64,
    pub recent_window: chrono::Duration,
    /// Measured back from `now`; the prior window is `[now - prior_window, now - recent_window)`.
    pub prior_window: chrono::Duration,
}

impl Default for MomentumThresholds {
    fn default() -> Self {
        Self {
            rising_ratio: 1.5,
            declining_ratio: 0.5,
            recent_window: chrono::Duration::hours(24),
            prior_window: chrono::Duration::hours(72),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional TOML file listing `[[sources]]`. Curated defaults when unset.
    pub sources_file: Option<PathBuf>,
    pub cache: CachePolicy,
    pub retry: RetryPolicy,
    /// Bound on each individual fetch attempt.
    pub fetch_timeout: Duration,
    pub momentum: MomentumThresholds,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources_file: None,
            cache: CachePolicy::default(),
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(10),
            momentum: MomentumThresholds::default(),
            user_agent: "pulse-trends/0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    /// Unset variables fall back to defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_summary();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. `from_env` is this over `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            sources_file: lookup("SIGNAL_SOURCES_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            cache: CachePolicy {
                ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "CACHE_DURATION_SECS",
                    defaults.cache.ttl.as_secs(),
                )?),
                max_size: parse_or(&lookup, "MAX_CACHE_SIZE", defaults.cache.max_size)?,
                keep_ratio: parse_or(&lookup, "CACHE_KEEP_RATIO", defaults.cache.keep_ratio)?,
                access_weight: parse_or(
                    &lookup,
                    "EVICTION_ACCESS_WEIGHT",
                    defaults.cache.access_weight,
                )?,
                age_weight: parse_or(&lookup, "EVICTION_AGE_WEIGHT", defaults.cache.age_weight)?,
            },
            retry: RetryPolicy {
                max_retries: parse_or(&lookup, "MAX_RETRIES", defaults.retry.max_retries)?,
                base_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "RETRY_BASE_DELAY_MS",
                    defaults.retry.base_delay.as_millis() as u64,
                )?),
            },
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            momentum: MomentumThresholds {
                rising_ratio: parse_or(
                    &lookup,
                    "MOMENTUM_RISING_RATIO",
                    defaults.momentum.rising_ratio,
                )?,
                declining_ratio: parse_or(
                    &lookup,
                    "MOMENTUM_DECLINING_RATIO",
                    defaults.momentum.declining_ratio,
                )?,
                ..defaults.momentum
            },
            user_agent: lookup("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.max_size == 0 {
            bail!("MAX_CACHE_SIZE must be at least 1");
        }
        if !(self.cache.keep_ratio > 0.0 && self.cache.keep_ratio <= 1.0) {
            bail!(
                "CACHE_KEEP_RATIO must be in (0, 1], got {}",
                self.cache.keep_ratio
            );
        }
        for (key, value) in [
            ("EVICTION_ACCESS_WEIGHT", self.cache.access_weight),
            ("EVICTION_AGE_WEIGHT", self.cache.age_weight),
            ("MOMENTUM_RISING_RATIO", self.momentum.rising_ratio),
            ("MOMENTUM_DECLINING_RATIO", self.momentum.declining_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{key} must be a finite non-negative number, got {value}");
            }
        }
        if self.momentum.declining_ratio > self.momentum.rising_ratio {
            bail!("MOMENTUM_DECLINING_RATIO must not exceed MOMENTUM_RISING_RATIO");
        }
        if self.fetch_timeout.is_zero() {
            bail!("FETCH_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    /// Log the effective settings at startup.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  SIGNAL_SOURCES_FILE: {}",
            self.sources_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<curated defaults>".to_string())
        );
        tracing::info!(
            "  cache: ttl={}s max_size={} keep_ratio={}",
            self.cache.ttl.as_secs(),
            self.cache.max_size,
            self.cache.keep_ratio
        );
        tracing::info!(
            "  retry: max_retries={} base_delay={}ms fetch_timeout={}s",
            self.retry.max_retries,
            self.retry.base_delay.as_millis(),
            self.fetch_timeout.as_secs()
        );
        tracing::info!(
            "  momentum: rising>{}x declining<{}x",
            self.momentum.rising_ratio,
            self.momentum.declining_ratio
        );
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        _ => Ok(default),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcesFile {
    sources: Vec<Source>,
}

/// Load the `[[sources]]` list from a TOML file.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file: {}", path.display()))?;
    let file: SourcesFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse sources file: {}", path.display()))?;
    Ok(file.sources)
}
