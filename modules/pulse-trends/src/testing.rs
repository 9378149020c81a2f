// Test mocks for the trend pipeline.
//
// - MockFeedClient (FeedClient): per-source scripted replies with call counters
// - FixedLocalContext / FixedTrends / FailingCollaborator: collaborator doubles
// - ManualClock: re-exported from the cache
//
// Plus builders for Sources, Articles and RSS/JSON documents.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pulse_common::{
    Article, LocalContext, SignalError, SignalResult, SignalType, Source, SourceKind, TrendTopic,
};

use crate::collaborators::{LocalContextProvider, TrendGenerator};
use crate::fetcher::FeedClient;

pub use crate::cache::ManualClock;

/// Fixed reference instant used across tests: 2025-03-01T12:00:00Z.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// MockFeedClient
// ---------------------------------------------------------------------------

/// One scripted response.
#[derive(Debug, Clone)]
pub enum MockReply {
    Body(Vec<u8>),
    /// `SignalError::SourceFetch` with this message.
    Fail(String),
    RateLimited(Option<Duration>),
    /// Never resolves; only a timeout or a drop ends the attempt.
    Hang,
}

/// Source-name keyed fetch mock. Replies are consumed in order and the last one
/// repeats. Unscripted sources fail.
#[derive(Default)]
pub struct MockFeedClient {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockFeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, source_name: &str, reply: MockReply) -> Self {
        self.on_sequence(source_name, vec![reply])
    }

    pub fn on_sequence(self, source_name: &str, replies: Vec<MockReply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(source_name.to_string(), replies.into());
        self
    }

    /// Attempts made against `source_name` so far.
    pub fn calls(&self, source_name: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(source_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_reply(&self, source_name: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(source_name)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl FeedClient for MockFeedClient {
    async fn fetch(&self, source: &Source) -> SignalResult<Vec<u8>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(source.name.clone())
            .or_insert(0) += 1;

        match self.next_reply(&source.name) {
            Some(MockReply::Body(body)) => Ok(body),
            Some(MockReply::Fail(message)) => Err(SignalError::SourceFetch {
                name: source.name.clone(),
                message,
            }),
            Some(MockReply::RateLimited(retry_after)) => Err(SignalError::RateLimited {
                name: source.name.clone(),
                retry_after,
            }),
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(SignalError::SourceFetch {
                name: source.name.clone(),
                message: "MockFeedClient: no reply scripted".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

pub struct FixedLocalContext(pub LocalContext);

#[async_trait]
impl LocalContextProvider for FixedLocalContext {
    async fn local_context(&self, _location: &str, _category: &str) -> Result<LocalContext> {
        Ok(self.0.clone())
    }
}

pub struct FixedTrends(pub Vec<TrendTopic>);

#[async_trait]
impl TrendGenerator for FixedTrends {
    async fn trends(
        &self,
        _category: &str,
        _location: &str,
        _platform: Option<&str>,
    ) -> Result<Vec<TrendTopic>> {
        Ok(self.0.clone())
    }
}

/// Fails every call, for both collaborator traits.
pub struct FailingCollaborator;

#[async_trait]
impl LocalContextProvider for FailingCollaborator {
    async fn local_context(&self, location: &str, _category: &str) -> Result<LocalContext> {
        bail!("local context unavailable for {location}")
    }
}

#[async_trait]
impl TrendGenerator for FailingCollaborator {
    async fn trends(
        &self,
        category: &str,
        _location: &str,
        _platform: Option<&str>,
    ) -> Result<Vec<TrendTopic>> {
        bail!("trend generator unavailable for {category}")
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// An RSS news source at `https://<name>.example/feed`.
pub fn source(name: &str) -> Source {
    Source::new(
        name,
        &format!("https://{name}.example/feed"),
        SourceKind::Rss,
        "global",
        SignalType::News,
    )
}

pub fn json_source(name: &str) -> Source {
    Source::new(
        name,
        &format!("https://{name}.example/items.json"),
        SourceKind::Json,
        "global",
        SignalType::Social,
    )
}

/// `ArticleBuilder` seeded with `title`, published at `test_now()`.
pub fn article(title: &str) -> ArticleBuilder {
    ArticleBuilder {
        article: Article {
            title: title.to_string(),
            description: String::new(),
            link: format!("https://news.example/{}", title.to_lowercase().replace(' ', "-")),
            published_at: test_now(),
            category: None,
            keywords: Vec::new(),
            hashtags: Vec::new(),
            source: "test".to_string(),
        },
    }
}

pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.article.description = description.to_string();
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.article.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn hashtags(mut self, hashtags: &[&str]) -> Self {
        self.article.hashtags = hashtags.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn published(mut self, published_at: DateTime<Utc>) -> Self {
        self.article.published_at = published_at;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.article.category = Some(category.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.article.source = source.to_string();
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}

/// Minimal RSS 2.0 document: one `<item>` per (title, description, published).
pub fn rss_feed(items: &[(&str, &str, DateTime<Utc>)]) -> Vec<u8> {
    let body: String = items
        .iter()
        .enumerate()
        .map(|(i, (title, description, published))| {
            format!(
                "<item><title>{}</title><description>{}</description>\
                 <link>https://news.example/{i}</link><pubDate>{}</pubDate></item>",
                xml_escape(title),
                xml_escape(description),
                published.to_rfc2822(),
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>test</title>{body}</channel></rss>"
    )
    .into_bytes()
}

/// Flat JSON array: one record per (title, description, published).
pub fn json_feed(items: &[(&str, &str, DateTime<Utc>)]) -> Vec<u8> {
    let records: Vec<serde_json::Value> = items
        .iter()
        .map(|(title, description, published)| {
            serde_json::json!({
                "title": title,
                "description": description,
                "url": format!("https://board.example/{}", published.timestamp()),
                "created_utc": published.timestamp(),
            })
        })
        .collect();
    serde_json::to_vec(&records).unwrap()
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
