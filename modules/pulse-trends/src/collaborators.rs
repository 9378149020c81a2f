// External collaborators queried after aggregation. Both are optional: a
// deployment without them wires in the null implementations below.

use anyhow::Result;
use async_trait::async_trait;
use pulse_common::{LocalContext, TrendTopic};

/// Events and weather for a location.
#[async_trait]
pub trait LocalContextProvider: Send + Sync {
    async fn local_context(&self, location: &str, category: &str) -> Result<LocalContext>;
}

/// Real-time trending topics, optionally scoped to a platform.
#[async_trait]
pub trait TrendGenerator: Send + Sync {
    async fn trends(
        &self,
        category: &str,
        location: &str,
        platform: Option<&str>,
    ) -> Result<Vec<TrendTopic>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalContext;

#[async_trait]
impl LocalContextProvider for NoLocalContext {
    async fn local_context(&self, _location: &str, _category: &str) -> Result<LocalContext> {
        Ok(LocalContext::default())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrendGenerator;

#[async_trait]
impl TrendGenerator for NoTrendGenerator {
    async fn trends(
        &self,
        _category: &str,
        _location: &str,
        _platform: Option<&str>,
    ) -> Result<Vec<TrendTopic>> {
        Ok(Vec::new())
    }
}
