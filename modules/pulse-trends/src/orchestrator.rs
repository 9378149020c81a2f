// Concurrent fan-out over every registered source.
//
// One fetch+parse future per source, joined with wait-all semantics. A
// source's failure never reaches the caller: it is logged and contributes an
// empty article list. Dropping the `fetch_all` future drops every in-flight
// per-source future with it.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use pulse_common::{Article, SignalResult, Source};
use tracing::{info, warn};

use crate::extractor::{extract, parse_document};
use crate::fetcher::RetryingFetcher;

/// What one source produced in one pass.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub result: SignalResult<Vec<Article>>,
}

impl SourceOutcome {
    /// Articles on success, empty on failure.
    pub fn articles(&self) -> &[Article] {
        self.result.as_deref().unwrap_or_default()
    }
}

/// Summary of a merged pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub articles: usize,
}

impl FetchReport {
    /// No source succeeded. Also true when there were no sources at all.
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }
}

pub struct FetchOrchestrator {
    fetcher: RetryingFetcher,
}

impl FetchOrchestrator {
    pub fn new(fetcher: RetryingFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch and parse every source concurrently. Outcomes come back in the
    /// order of `sources`. Never fails.
    pub async fn fetch_all(&self, sources: &[Source], now: DateTime<Utc>) -> Vec<SourceOutcome> {
        let futures = sources.iter().map(|source| async move {
            let result = self.fetch_source(source, now).await;
            match &result {
                Ok(articles) => {
                    info!(source = %source.name, articles = articles.len(), "Source fetched");
                }
                Err(e) => {
                    warn!(
                        source = %source.name,
                        kind = e.kind(),
                        error = %e,
                        "Source failed, contributing no articles"
                    );
                }
            }
            SourceOutcome {
                source: source.name.clone(),
                result,
            }
        });

        join_all(futures).await
    }

    async fn fetch_source(
        &self,
        source: &Source,
        now: DateTime<Utc>,
    ) -> SignalResult<Vec<Article>> {
        let body = self.fetcher.fetch(source).await?;
        let items = parse_document(source.kind, &body, &source.name)?;
        Ok(items
            .iter()
            .map(|item| extract(item, &source.name, now))
            .collect())
    }
}

/// Concatenate successful outcomes in order and count what happened.
pub fn merge_outcomes(outcomes: &[SourceOutcome]) -> (Vec<Article>, FetchReport) {
    let mut articles = Vec::new();
    let mut report = FetchReport::default();
    for outcome in outcomes {
        match &outcome.result {
            Ok(batch) => {
                report.succeeded += 1;
                articles.extend(batch.iter().cloned());
            }
            Err(_) => report.failed += 1,
        }
    }
    report.articles = articles.len();
    (articles, report)
}
