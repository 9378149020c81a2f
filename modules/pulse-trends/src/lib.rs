pub mod aggregator;
pub mod analytics;
pub mod cache;
pub mod collaborators;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod relevance;
pub mod service;
pub mod sources;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregator::TrendAggregator;
pub use cache::{
    CacheStats, Clock, ContextCache, EvictionPolicy, HybridScore, LeastFrequentlyUsed,
    LeastRecentlyUsed, ManualClock, SystemClock,
};
pub use collaborators::{LocalContextProvider, NoLocalContext, NoTrendGenerator, TrendGenerator};
pub use fetcher::{retry_with_backoff, FeedClient, HttpFeedClient, RetryingFetcher};
pub use orchestrator::{merge_outcomes, FetchOrchestrator, FetchReport, SourceOutcome};
pub use relevance::RelevanceFilter;
pub use service::{ServiceStats, TrendingService};
pub use sources::SourceRegistry;
