// Downstream interface: cache-fronted trend bundles per (category, location).
//
// A miss runs one full pass: fetch every source, merge, aggregate (or fall
// back when nothing came back), query the collaborators, derive the business
// context, then cache the result. Degraded bundles are returned but not cached,
// so the next request tries the sources again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pulse_common::{
    BusinessContext, CacheKey, Config, ContextualBundle, LocalContext, Momentum, TrendTopic,
    TrendingBundle,
};
use serde::Serialize;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use crate::aggregator::TrendAggregator;
use crate::cache::{CacheStats, Clock, ContextCache, SystemClock};
use crate::collaborators::{LocalContextProvider, NoLocalContext, NoTrendGenerator, TrendGenerator};
use crate::fetcher::{FeedClient, RetryingFetcher};
use crate::orchestrator::{merge_outcomes, FetchOrchestrator};
use crate::relevance::RelevanceFilter;
use crate::sources::SourceRegistry;

const MAX_INDUSTRY_TRENDS: usize = 5;
const MAX_COMPETITOR_INSIGHTS: usize = 5;
const MAX_MARKET_OPPORTUNITIES: usize = 5;
const MIN_OPPORTUNITY_RELEVANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Aggregation passes run (cache misses plus refreshes).
    pub passes: u64,
    /// Passes where every source failed and the fallback bundle was served.
    pub degraded_passes: u64,
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
struct Counters {
    passes: AtomicU64,
    degraded_passes: AtomicU64,
}

/// Built once at startup and shared by reference.
#[derive(TypedBuilder)]
pub struct TrendingService {
    registry: Arc<SourceRegistry>,
    orchestrator: FetchOrchestrator,
    #[builder(default)]
    aggregator: TrendAggregator,
    cache: ContextCache<Arc<ContextualBundle>>,
    #[builder(default = Arc::new(NoLocalContext) as Arc<dyn LocalContextProvider>)]
    local_context: Arc<dyn LocalContextProvider>,
    #[builder(default = Arc::new(NoTrendGenerator) as Arc<dyn TrendGenerator>)]
    trend_generator: Arc<dyn TrendGenerator>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    /// Passed through to the trend generator.
    #[builder(default, setter(strip_option, into))]
    platform: Option<String>,
    #[builder(default, setter(skip))]
    counters: Counters,
}

impl TrendingService {
    /// Production wiring: sources from config, the given transport, system clock.
    pub fn from_config(config: &Config, client: Arc<dyn FeedClient>) -> anyhow::Result<Self> {
        let registry = SourceRegistry::from_config(config)?;
        info!(sources = registry.len(), "Source registry ready");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self::builder()
            .registry(Arc::new(registry))
            .orchestrator(FetchOrchestrator::new(RetryingFetcher::from_config(
                client, config,
            )))
            .aggregator(TrendAggregator::new(RelevanceFilter::new(), config.momentum))
            .cache(ContextCache::new(config.cache, clock.clone()))
            .clock(clock)
            .build())
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// The contextual bundle for `(category, location)`. Never fails: source
    /// and collaborator failures degrade the result instead.
    pub async fn get_contextual_bundle(
        &self,
        category: &str,
        location: &str,
    ) -> Arc<ContextualBundle> {
        let key = CacheKey::new(category, location);
        if let Some(bundle) = self.cache.get(&key) {
            return bundle;
        }
        self.compute(key).await
    }

    /// Recompute and re-cache, ignoring any cached entry.
    pub async fn refresh(&self, category: &str, location: &str) -> Arc<ContextualBundle> {
        self.compute(CacheKey::new(category, location)).await
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            passes: self.counters.passes.load(Ordering::Relaxed),
            degraded_passes: self.counters.degraded_passes.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    async fn compute(&self, key: CacheKey) -> Arc<ContextualBundle> {
        let now = self.clock.now();
        self.counters.passes.fetch_add(1, Ordering::Relaxed);

        let outcomes = self.orchestrator.fetch_all(self.registry.sources(), now).await;
        let (articles, report) = merge_outcomes(&outcomes);

        let trending = if report.all_failed() {
            self.counters.degraded_passes.fetch_add(1, Ordering::Relaxed);
            warn!(
                key = %key,
                failed = report.failed,
                "No source produced articles, serving fallback bundle"
            );
            TrendAggregator::fallback(now)
        } else {
            info!(
                key = %key,
                succeeded = report.succeeded,
                failed = report.failed,
                articles = report.articles,
                "Fetch pass complete"
            );
            self.aggregator.aggregate(&articles, &key.category, now)
        };

        let (local, real_time_trends) = tokio::join!(
            self.local_context.local_context(&key.location, &key.category),
            self.trend_generator
                .trends(&key.category, &key.location, self.platform.as_deref()),
        );
        let local = local.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Local context unavailable");
            LocalContext::default()
        });
        let real_time_trends = real_time_trends.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Trend generator unavailable");
            Vec::new()
        });

        let business_context = build_business_context(
            &trending,
            &real_time_trends,
            &local,
            &key.category,
            self.aggregator.relevance(),
        );

        let bundle = Arc::new(ContextualBundle {
            category: key.category.clone(),
            location: key.location.clone(),
            trending,
            real_time_trends,
            local,
            business_context,
            generated_at: now,
        });

        if !bundle.trending.degraded {
            self.cache.put(key, bundle.clone());
        }
        bundle
    }
}

/// Business-facing summary of one pass.
pub fn build_business_context(
    trending: &TrendingBundle,
    real_time_trends: &[TrendTopic],
    local: &LocalContext,
    category: &str,
    relevance: &RelevanceFilter,
) -> BusinessContext {
    let industry_trends = trending
        .keywords
        .iter()
        .filter(|k| relevance.is_relevant(k, category))
        .take(MAX_INDUSTRY_TRENDS)
        .cloned()
        .collect();

    let competitor_insights = trending
        .hashtag_stats
        .iter()
        .filter_map(|stat| match stat.momentum {
            Momentum::Rising => Some(format!(
                "{} is gaining momentum ({} mentions, {} sentiment)",
                stat.hashtag, stat.frequency, stat.sentiment
            )),
            Momentum::Declining => Some(format!(
                "{} is losing momentum ({} mentions, {} sentiment)",
                stat.hashtag, stat.frequency, stat.sentiment
            )),
            Momentum::Stable => None,
        })
        .take(MAX_COMPETITOR_INSIGHTS)
        .collect();

    let mut topics: Vec<&TrendTopic> = real_time_trends
        .iter()
        .filter(|t| t.relevance_score >= MIN_OPPORTUNITY_RELEVANCE)
        .filter(|t| !relevance.is_blacklisted(&t.topic))
        .collect();
    topics.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let market_opportunities = topics
        .into_iter()
        .map(|t| t.topic.clone())
        .chain(
            local
                .events
                .iter()
                .filter(|event| !relevance.is_blacklisted(&event.name))
                .map(|event| match &event.venue {
                    Some(venue) => format!("Local event: {} at {}", event.name, venue),
                    None => format!("Local event: {}", event.name),
                }),
        )
        .take(MAX_MARKET_OPPORTUNITIES)
        .collect();

    BusinessContext {
        industry_trends,
        competitor_insights,
        market_opportunities,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pulse_common::{CachePolicy, LocalEvent, RetryPolicy, Sentiment, Source};

    use super::*;
    use crate::testing::{
        rss_feed, source, test_now, FailingCollaborator, FixedLocalContext, FixedTrends,
        ManualClock, MockFeedClient, MockReply,
    };

    struct Harness {
        service: TrendingService,
        client: Arc<MockFeedClient>,
        clock: Arc<ManualClock>,
    }

    fn harness(client: MockFeedClient, sources: Vec<Source>) -> Harness {
        let client = Arc::new(client);
        let clock = Arc::new(ManualClock::new(test_now()));
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
        };
        let service = TrendingService::builder()
            .registry(Arc::new(SourceRegistry::new(sources).unwrap()))
            .orchestrator(FetchOrchestrator::new(RetryingFetcher::new(
                client.clone(),
                policy,
                Duration::from_secs(5),
            )))
            .cache(ContextCache::new(CachePolicy::default(), clock.clone()))
            .clock(clock.clone())
            .build();
        Harness {
            service,
            client,
            clock,
        }
    }

    fn fitness_feed() -> Vec<u8> {
        let now = test_now();
        rss_feed(&[
            ("Workout studios report record growth", "#fitness members love it", now),
            ("Home workout apps booming", "#fitness", now),
        ])
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let h = harness(
            MockFeedClient::new().on("news", MockReply::Body(fitness_feed())),
            vec![source("news")],
        );

        let first = h.service.get_contextual_bundle("Fitness", "Austin").await;
        let second = h.service.get_contextual_bundle(" fitness ", "austin").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.client.calls("news"), 1);
        assert_eq!(first.category, "fitness");
        assert!(first.trending.keywords.contains(&"workout".to_string()));
        let stats = h.service.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.cache.hits, 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_new_pass() {
        let h = harness(
            MockFeedClient::new().on("news", MockReply::Body(fitness_feed())),
            vec![source("news")],
        );

        h.service.get_contextual_bundle("fitness", "austin").await;
        h.clock.advance(chrono::Duration::minutes(31));
        let again = h.service.get_contextual_bundle("fitness", "austin").await;

        assert_eq!(h.client.calls("news"), 2);
        assert_eq!(again.generated_at, test_now() + chrono::Duration::minutes(31));
    }

    #[tokio::test]
    async fn all_sources_failing_serves_uncached_fallback() {
        let h = harness(
            MockFeedClient::new()
                .on("a", MockReply::Fail("HTTP 503".into()))
                .on("b", MockReply::Body(b"not a feed".to_vec())),
            vec![source("a"), source("b")],
        );

        let bundle = h.service.get_contextual_bundle("cafe", "paris").await;
        assert!(bundle.trending.degraded);

        h.service.get_contextual_bundle("cafe", "paris").await;
        assert_eq!(h.client.calls("a"), 2, "degraded bundles are not cached");
        assert_eq!(h.service.stats().degraded_passes, 2);
        assert_eq!(h.service.stats().cache.entries, 0);
    }

    #[tokio::test]
    async fn no_sources_is_degraded_too() {
        let h = harness(MockFeedClient::new(), Vec::new());
        let bundle = h.service.get_contextual_bundle("cafe", "paris").await;
        assert!(bundle.trending.degraded);
    }

    #[tokio::test]
    async fn refresh_bypasses_the_cache() {
        let h = harness(
            MockFeedClient::new().on("news", MockReply::Body(fitness_feed())),
            vec![source("news")],
        );

        h.service.get_contextual_bundle("fitness", "austin").await;
        h.service.refresh("fitness", "austin").await;

        assert_eq!(h.client.calls("news"), 2);
        assert_eq!(h.service.stats().passes, 2);
    }

    #[tokio::test]
    async fn collaborator_failures_become_empty_values() {
        let client = Arc::new(MockFeedClient::new().on("news", MockReply::Body(fitness_feed())));
        let clock = Arc::new(ManualClock::new(test_now()));
        let service = TrendingService::builder()
            .registry(Arc::new(SourceRegistry::new(vec![source("news")]).unwrap()))
            .orchestrator(FetchOrchestrator::new(RetryingFetcher::new(
                client,
                RetryPolicy::default(),
                Duration::from_secs(5),
            )))
            .cache(ContextCache::new(CachePolicy::default(), clock.clone()))
            .local_context(Arc::new(FailingCollaborator))
            .trend_generator(Arc::new(FailingCollaborator))
            .clock(clock)
            .build();

        let bundle = service.get_contextual_bundle("fitness", "austin").await;

        assert!(!bundle.trending.degraded);
        assert!(bundle.real_time_trends.is_empty());
        assert_eq!(bundle.local, LocalContext::default());
    }

    #[tokio::test]
    async fn collaborators_feed_the_business_context() {
        let client = Arc::new(MockFeedClient::new().on("news", MockReply::Body(fitness_feed())));
        let clock = Arc::new(ManualClock::new(test_now()));
        let trends = vec![
            TrendTopic {
                topic: "low-impact training".into(),
                category: "fitness".into(),
                relevance_score: 0.6,
            },
            TrendTopic {
                topic: "celebrity diets".into(),
                category: "fitness".into(),
                relevance_score: 0.2,
            },
            TrendTopic {
                topic: "outdoor bootcamps".into(),
                category: "fitness".into(),
                relevance_score: 0.9,
            },
        ];
        let local = LocalContext {
            events: vec![LocalEvent {
                name: "City Marathon".into(),
                starts_at: None,
                venue: Some("Zilker Park".into()),
            }],
            weather: None,
        };
        let service = TrendingService::builder()
            .registry(Arc::new(SourceRegistry::new(vec![source("news")]).unwrap()))
            .orchestrator(FetchOrchestrator::new(RetryingFetcher::new(
                client,
                RetryPolicy::default(),
                Duration::from_secs(5),
            )))
            .cache(ContextCache::new(CachePolicy::default(), clock.clone()))
            .local_context(Arc::new(FixedLocalContext(local)))
            .trend_generator(Arc::new(FixedTrends(trends)))
            .clock(clock)
            .platform("instagram")
            .build();

        let bundle = service.get_contextual_bundle("fitness", "austin").await;
        let business = &bundle.business_context;

        assert_eq!(
            business.market_opportunities,
            vec![
                "outdoor bootcamps",
                "low-impact training",
                "Local event: City Marathon at Zilker Park"
            ]
        );
        assert!(business.industry_trends.len() <= 5);
        assert!(business.industry_trends.contains(&"workout".to_string()));
        assert!(business
            .competitor_insights
            .iter()
            .any(|s| s.starts_with("#fitness is gaining momentum")));
    }

    #[test]
    fn business_context_caps_and_skips_stable_hashtags() {
        let mut trending = TrendAggregator::fallback(test_now());
        for stat in trending.hashtag_stats.iter_mut() {
            stat.momentum = Momentum::Declining;
            stat.sentiment = Sentiment::Negative;
        }
        trending.hashtag_stats[0].momentum = Momentum::Stable;
        let events = (0..10)
            .map(|i| LocalEvent {
                name: format!("event {i}"),
                starts_at: None,
                venue: None,
            })
            .collect();

        let context = build_business_context(
            &trending,
            &[],
            &LocalContext {
                events,
                weather: None,
            },
            "retail",
            &RelevanceFilter::new(),
        );

        assert_eq!(context.competitor_insights.len(), 4);
        assert!(context.competitor_insights[0].contains("losing momentum"));
        assert_eq!(context.market_opportunities.len(), 5);
        assert_eq!(context.market_opportunities[0], "Local event: event 0");
    }

    #[test]
    fn market_opportunities_skip_blacklisted_topics_and_events() {
        let trending = TrendAggregator::fallback(test_now());
        let trends = vec![
            TrendTopic {
                topic: "Presidential election debate".into(),
                category: "fitness".into(),
                relevance_score: 0.9,
            },
            TrendTopic {
                topic: "trail running clubs".into(),
                category: "fitness".into(),
                relevance_score: 0.7,
            },
        ];
        let local = LocalContext {
            events: vec![
                LocalEvent {
                    name: "Hollywood movie premiere".into(),
                    starts_at: None,
                    venue: Some("Paramount Theatre".into()),
                },
                LocalEvent {
                    name: "Sunrise yoga in the park".into(),
                    starts_at: None,
                    venue: None,
                },
            ],
            weather: None,
        };
        let relevance = RelevanceFilter::new();

        let context = build_business_context(&trending, &trends, &local, "fitness", &relevance);

        assert_eq!(
            context.market_opportunities,
            vec!["trail running clubs", "Local event: Sunrise yoga in the park"]
        );
        assert!(context
            .market_opportunities
            .iter()
            .all(|entry| !relevance.is_blacklisted(entry)));
    }
}
