// Aggregation pass: one merged article list → one TrendingBundle.
//
// Single-threaded and deterministic: the same articles, category and `now`
// always produce the same bundle.

use chrono::{DateTime, Utc};
use pulse_common::{Article, HashtagStat, Momentum, MomentumThresholds, Sentiment, TrendingBundle};
use tracing::debug;

use crate::analytics::{ranked, MomentumClassifier, SentimentTagger};
use crate::relevance::RelevanceFilter;

pub const MAX_KEYWORDS: usize = 20;
pub const MAX_HASHTAGS: usize = 10;
pub const MAX_TOPICS: usize = 10;
pub const MAX_THEMES: usize = 5;
pub const MAX_ARTICLES: usize = 100;

/// Theme → trigger words. An article counts toward a theme when it mentions
/// any trigger word.
const THEMES: &[(&str, &[&str])] = &[
    (
        "Sustainability",
        &[
            "sustainable", "sustainability", "green", "eco", "climate", "recycling",
            "compostable", "renewable",
        ],
    ),
    (
        "Digital transformation",
        &["digital", "online", "ecommerce", "app", "software", "cloud", "automation"],
    ),
    (
        "Artificial intelligence",
        &["ai", "chatbot", "generative", "machine learning", "llm"],
    ),
    (
        "Health & wellness",
        &["health", "wellness", "fitness", "mental", "nutrition", "workout"],
    ),
    (
        "Local & community",
        &["local", "community", "neighborhood", "small business", "smallbiz", "shoplocal"],
    ),
    ("Cost of living", &["inflation", "prices", "cost", "wages", "rent", "tariffs"]),
    (
        "Future of work",
        &["remote", "hybrid", "workforce", "hiring", "layoffs", "jobs"],
    ),
    (
        "Experiences",
        &["experience", "events", "festival", "pop-up", "travel", "tourism"],
    ),
    ("Innovation", &["innovation", "startup", "launch", "breakthrough", "funding"]),
];

const FALLBACK_KEYWORDS: &[&str] = &[
    "small business",
    "local",
    "customer experience",
    "innovation",
    "sustainability",
];
const FALLBACK_HASHTAGS: &[&str] = &[
    "smallbusiness",
    "shoplocal",
    "entrepreneur",
    "innovation",
    "sustainability",
];
const FALLBACK_TOPICS: &[&str] = &["business"];
const FALLBACK_THEMES: &[&str] = &["Local & community", "Digital transformation"];

#[derive(Debug, Clone, Default)]
pub struct TrendAggregator {
    relevance: RelevanceFilter,
    momentum: MomentumClassifier,
    sentiment: SentimentTagger,
}

impl TrendAggregator {
    pub fn new(relevance: RelevanceFilter, thresholds: MomentumThresholds) -> Self {
        Self {
            relevance,
            momentum: MomentumClassifier::new(thresholds),
            sentiment: SentimentTagger::new(),
        }
    }

    pub fn relevance(&self) -> &RelevanceFilter {
        &self.relevance
    }

    pub fn aggregate(
        &self,
        articles: &[Article],
        category: &str,
        now: DateTime<Utc>,
    ) -> TrendingBundle {
        let keywords: Vec<String> = ranked(articles.iter().flat_map(|a| a.keywords.iter()))
            .into_iter()
            .filter(|tc| self.relevance.is_relevant(&tc.term, category))
            .take(MAX_KEYWORDS)
            .map(|tc| tc.term)
            .collect();

        // Explicit hashtags first so they win frequency ties against keywords.
        let hashtag_terms: Vec<String> = ranked(
            articles
                .iter()
                .flat_map(|a| a.hashtags.iter())
                .chain(articles.iter().flat_map(|a| a.keywords.iter())),
        )
        .into_iter()
        .filter(|tc| self.relevance.is_relevant(&tc.term, category))
        .take(MAX_HASHTAGS)
        .map(|tc| tc.term)
        .collect();

        let hashtag_stats: Vec<HashtagStat> = hashtag_terms
            .iter()
            .map(|term| self.hashtag_stat(term, articles, now))
            .collect();

        let topics: Vec<String> = ranked(articles.iter().filter_map(|a| a.category.as_deref()))
            .into_iter()
            .filter(|tc| !self.relevance.is_blacklisted(&tc.term))
            .take(MAX_TOPICS)
            .map(|tc| tc.term)
            .collect();

        let themes = self.themes(articles);

        let mut recent = articles.to_vec();
        recent.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        recent.truncate(MAX_ARTICLES);

        debug!(
            category,
            articles = articles.len(),
            keywords = keywords.len(),
            hashtags = hashtag_terms.len(),
            topics = topics.len(),
            themes = themes.len(),
            "Aggregated trending bundle"
        );

        TrendingBundle {
            keywords,
            hashtags: hashtag_terms.iter().map(|t| format!("#{t}")).collect(),
            topics,
            themes,
            articles: recent,
            last_updated: now,
            hashtag_stats,
            degraded: false,
        }
    }

    fn hashtag_stat(&self, term: &str, articles: &[Article], now: DateTime<Utc>) -> HashtagStat {
        let mentioning: Vec<&Article> = articles.iter().filter(|a| a.mentions(term)).collect();
        let text = mentioning
            .iter()
            .map(|a| a.text())
            .collect::<Vec<_>>()
            .join(" ");

        HashtagStat {
            hashtag: format!("#{term}"),
            frequency: mentioning.len(),
            momentum: self.momentum.classify(term, articles, now),
            sentiment: self.sentiment.classify(&text),
        }
    }

    /// Themes ranked by how many articles hit one of their trigger words.
    /// Ties keep taxonomy order; themes with no hits are dropped.
    fn themes(&self, articles: &[Article]) -> Vec<String> {
        let mut counts: Vec<(&str, usize)> = THEMES
            .iter()
            .map(|(theme, triggers)| {
                let hits = articles
                    .iter()
                    .filter(|a| triggers.iter().any(|t| a.mentions(t)))
                    .count();
                (*theme, hits)
            })
            .filter(|(theme, hits)| *hits > 0 && !self.relevance.is_blacklisted(theme))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(MAX_THEMES)
            .map(|(theme, _)| theme.to_string())
            .collect()
    }

    /// Static bundle served when no source produced anything.
    pub fn fallback(now: DateTime<Utc>) -> TrendingBundle {
        let to_strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        TrendingBundle {
            keywords: to_strings(FALLBACK_KEYWORDS),
            hashtags: FALLBACK_HASHTAGS.iter().map(|t| format!("#{t}")).collect(),
            topics: to_strings(FALLBACK_TOPICS),
            themes: to_strings(FALLBACK_THEMES),
            articles: Vec::new(),
            last_updated: now,
            hashtag_stats: FALLBACK_HASHTAGS
                .iter()
                .map(|t| HashtagStat {
                    hashtag: format!("#{t}"),
                    frequency: 0,
                    momentum: Momentum::Stable,
                    sentiment: Sentiment::Neutral,
                })
                .collect(),
            degraded: true,
        }
    }
}
