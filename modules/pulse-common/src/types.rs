use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Sources ---

/// Wire format a source answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS or Atom XML document.
    Rss,
    /// Flat JSON array of item records.
    Json,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Rss => write!(f, "rss"),
            SourceKind::Json => write!(f, "json"),
        }
    }
}

/// What kind of signal a source contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    News,
    Trend,
    Social,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalType::News => write!(f, "news"),
            SignalType::Trend => write!(f, "trend"),
            SignalType::Social => write!(f, "social"),
        }
    }
}

/// A named external feed. Loaded once, immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub endpoint: String,
    pub kind: SourceKind,
    #[serde(default = "default_region")]
    pub region: String,
    pub signal_type: SignalType,
}

fn default_region() -> String {
    "global".to_string()
}

impl Source {
    pub fn new(
        name: &str,
        endpoint: &str,
        kind: SourceKind,
        region: &str,
        signal_type: SignalType,
    ) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            kind,
            region: region.to_string(),
            signal_type,
        }
    }
}

// --- Articles ---

/// One normalized feed item. Created per fetch pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub category: Option<String>,
    /// At most 10, lowercased, deduplicated, in order of first appearance.
    pub keywords: Vec<String>,
    /// Explicit `#tags` found in the raw text, lowercased, without the `#`.
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Name of the `Source` this article came from.
    pub source: String,
}

impl Article {
    /// Whether this article mentions `term`: as a keyword, as a hashtag, or as a
    /// whole word in the title or description. Case-insensitive.
    pub fn mentions(&self, term: &str) -> bool {
        let term = term.trim().trim_start_matches('#').to_lowercase();
        if term.is_empty() {
            return false;
        }
        if self.keywords.iter().any(|k| *k == term) || self.hashtags.iter().any(|h| *h == term) {
            return true;
        }

        let text = format!("{} {}", self.title, self.description).to_lowercase();
        if term.contains(char::is_whitespace) {
            return text.contains(&term);
        }
        text.split(|c: char| !c.is_alphanumeric())
            .any(|word| word == term)
    }

    /// Title and description joined, for lexicon scans.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

// --- Analytics ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Rising,
    Stable,
    Declining,
}

impl std::fmt::Display for Momentum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Momentum::Rising => write!(f, "rising"),
            Momentum::Stable => write!(f, "stable"),
            Momentum::Declining => write!(f, "declining"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Per-hashtag analytics, recomputed on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagStat {
    /// Rendered with a leading `#`.
    pub hashtag: String,
    /// Articles in the current pass that mention the term.
    pub frequency: usize,
    pub momentum: Momentum,
    pub sentiment: Sentiment,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingBundle {
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub topics: Vec<String>,
    pub themes: Vec<String>,
    /// Most recent first, bounded.
    pub articles: Vec<Article>,
    pub last_updated: DateTime<Utc>,
    pub hashtag_stats: Vec<HashtagStat>,
    /// True when every source failed and this is the static fallback.
    #[serde(default)]
    pub degraded: bool,
}

// --- Collaborator data ---

/// A trending topic reported by the real-time trend generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendTopic {
    pub topic: String,
    pub category: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub condition: String,
    pub temperature_c: Option<f64>,
}

/// Events and weather for a location, supplied by an external provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalContext {
    pub events: Vec<LocalEvent>,
    pub weather: Option<Weather>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub industry_trends: Vec<String>,
    pub competitor_insights: Vec<String>,
    pub market_opportunities: Vec<String>,
}

/// The cached value: trend analytics merged with local and business context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualBundle {
    pub category: String,
    pub location: String,
    pub trending: TrendingBundle,
    pub real_time_trends: Vec<TrendTopic>,
    pub local: LocalContext,
    pub business_context: BusinessContext,
    pub generated_at: DateTime<Utc>,
}

// --- Cache key ---

/// (business category, location). Both parts are trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub category: String,
    pub location: String,
}

impl CacheKey {
    pub fn new(category: &str, location: &str) -> Self {
        Self {
            category: category.trim().to_lowercase(),
            location: location.trim().to_lowercase(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.category, self.location)
    }
}
