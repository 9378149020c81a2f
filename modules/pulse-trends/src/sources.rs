// Source registry: the fixed set of external feeds polled on every pass.
// Registration order is the merge order for articles.

use std::collections::HashSet;

use pulse_common::{load_sources, Config, SignalError, SignalResult, SignalType, Source, SourceKind};
use tracing::info;

/// Built-in feeds used when no sources file is configured.
/// (name, endpoint, kind, region, signal type)
const CURATED_SOURCES: &[(&str, &str, SourceKind, &str, SignalType)] = &[
    // Business and general news
    (
        "bbc-business",
        "https://feeds.bbci.co.uk/news/business/rss.xml",
        SourceKind::Rss,
        "uk",
        SignalType::News,
    ),
    (
        "npr-business",
        "https://feeds.npr.org/1006/rss.xml",
        SourceKind::Rss,
        "us",
        SignalType::News,
    ),
    (
        "guardian-business",
        "https://www.theguardian.com/uk/business/rss",
        SourceKind::Rss,
        "uk",
        SignalType::News,
    ),
    (
        "techcrunch",
        "https://techcrunch.com/feed/",
        SourceKind::Rss,
        "global",
        SignalType::News,
    ),
    // Discussion boards
    (
        "lobsters-hottest",
        "https://lobste.rs/hottest.json",
        SourceKind::Json,
        "global",
        SignalType::Social,
    ),
    (
        "reddit-smallbusiness",
        "https://www.reddit.com/r/smallbusiness/.rss",
        SourceKind::Rss,
        "global",
        SignalType::Social,
    ),
    // Search-trend feeds
    (
        "google-trends-us",
        "https://trends.google.com/trending/rss?geo=US",
        SourceKind::Rss,
        "us",
        SignalType::Trend,
    ),
    (
        "google-trends-gb",
        "https://trends.google.com/trending/rss?geo=GB",
        SourceKind::Rss,
        "uk",
        SignalType::Trend,
    ),
];

/// Named external sources. Read-only once built.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Build a registry. Rejects duplicate source names.
    pub fn new(sources: Vec<Source>) -> SignalResult<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(SignalError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            if source.endpoint.trim().is_empty() {
                return Err(SignalError::Config(format!(
                    "source {} has an empty endpoint",
                    source.name
                )));
            }
        }
        Ok(Self { sources })
    }

    /// The built-in news, discussion and search-trend feeds.
    pub fn curated() -> Self {
        let sources = CURATED_SOURCES
            .iter()
            .map(|(name, endpoint, kind, region, signal_type)| {
                Source::new(name, endpoint, *kind, region, *signal_type)
            })
            .collect();
        Self { sources }
    }

    /// Sources from `SIGNAL_SOURCES_FILE` when set, curated defaults otherwise.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.sources_file {
            Some(path) => {
                let sources = load_sources(path)?;
                info!(path = %path.display(), sources = sources.len(), "Loaded sources file");
                Ok(Self::new(sources)?)
            }
            None => Ok(Self::curated()),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Sources of one signal type, in registration order.
    pub fn by_signal_type(&self, signal_type: SignalType) -> impl Iterator<Item = &Source> {
        self.sources
            .iter()
            .filter(move |s| s.signal_type == signal_type)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> Source {
        Source::new(
            name,
            &format!("https://{name}.example/feed"),
            SourceKind::Rss,
            "us",
            SignalType::News,
        )
    }

    #[test]
    fn curated_registry_has_every_signal_type() {
        let registry = SourceRegistry::curated();
        assert!(!registry.is_empty());
        for signal_type in [SignalType::News, SignalType::Trend, SignalType::Social] {
            assert!(
                registry.by_signal_type(signal_type).next().is_some(),
                "no curated {signal_type} source"
            );
        }
    }

    #[test]
    fn curated_names_are_unique() {
        let registry = SourceRegistry::curated();
        assert!(SourceRegistry::new(registry.sources().to_vec()).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = SourceRegistry::new(vec![source("a"), source("a")]).unwrap_err();
        assert!(matches!(err, SignalError::Config(_)));
    }

    #[test]
    fn preserves_registration_order() {
        let registry = SourceRegistry::new(vec![source("c"), source("a"), source("b")]).unwrap();
        let names: Vec<_> = registry.sources().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(registry.get("a").map(|s| s.name.as_str()), Some("a"));
        assert!(registry.get("zzz").is_none());
    }

    #[test]
    fn from_config_without_file_uses_curated() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.len(), SourceRegistry::curated().len());
    }
}
