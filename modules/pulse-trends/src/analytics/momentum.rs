use chrono::{DateTime, Utc};
use pulse_common::{Article, Momentum, MomentumThresholds};

/// Compares how often a term is mentioned in the recent window against the
/// window before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumClassifier {
    thresholds: MomentumThresholds,
}

impl MomentumClassifier {
    pub fn new(thresholds: MomentumThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MomentumThresholds {
        &self.thresholds
    }

    pub fn classify(&self, term: &str, articles: &[Article], now: DateTime<Utc>) -> Momentum {
        let (recent, prior) = self.window_counts(term, articles, now);
        self.classify_counts(recent, prior)
    }

    /// Articles mentioning `term` in `[now - recent, now]` and in
    /// `[now - prior, now - recent)`. Future-dated and older articles count
    /// toward neither.
    pub fn window_counts(
        &self,
        term: &str,
        articles: &[Article],
        now: DateTime<Utc>,
    ) -> (usize, usize) {
        let recent_start = now - self.thresholds.recent_window;
        let prior_start = now - self.thresholds.prior_window;

        articles
            .iter()
            .filter(|a| a.published_at <= now && a.published_at >= prior_start)
            .filter(|a| a.mentions(term))
            .fold((0, 0), |(recent, prior), a| {
                if a.published_at >= recent_start {
                    (recent + 1, prior)
                } else {
                    (recent, prior + 1)
                }
            })
    }

    pub fn classify_counts(&self, recent: usize, prior: usize) -> Momentum {
        let (r, p) = (recent as f64, prior as f64);
        if r > self.thresholds.rising_ratio * p {
            Momentum::Rising
        } else if r < self.thresholds.declining_ratio * p {
            Momentum::Declining
        } else {
            Momentum::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::{article, test_now};

    fn mentions_at(term: &str, hours_ago: i64, n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| {
                article(&format!("{term} story {i}"))
                    .published(test_now() - Duration::hours(hours_ago))
                    .build()
            })
            .collect()
    }

    #[test]
    fn count_rule_matches_thresholds() {
        let classifier = MomentumClassifier::default();
        assert_eq!(classifier.classify_counts(10, 4), Momentum::Rising);
        assert_eq!(classifier.classify_counts(2, 10), Momentum::Declining);
        assert_eq!(classifier.classify_counts(5, 5), Momentum::Stable);
        assert_eq!(classifier.classify_counts(0, 0), Momentum::Stable);
        assert_eq!(classifier.classify_counts(1, 0), Momentum::Rising);
    }

    #[test]
    fn windows_split_at_the_recent_boundary() {
        let classifier = MomentumClassifier::default();
        let mut articles = mentions_at("kombucha", 2, 3);
        articles.extend(mentions_at("kombucha", 24, 1)); // exactly now-24h: recent
        articles.extend(mentions_at("kombucha", 25, 2));
        articles.extend(mentions_at("kombucha", 72, 1)); // exactly now-72h: prior

        assert_eq!(classifier.window_counts("kombucha", &articles, test_now()), (4, 3));
    }

    #[test]
    fn future_and_stale_articles_are_ignored() {
        let classifier = MomentumClassifier::default();
        let mut articles = mentions_at("vinyl", -5, 4); // dated in the future
        articles.extend(mentions_at("vinyl", 100, 4));

        assert_eq!(classifier.window_counts("vinyl", &articles, test_now()), (0, 0));
        assert_eq!(classifier.classify("vinyl", &articles, test_now()), Momentum::Stable);
    }

    #[test]
    fn classify_uses_mentions_only() {
        let classifier = MomentumClassifier::default();
        let mut articles = mentions_at("sourdough", 1, 3);
        articles.extend(mentions_at("bagels", 30, 5));

        assert_eq!(classifier.classify("sourdough", &articles, test_now()), Momentum::Rising);
        assert_eq!(classifier.classify("bagels", &articles, test_now()), Momentum::Declining);
    }

    #[test]
    fn thresholds_are_configurable() {
        let classifier = MomentumClassifier::new(MomentumThresholds {
            rising_ratio: 3.0,
            ..MomentumThresholds::default()
        });
        assert_eq!(classifier.classify_counts(10, 4), Momentum::Stable);
    }
}
