use std::collections::HashSet;

use pulse_common::Sentiment;

const POSITIVE_WORDS: &[&str] = &[
    "growth", "growing", "grow", "surge", "surging", "soar", "soaring", "rally", "gain", "gains",
    "rise", "rising", "profit", "profits", "profitable", "boom", "booming", "record", "success",
    "successful", "win", "wins", "winning", "strong", "thrive", "thriving", "innovation",
    "innovative", "breakthrough", "opportunity", "opportunities", "popular", "love", "loved",
    "great", "excellent", "best", "positive", "optimistic", "upbeat", "recovery", "expand",
    "expansion", "launch", "launches", "demand", "award", "celebrate", "improve", "improved",
];

const NEGATIVE_WORDS: &[&str] = &[
    "decline", "declining", "drop", "drops", "fall", "falling", "loss", "losses", "crash",
    "plunge", "slump", "weak", "struggle", "struggling", "closure", "closures", "close",
    "closing", "layoff", "layoffs", "cut", "cuts", "bankrupt", "bankruptcy", "debt", "crisis",
    "risk", "risks", "fear", "fears", "concern", "concerns", "warning", "shortage", "recall",
    "lawsuit", "fraud", "scam", "negative", "pessimistic", "inflation", "recession", "worst",
    "bad", "fail", "failure", "failing", "shutdown", "strike",
];

/// Lexicon-based polarity: whole-word matches against fixed positive and
/// negative word lists, majority wins.
#[derive(Debug, Clone)]
pub struct SentimentTagger {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
}

impl Default for SentimentTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentTagger {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
        }
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        let (positive, negative) = self.scores(text);
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    /// (positive hits, negative hits). Every occurrence counts.
    pub fn scores(&self, text: &str) -> (usize, usize) {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .fold((0, 0), |(pos, neg), word| {
                if self.positive.contains(word) {
                    (pos + 1, neg)
                } else if self.negative.contains(word) {
                    (pos, neg + 1)
                } else {
                    (pos, neg)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_wins() {
        let tagger = SentimentTagger::new();
        assert_eq!(
            tagger.classify("Record growth as bakeries thrive despite inflation"),
            Sentiment::Positive
        );
        assert_eq!(
            tagger.classify("Layoffs and closures follow a sales slump, despite one record month"),
            Sentiment::Negative
        );
    }

    #[test]
    fn ties_and_empty_text_are_neutral() {
        let tagger = SentimentTagger::new();
        assert_eq!(
            tagger.classify("Strong demand meets a shortage and inflation"),
            Sentiment::Neutral
        );
        assert_eq!(tagger.classify(""), Sentiment::Neutral);
        assert_eq!(tagger.classify("Weekend market opens downtown"), Sentiment::Neutral);
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let tagger = SentimentTagger::new();
        assert_eq!(tagger.scores("GROWTH growthy regrowth"), (1, 0));
        assert_eq!(tagger.scores("Crash! crash? CRASH."), (0, 3));
    }
}
