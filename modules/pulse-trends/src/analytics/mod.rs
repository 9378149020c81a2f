// Per-pass analytics over already-collected articles. All pure and
// single-threaded.

pub mod frequency;
pub mod momentum;
pub mod sentiment;

pub use frequency::{ranked, top_n, TermCount};
pub use momentum::MomentumClassifier;
pub use sentiment::SentimentTagger;
