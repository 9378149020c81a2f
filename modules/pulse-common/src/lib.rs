pub mod config;
pub mod error;
pub mod types;

pub use config::{load_sources, CachePolicy, Config, MomentumThresholds, RetryPolicy};
pub use error::{SignalError, SignalResult};
pub use types::*;
