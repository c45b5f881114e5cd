use std::time::Duration;
use crate::cli::Args;
use crate::storage::adapter::DEFAULT_TTL;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Timing and key layout of the conversation cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Prefix prepended to the conversation id to form the storage key.
    pub key_prefix: String,
    pub ttl: Duration,
    /// Quiet period after the last mutation before the transcript is written.
    pub debounce: Duration,
    /// Minimum time the `Loading` phase is shown after a conversation switch.
    pub min_dwell: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "conv:".to_string(),
            ttl: DEFAULT_TTL,
            debounce: Duration::from_millis(500),
            min_dwell: Duration::from_millis(300),
        }
    }
}

impl CacheConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            key_prefix: args.store_key_prefix.clone(),
            ttl: Duration::from_secs(args.cache_ttl_days.saturating_mul(SECONDS_PER_DAY)),
            debounce: Duration::from_millis(args.cache_debounce_ms),
            min_dwell: Duration::from_millis(args.cache_dwell_ms),
        }
    }
}
