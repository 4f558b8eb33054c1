use std::time::Duration;

use csos_core::RULES_BUCKET;

/// Default time a cached rule document stays fresh.
pub const DEFAULT_RULE_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration for the rule cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCacheConfig {
    /// How long a loaded document is served before it is reloaded.
    pub ttl: Duration,
    /// Storage bucket holding the rule files.
    pub bucket: String,
}

impl Default for RuleCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_RULE_TTL,
            bucket: RULES_BUCKET.to_string(),
        }
    }
}

impl RuleCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the rules bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }
}
