//! Rule caching: configuration, the remote-then-local loader, and the
//! TTL cache that request handlers read through.

mod config;
mod loader;
mod rule_cache;

pub use config::RuleCacheConfig;
pub use loader::{LoadSource, LoadedDocument, RuleLoader};
pub use rule_cache::{CacheCounters, CacheEntryStats, RuleCache};
