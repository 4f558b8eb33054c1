//! CSOS Storage - Rule Cache and Rule Sources
//!
//! Provides rule documents to request handlers with bounded staleness:
//!
//! - [`RuleCache`]: read-through TTL cache keyed by rule-set kind
//! - [`RuleLoader`]: remote storage fetch with local file fallback
//! - [`RemoteStorage`] / [`LocalFiles`]: injectable rule sources, with
//!   [`SupabaseStorage`] and [`FsLocalFiles`] as the production backends
//! - [`Clock`]: injectable time source so staleness is testable

pub mod cache;
pub mod clock;
pub mod error;
pub mod sources;

pub use cache::{
    CacheCounters, CacheEntryStats, LoadSource, LoadedDocument, RuleCache, RuleCacheConfig,
    RuleLoader,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LoadError, RemoteError, RuleCacheError};
pub use sources::{FsLocalFiles, LocalFiles, RemoteStorage, SupabaseStorage};
