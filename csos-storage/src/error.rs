//! Error types for rule sources and the rule cache.

use csos_core::RuleError;
use thiserror::Error;

/// Failure fetching an object from remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network error fetching {bucket}/{path}: {message}")]
    Network {
        bucket: String,
        path: String,
        message: String,
    },

    #[error("object {bucket}/{path} not found")]
    NotFound { bucket: String, path: String },

    #[error("permission denied reading {bucket}/{path}")]
    PermissionDenied { bucket: String, path: String },

    #[error("storage returned HTTP {status} for {bucket}/{path}")]
    Status {
        bucket: String,
        path: String,
        status: u16,
    },

    #[error("storage client error: {0}")]
    Client(String),
}

/// Failure producing a rule document from any source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "Failed to load rules from {bucket}/{path}: remote storage failed ({remote}); \
         local fallback {local_path} failed ({local})"
    )]
    AllSourcesFailed {
        bucket: String,
        path: String,
        remote: RemoteError,
        local_path: String,
        #[source]
        local: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),
}

/// Failure resolving a typed rule set through the cache.
#[derive(Debug, Error)]
pub enum RuleCacheError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}
