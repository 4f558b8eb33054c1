//! Remote-first rule loading with a local file fallback.

use std::path::PathBuf;
use std::sync::Arc;

use csos_core::RuleDocument;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::sources::{LocalFiles, RemoteStorage};

/// Where a document ended up coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    LocalFallback,
}

/// A parsed document and its origin.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: RuleDocument,
    pub source: LoadSource,
}

/// Fetches rule files from remote storage, falling back to local files.
///
/// The local copy lives at `<bucket>/<path>` relative to the local root.
/// A parse failure is returned as-is and never triggers the fallback.
#[derive(Clone)]
pub struct RuleLoader {
    remote: Arc<dyn RemoteStorage>,
    local: Arc<dyn LocalFiles>,
}

impl std::fmt::Debug for RuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleLoader").finish_non_exhaustive()
    }
}

impl RuleLoader {
    pub fn new(remote: Arc<dyn RemoteStorage>, local: Arc<dyn LocalFiles>) -> Self {
        Self { remote, local }
    }

    pub async fn load(&self, bucket: &str, path: &str) -> Result<LoadedDocument, LoadError> {
        let remote_err = match self.remote.download(bucket, path).await {
            Ok(bytes) => {
                debug!(bucket, path, bytes = bytes.len(), "loaded rules from remote storage");
                return Ok(LoadedDocument {
                    document: RuleDocument::from_yaml_slice(&bytes)?,
                    source: LoadSource::Remote,
                });
            }
            Err(e) => e,
        };

        warn!(
            bucket,
            path,
            error = %remote_err,
            "remote rule fetch failed, falling back to local file"
        );

        let local_path: PathBuf = [bucket, path].iter().collect();
        match self.local.read_text_file(&local_path).await {
            Ok(text) => Ok(LoadedDocument {
                document: RuleDocument::from_yaml_str(&text)?,
                source: LoadSource::LocalFallback,
            }),
            Err(local) => Err(LoadError::AllSourcesFailed {
                bucket: bucket.to_string(),
                path: path.to_string(),
                remote: remote_err,
                local_path: local_path.display().to_string(),
                local,
            }),
        }
    }
}
