//! Rule sources: remote object storage and the local filesystem.

mod fs;
mod supabase;

use std::path::Path;

use async_trait::async_trait;

use crate::error::RemoteError;

pub use fs::FsLocalFiles;
pub use supabase::SupabaseStorage;

/// Downloads objects from a named bucket.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, RemoteError>;
}

/// Reads text files relative to a configured root.
#[async_trait]
pub trait LocalFiles: Send + Sync {
    async fn read_text_file(&self, relative: &Path) -> std::io::Result<String>;
}
