use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::LocalFiles;

/// Local rule files rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsLocalFiles {
    root: PathBuf,
}

impl FsLocalFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &Path) -> io::Result<PathBuf> {
        // Only plain relative segments; never escape the root.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path {} escapes the rules directory", relative.display()),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl LocalFiles for FsLocalFiles {
    async fn read_text_file(&self, relative: &Path) -> io::Result<String> {
        let full = self.resolve(relative)?;
        tokio::fs::read_to_string(&full).await
    }
}
