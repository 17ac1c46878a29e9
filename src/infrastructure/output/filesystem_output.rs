//! Filesystem-based output service implementation

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{OutputError, OutputService};
use crate::generation::GeneratedFile;

/// Output service that writes generated files below a root directory
pub struct FileSystemOutputService {
    root: PathBuf,
}

impl FileSystemOutputService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl OutputService for FileSystemOutputService {
    async fn write_files(&self, files: &[GeneratedFile]) -> Result<(), OutputError> {
        for file in files {
            let path = self.root.join(file.relative_path());

            if let Some(parent) = path.parent() {
                self.ensure_directory(parent).await?;
            }

            let write_error = |source| OutputError::Write {
                path: path.display().to_string(),
                source,
            };

            let mut handle = fs::File::create(&path).await.map_err(write_error)?;
            handle.write_all(&file.data).await.map_err(write_error)?;
            handle.flush().await.map_err(write_error)?;

            debug!(path = %path.display(), backend = %file.backend, "Wrote generated file");
        }

        Ok(())
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), OutputError> {
        fs::create_dir_all(path)
            .await
            .map_err(|source| OutputError::CreateDir {
                path: path.display().to_string(),
                source,
            })
    }
}
