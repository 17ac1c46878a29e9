//! Output service implementations

pub mod filesystem_output;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::generation::GeneratedFile;

pub use filesystem_output::*;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Persists generated files
#[async_trait]
pub trait OutputService: Send + Sync {
    /// Write every file, relative to the service's root
    async fn write_files(&self, files: &[GeneratedFile]) -> Result<(), OutputError>;

    /// Ensure a directory exists
    async fn ensure_directory(&self, path: &Path) -> Result<(), OutputError>;
}
