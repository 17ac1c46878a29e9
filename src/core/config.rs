//! Generator configuration.
//!
//! Loaded from a TOML file; every key is optional and CLI flags take
//! precedence over file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Embedded into the banner of every generated file
    pub app_info: String,
    /// Root directory artifacts are written under
    pub output_dir: PathBuf,
    /// Module receiving fixture loaders; fixtures are skipped when unset
    pub fixture_package: Option<String>,
    /// Whether to emit the repository-level meta file
    pub meta: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_info: default_app_info(),
            output_dir: PathBuf::from("generated"),
            fixture_package: None,
            meta: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `argen@<version>` stamped with the current UTC time
pub fn default_app_info() -> String {
    format!(
        "argen@{} ({})",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.app_info.starts_with("argen@"));
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert!(config.fixture_package.is_none());
        assert!(config.meta);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "app_info = \"build 42\"\nfixture_package = \"fixtures\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.app_info, "build 42");
        assert_eq!(config.fixture_package.as_deref(), Some("fixtures"));
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert!(config.meta);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/argen.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "meta = \"yes please\"").unwrap();
        let bad = Config::load(file.path()).unwrap_err();
        assert!(matches!(bad, ConfigError::Parse { .. }));
        assert!(bad.to_string().starts_with("Failed to parse config"));
    }
}
