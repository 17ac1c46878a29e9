//! Generated artifacts and their naming.

use std::path::PathBuf;

use serde::Serialize;

/// Suffix of every generated source file
pub const SOURCE_SUFFIX: &str = ".rs";

/// File name of the repository-level meta artifact
pub const META_FILE: &str = "repository.rs";

/// Backend tag of the meta artifact
pub const META_BACKEND: &str = "meta";

/// Backend tag of fixture artifacts
pub const FIXTURE_BACKEND: &str = "fixture";

/// A fully formatted output file, ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Destination directory relative to the output root, empty for the root
    pub dir: String,
    pub name: String,
    pub backend: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl GeneratedFile {
    /// Artifact of one backend output unit: `<package>/<unit>.rs`
    pub fn for_backend(package: &str, unit: &str, backend: &str, data: Vec<u8>) -> Self {
        Self {
            dir: package.to_string(),
            name: backend_file_name(unit),
            backend: backend.to_string(),
            data,
        }
    }

    /// The repository-level meta artifact
    pub fn meta(data: Vec<u8>) -> Self {
        Self {
            dir: String::new(),
            name: META_FILE.to_string(),
            backend: META_BACKEND.to_string(),
            data,
        }
    }

    /// Fixture artifact: `<fixture_pkg>/<package>_gen.rs`
    pub fn fixture(fixture_pkg: &str, package: &str, data: Vec<u8>) -> Self {
        Self {
            dir: fixture_pkg.to_string(),
            name: fixture_file_name(package),
            backend: FIXTURE_BACKEND.to_string(),
            data,
        }
    }

    /// Path of the file relative to the output root
    pub fn relative_path(&self) -> PathBuf {
        if self.dir.is_empty() {
            PathBuf::from(&self.name)
        } else {
            PathBuf::from(&self.dir).join(&self.name)
        }
    }
}

pub fn backend_file_name(unit: &str) -> String {
    format!("{unit}{SOURCE_SUFFIX}")
}

pub fn fixture_file_name(package: &str) -> String {
    format!("{package}_gen{SOURCE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_artifact_naming() {
        let file = GeneratedFile::for_backend("account", "octopus", "octopus", b"x".to_vec());
        assert_eq!(file.dir, "account");
        assert_eq!(file.name, "octopus.rs");
        assert_eq!(file.backend, "octopus");
        assert_eq!(file.relative_path(), PathBuf::from("account/octopus.rs"));
    }

    #[test]
    fn test_meta_artifact_lives_at_root() {
        let file = GeneratedFile::meta(Vec::new());
        assert_eq!(file.dir, "");
        assert_eq!(file.name, META_FILE);
        assert_eq!(file.backend, META_BACKEND);
        assert_eq!(file.relative_path(), PathBuf::from("repository.rs"));
    }

    #[test]
    fn test_fixture_artifact_naming() {
        let file = GeneratedFile::fixture("fixtures", "account", Vec::new());
        assert_eq!(file.relative_path(), PathBuf::from("fixtures/account_gen.rs"));
        assert_eq!(file.backend, FIXTURE_BACKEND);
    }
}
