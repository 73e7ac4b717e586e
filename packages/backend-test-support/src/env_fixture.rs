//! Temporary working directories holding an optional `.env` file.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch directory that may contain a `.env` file.
///
/// The directory is removed when the fixture is dropped.
pub struct EnvFixture {
    dir: TempDir,
}

impl EnvFixture {
    /// Empty directory: no `.env` file.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Directory with a `.env` file holding `contents` verbatim.
    pub fn with_file(contents: &str) -> Self {
        let fixture = Self::empty();
        fs::write(fixture.env_path(), contents).expect("write .env fixture");
        fixture
    }

    /// Directory with a `.env` file built from `KEY=VALUE` pairs.
    pub fn with_vars(vars: &[(&str, &str)]) -> Self {
        let contents: String = vars
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect();
        Self::with_file(&contents)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Location of the `.env` file, whether or not it exists.
    pub fn env_path(&self) -> PathBuf {
        self.dir.path().join(".env")
    }
}
