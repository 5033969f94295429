//! Testing utilities and fixtures for unarc
//!
//! Real unarchiving tools are not guaranteed to exist on a test host, so the
//! fixtures here install small shell scripts under the names `unzip`, `tar`,
//! `gzip` and so on into a private `bin` directory. Tests point the
//! executable search at that directory instead of the host `PATH`.

use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;

/// Creates a temporary test directory with cleanup on drop
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a file with the given name and content in the test directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Creates a directory with the given name in the test directory
    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// The directory fake tools are installed into; created on demand
    pub fn bin_dir(&self) -> Result<PathBuf> {
        self.create_dir("bin")
    }

    /// A `PATH` value containing only [`TestDir::bin_dir`]
    pub fn search_path(&self) -> Result<OsString> {
        Ok(self.bin_dir()?.into_os_string())
    }
}
