//! Executable lookup on `PATH` plus extra directories

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Searches executables the way a shell would, with the platform's
/// executable-suffix rules (`PATHEXT` on Windows) applied by `which`.
#[derive(Debug, Clone)]
pub struct ExecutableSearch {
    path: Option<OsString>,
    extra_dirs: Vec<PathBuf>,
    cwd: PathBuf,
}

impl Default for ExecutableSearch {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ExecutableSearch {
    /// Search the `PATH` of the current process
    pub fn from_env() -> Self {
        Self::with_path(env::var_os("PATH").unwrap_or_default())
    }

    /// Search an explicit `PATH`-formatted list of directories
    pub fn with_path(path: impl Into<OsString>) -> Self {
        Self {
            path: Some(path.into()),
            extra_dirs: Vec::new(),
            cwd: env::current_dir().unwrap_or_default(),
        }
    }

    /// Directories searched after `PATH` and after each tool's own hints
    pub fn with_extra_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.extra_dirs.extend(dirs);
        self
    }

    /// Find `name` in `PATH`, then in `tool_dirs`, then in the configured
    /// extra directories. The first hit wins.
    pub fn find(&self, name: &Path, tool_dirs: &[PathBuf]) -> Option<PathBuf> {
        let dirs: Vec<PathBuf> = self
            .path
            .iter()
            .flat_map(env::split_paths)
            .chain(tool_dirs.iter().cloned())
            .chain(self.extra_dirs.iter().cloned())
            .filter(|dir| !dir.as_os_str().is_empty())
            .filter(|dir| {
                let usable = env::join_paths([dir]).is_ok();
                if !usable {
                    warn!(dir = %dir.display(), "Skipping search directory that cannot be joined");
                }
                usable
            })
            .collect();

        let joined = env::join_paths(dirs).ok()?;
        match which::which_in(name, Some(joined), &self.cwd) {
            Ok(found) => {
                debug!(name = %name.display(), found = %found.display(), "Resolved executable");
                Some(found)
            }
            Err(err) => {
                debug!(name = %name.display(), error = %err, "Executable not found");
                None
            }
        }
    }
}
