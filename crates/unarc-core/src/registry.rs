//! Install-registry lookups
//!
//! Some tools (7-Zip, CMake) are commonly installed on Windows without being
//! added to `PATH`; their installers record the location in the registry.
//! On other platforms there is no such registry and lookups return nothing.

use std::path::PathBuf;

/// Source of additional tool install directories
pub trait InstallRegistry: Send + Sync {
    /// Directories recorded under `key`/`value_name`, in lookup order.
    fn lookup(&self, key: &str, value_name: &str) -> Vec<PathBuf>;
}

/// Registry that never knows anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl InstallRegistry for NoRegistry {
    fn lookup(&self, _key: &str, _value_name: &str) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// The host's registry: queried on Windows, empty elsewhere
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRegistry;

#[cfg(windows)]
impl InstallRegistry for PlatformRegistry {
    fn lookup(&self, key: &str, value_name: &str) -> Vec<PathBuf> {
        // Both views, 64-bit first, like an installer of either bitness may have written.
        ["/reg:64", "/reg:32"]
            .iter()
            .filter_map(|view| query(key, value_name, view))
            .collect()
    }
}

#[cfg(not(windows))]
impl InstallRegistry for PlatformRegistry {
    fn lookup(&self, _key: &str, _value_name: &str) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[cfg(windows)]
fn query(key: &str, value_name: &str, view: &str) -> Option<PathBuf> {
    let output = std::process::Command::new("reg")
        .args(["query", key, "/v", value_name, view])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let path = parse_reg_output(&String::from_utf8_lossy(&output.stdout), value_name)?;
    tracing::debug!(key, value_name, path = %path.display(), "Found install directory in registry");
    Some(path)
}

/// Extract the data of `value_name` from `reg query` output, which looks like
/// `    Path    REG_SZ    C:\Program Files\7-Zip\`.
#[cfg_attr(not(windows), allow(dead_code))]
fn parse_reg_output(stdout: &str, value_name: &str) -> Option<PathBuf> {
    stdout.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix(value_name)?;
        let rest = rest.trim_start();
        let (kind, data) = rest.split_once(char::is_whitespace)?;
        if !kind.starts_with("REG_") {
            return None;
        }
        let data = data.trim();
        (!data.is_empty()).then(|| PathBuf::from(data))
    })
}
