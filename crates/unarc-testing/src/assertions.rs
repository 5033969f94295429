//! Custom assertions for extraction results

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// All regular files below `dir`, as `/`-separated relative paths
pub fn list_files(dir: &Path) -> Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(dir)?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(name);
        }
    }
    Ok(files)
}

/// Assert that `dir` holds exactly `expected` files, ignoring directories
pub fn assert_files_exactly(dir: &Path, expected: &[&str]) -> Result<()> {
    let actual = list_files(dir)?;
    let expected: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        bail!(
            "Files in {} differ\nexpected: {:?}\nactual:   {:?}",
            dir.display(),
            expected,
            actual
        );
    }
    Ok(())
}

/// Assert that `path` is a file with exactly `expected` as content
pub fn assert_file_content(path: &Path, expected: &[u8]) -> Result<()> {
    let actual =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if actual != expected {
        bail!(
            "Content of {} differs\nexpected: {:?}\nactual:   {:?}",
            path.display(),
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&actual)
        );
    }
    Ok(())
}

/// Assert that nothing, not even a dangling symlink, exists at `path`
pub fn assert_not_exists(path: &Path) -> Result<()> {
    if std::fs::symlink_metadata(path).is_ok() {
        bail!("Expected {} to not exist", path.display());
    }
    Ok(())
}
