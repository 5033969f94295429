//! Fake unarchiving tools
//!
//! A fake archive is a plain-text manifest with one `path=content` line per
//! entry. The fake archive tools read the manifest and write each entry the
//! way the real tool would: `unzip` into its `-d` directory, `tar` and
//! `cmake -E tar` into the working directory. The fake `gzip` prints the
//! source file unchanged, so a stream's "decompressed" bytes are exactly
//! the bytes the test wrote.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// `unzip -o SRC -d DEST`
pub const UNZIP_SCRIPT: &str = r#"src="$2"
dest="$4"
while IFS='=' read -r name content; do
  [ -n "$name" ] || continue
  mkdir -p "$dest/$(dirname "$name")"
  printf '%s\n' "$content" > "$dest/$name"
  echo "  inflating: $dest/$name"
done < "$src"
"#;

/// `tar FLAGS SRC` and `cmake -E tar FLAGS SRC`; the source is the last argument
pub const TAR_SCRIPT: &str = r#"for src; do :; done
while IFS='=' read -r name content; do
  [ -n "$name" ] || continue
  mkdir -p "$(dirname "$name")"
  printf '%s\n' "$content" > "$name"
  echo "x $name"
done < "$src"
"#;

/// `gzip -d SRC -c`
pub const GZIP_SCRIPT: &str = r#"cat "$2"
"#;

/// A `gzip` that emits some output and a diagnostic, then fails
pub const FAILING_GZIP_SCRIPT: &str = r#"printf 'partial'
echo "gzip: $2: unexpected end of file" >&2
exit 1
"#;

/// A tool that prints some output and then blocks
pub const HANGING_SCRIPT: &str = r#"printf 'started'
exec sleep 30
"#;

/// A tool that records its arguments and working directory and succeeds
pub const RECORDING_SCRIPT: &str = r#"pwd > invocation.txt
for arg; do printf '%s\n' "$arg" >> invocation.txt; done
"#;

/// Install a `/bin/sh` script named `name` into `bin_dir`
pub fn fake_tool(bin_dir: &Path, name: &str, script: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(bin_dir)?;
    let path = bin_dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Write a fake archive manifest holding `entries`
pub fn fake_archive(path: &Path, entries: &[(&str, &str)]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let manifest: String = entries
        .iter()
        .map(|(name, content)| format!("{name}={content}\n"))
        .collect();
    std::fs::write(path, manifest)?;
    Ok(path.to_path_buf())
}
