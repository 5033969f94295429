//! Command templates and rendering
//!
//! Catalog entries carry a [`CommandLine`] whose arguments contain the
//! `%{src}` and `%{dest}` placeholders. [`render`] substitutes the concrete
//! paths once the destination is known.

use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder replaced with the archive path
pub const SOURCE_PLACEHOLDER: &str = "%{src}";
/// Placeholder replaced with the destination directory
pub const DEST_PLACEHOLDER: &str = "%{dest}";

/// Arguments of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    /// Passed to the process as an argument vector, no shell involved
    Split(Vec<String>),
    /// One opaque string interpreted by the tool's own command parser
    Raw(String),
}

/// An executable plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    executable: PathBuf,
    arguments: Arguments,
}

impl CommandLine {
    /// Create a command line with an argument vector
    pub fn new<I, S>(executable: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            arguments: Arguments::Split(args.into_iter().map(Into::into).collect()),
        }
    }

    /// Create a command line whose arguments are a single raw string
    pub fn raw(executable: impl Into<PathBuf>, arguments: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Arguments::Raw(arguments.into()),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.arguments, Arguments::Raw(_))
    }

    /// Copy of this command line running a different executable
    pub fn with_executable(&self, executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            arguments: self.arguments.clone(),
        }
    }

    /// Whether any argument still contains an unrendered placeholder
    pub fn has_placeholders(&self) -> bool {
        let contains = |s: &str| s.contains(SOURCE_PLACEHOLDER) || s.contains(DEST_PLACEHOLDER);
        match &self.arguments {
            Arguments::Split(args) => args.iter().any(|a| contains(a)),
            Arguments::Raw(raw) => contains(raw),
        }
    }

    /// Human readable rendition, quoting arguments that contain whitespace
    pub fn to_user_output(&self) -> String {
        let mut out = quote(&self.executable.to_string_lossy());
        match &self.arguments {
            Arguments::Split(args) => {
                for arg in args {
                    out.push(' ');
                    out.push_str(&quote(arg));
                }
            }
            Arguments::Raw(raw) if !raw.is_empty() => {
                out.push(' ');
                out.push_str(raw);
            }
            Arguments::Raw(_) => {}
        }
        out
    }

    /// Build the process command. Raw arguments go through the platform's
    /// native command-line handling.
    pub fn to_tokio_command(&self) -> tokio::process::Command {
        match &self.arguments {
            Arguments::Split(args) => {
                let mut command = tokio::process::Command::new(&self.executable);
                command.args(args);
                command
            }
            Arguments::Raw(raw) => raw_command(&self.executable, raw),
        }
    }
}

#[cfg(windows)]
fn raw_command(executable: &Path, raw: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new(executable);
    command.raw_arg(raw);
    command
}

#[cfg(not(windows))]
fn raw_command(executable: &Path, raw: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("sh");
    command
        .arg("-c")
        .arg(format!("{} {}", shell_quote(&executable.to_string_lossy()), raw));
    command
}

#[cfg(not(windows))]
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

/// Substitute `%{src}` and `%{dest}` in every argument of `template`.
///
/// The executable itself is never touched. No quoting is added: split
/// arguments reach the process as a vector.
pub fn render(template: &CommandLine, source: &Path, dest: &Path) -> CommandLine {
    let source = source.to_string_lossy();
    let dest = dest.to_string_lossy();
    let substitute = |arg: &str| {
        arg.replace(SOURCE_PLACEHOLDER, &source)
            .replace(DEST_PLACEHOLDER, &dest)
    };

    let arguments = match &template.arguments {
        Arguments::Split(args) => Arguments::Split(args.iter().map(|a| substitute(a)).collect()),
        Arguments::Raw(raw) => Arguments::Raw(substitute(raw)),
    };
    CommandLine {
        executable: template.executable.clone(),
        arguments,
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_output())
    }
}
