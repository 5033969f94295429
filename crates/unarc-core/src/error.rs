//! Error types for unarc-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the unarc library
#[derive(Error, Debug)]
pub enum Error {
    /// No catalog entry declares support for the detected media type
    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    /// At least one tool supports the format, but none of them is installed
    #[error(
        "Could not find any unarchiving executable in PATH ({}).",
        executables.join(", ")
    )]
    NoExecutableFound {
        /// Display names of every executable that was searched for, in catalog order
        executables: Vec<String>,
    },

    /// `start()` was called without a resolved source
    #[error("No source file set.")]
    MissingSource,

    /// `start()` was called without a destination directory
    #[error("No destination directory set.")]
    MissingDestination,

    /// The destination directory could not be created or is read-only
    #[error("Destination directory {} is not writable: {source}", path.display())]
    DestinationNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stream decompressor's output file could not be opened
    #[error("Failed to open output file.")]
    OutputOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chunk of decompressed data could not be written in full
    #[error("Failed to write output file.")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extraction tool exited with a non-success verdict
    #[error("Command failed.")]
    ProcessFailed,

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was raised before any tool could be launched.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_) | Error::NoExecutableFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
