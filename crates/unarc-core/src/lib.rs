//! unarc - extract archives with whatever unarchiving tool the host has
//!
//! This library picks an external tool (`unzip`, `7z`, `cmake -E tar`, `tar`,
//! `gzip`, ...) for an archive based on its media type, finds the tool's
//! executable, runs it into a destination directory and reports progress
//! and a single success/failure result.

pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod mime;
pub mod process;
pub mod registry;
pub mod resolver;
pub mod search;
pub mod unarchiver;

pub use error::{Error, Result};

// Re-export commonly used types
pub use catalog::{Catalog, Tool, ToolKind};
pub use command::CommandLine;
pub use config::Config;
pub use executor::{DoneResult, Event, ExtractionState};
pub use mime::{MediaType, MediaTypeDetector};
pub use resolver::{ResolvedTool, Resolver, SourceAndCommand};
pub use search::ExecutableSearch;
pub use unarchiver::{Extraction, Unarchiver};
