//! Configuration module

use crate::resolver::Resolver;
use crate::search::ExecutableSearch;
use crate::unarchiver::Unarchiver;
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where to look for tools
    #[serde(default)]
    pub search: SearchConfig,
    /// Tool selection
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Extraction behaviour
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Executable search configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directories searched after `PATH` and the tools' own install hints
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

/// Tool selection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Executable names that are never selected, e.g. `["7z"]`
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Extraction configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// File name for single-stream decompression output (default: the
    /// archive name without its last extension)
    pub stream_file_name: Option<String>,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        Ok(config_dir.join("unarc").join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# unarc configuration file

[search]
# Directories searched for unarchiving tools after PATH
# extra_dirs = ["/opt/7zip/bin", "C:\\Program Files\\CMake\\bin"]
extra_dirs = []

[tools]
# Executables that must never be used, e.g. ["7z", "cmake"]
disabled = []

[extraction]
# Output file name for single-file decompressors such as gzip.
# Defaults to the archive name without its last extension.
# stream_file_name = "payload.bin"
"#
        .to_string()
    }

    /// Load configuration from the default location, creating it on first use
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Load configuration or use defaults if loading fails
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// A resolver honouring the search and tool settings
    pub fn resolver(&self) -> Resolver {
        Resolver::new()
            .search(ExecutableSearch::from_env().with_extra_dirs(self.search.extra_dirs.clone()))
            .disable(self.tools.disabled.iter().cloned())
    }

    /// An unarchiver built from this configuration
    pub fn unarchiver(&self) -> Unarchiver {
        let mut unarchiver = Unarchiver::with_resolver(self.resolver());
        if let Some(name) = &self.extraction.stream_file_name {
            unarchiver.set_stream_file_name(name.clone());
        }
        unarchiver
    }
}
