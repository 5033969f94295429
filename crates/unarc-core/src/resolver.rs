//! Choosing a tool for an archive
//!
//! Resolution is first-match: the catalog is filtered by the archive's media
//! type and the first candidate whose executable exists on this host wins.
//! Nothing is ranked beyond catalog order.

use crate::catalog::{Catalog, Tool, ToolKind};
use crate::command::CommandLine;
use crate::mime::{MediaTypeDetector, SniffingDetector};
use crate::search::ExecutableSearch;
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A catalog tool whose executable exists at an absolute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    tool: Tool,
    command: CommandLine,
}

impl ResolvedTool {
    /// The catalog entry this was resolved from
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// The command template with its executable rewritten to the found path
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn kind(&self) -> &ToolKind {
        self.tool.kind()
    }
}

/// The archive to extract paired with the command that will extract it.
///
/// The command's executable is resolved; its arguments still carry the
/// `%{src}`/`%{dest}` placeholders until the destination is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAndCommand {
    source_file: PathBuf,
    command: CommandLine,
    kind: ToolKind,
}

impl SourceAndCommand {
    pub fn new(source_file: impl Into<PathBuf>, resolved: ResolvedTool) -> Self {
        Self {
            source_file: source_file.into(),
            kind: resolved.tool.kind().clone(),
            command: resolved.command,
        }
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }
}

/// Outcome of probing one catalog entry, for diagnostics
#[derive(Debug, Clone)]
pub struct ToolProbe {
    pub tool: Tool,
    pub resolved: Option<PathBuf>,
    pub disabled: bool,
}

/// Maps archives to runnable extraction commands
#[derive(Clone)]
pub struct Resolver {
    catalog: &'static Catalog,
    detector: Arc<dyn MediaTypeDetector>,
    search: ExecutableSearch,
    disabled: HashSet<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("tools", &self.catalog.len())
            .field("search", &self.search)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Resolver {
    /// Built-in catalog, content sniffing and the host `PATH`
    pub fn new() -> Self {
        Self::with_catalog(Catalog::global())
    }

    /// Resolve against a custom catalog
    pub fn with_catalog(catalog: &'static Catalog) -> Self {
        Self {
            catalog,
            detector: Arc::new(SniffingDetector),
            search: ExecutableSearch::from_env(),
            disabled: HashSet::new(),
        }
    }

    pub fn detector(mut self, detector: impl MediaTypeDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn search(mut self, search: ExecutableSearch) -> Self {
        self.search = search;
        self
    }

    /// Never select tools whose executable has one of these names
    pub fn disable<I, S>(mut self, executables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(executables.into_iter().map(Into::into));
        self
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    fn is_disabled(&self, tool: &Tool) -> bool {
        self.disabled.contains(&tool.display_name())
    }

    /// Look up the executable of a single tool
    pub fn resolve_tool(&self, tool: &Tool) -> Option<ResolvedTool> {
        let executable = self
            .search
            .find(tool.command().executable(), tool.extra_search_dirs())?;
        Some(ResolvedTool {
            tool: tool.clone(),
            command: tool.command().with_executable(executable),
        })
    }

    /// Pick the first installed tool able to extract `source_file`.
    pub fn resolve(&self, source_file: &Path) -> Result<SourceAndCommand> {
        let media_type = self.detector.detect(source_file);
        let candidates: Vec<&Tool> = self
            .catalog
            .tools_for(&media_type)
            .filter(|tool| !self.is_disabled(tool))
            .collect();

        if candidates.is_empty() {
            return Err(Error::UnsupportedFormat(media_type.name().to_string()));
        }

        for tool in &candidates {
            match self.resolve_tool(tool) {
                Some(resolved) => {
                    info!(
                        source = %source_file.display(),
                        media_type = %media_type,
                        executable = %resolved.command().executable().display(),
                        "Selected extraction tool"
                    );
                    return Ok(SourceAndCommand::new(source_file, resolved));
                }
                None => debug!(tool = %tool.display_name(), "Candidate not installed"),
            }
        }

        Err(Error::NoExecutableFound {
            executables: candidates.iter().map(|t| t.display_name()).collect(),
        })
    }

    /// Resolution status of every catalog entry
    pub fn probe(&self) -> Vec<ToolProbe> {
        self.catalog
            .tools()
            .iter()
            .map(|tool| ToolProbe {
                tool: tool.clone(),
                resolved: self
                    .resolve_tool(tool)
                    .map(|r| r.command().executable().to_path_buf()),
                disabled: self.is_disabled(tool),
            })
            .collect()
    }
}
