//! The catalog of external unarchiving tools
//!
//! Entries are ordered by priority and the first usable one wins, so order
//! is policy:
//!
//! 1. The platform's native utility (PowerShell `Expand-Archive` on Windows).
//! 2. Dedicated multi-format tools (`unzip`, `7z`).
//! 3. `cmake -E tar`, which uses libarchive in-process and behaves the same
//!    everywhere, ahead of calling `tar` directly.
//! 4. Plain `tar`, whose format support depends on the host installation and
//!    which can fail silently for some containers.
//! 5. `gzip` as a raw stream decompressor. It must stay last: it accepts any
//!    gzip stream, including `.tar.gz` files it cannot unpack into a
//!    directory, and would otherwise shadow the tar-capable tools.

use crate::command::CommandLine;
use crate::mime::{self, MediaType};
use crate::registry::{InstallRegistry, PlatformRegistry};
use once_cell::sync::Lazy;
use std::path::PathBuf;

const SEVEN_ZIP_REGISTRY: (&str, &str) = (r"HKEY_CURRENT_USER\Software\7-Zip", "Path");
const CMAKE_REGISTRY: (&str, &str) = (r"HKEY_LOCAL_MACHINE\SOFTWARE\Kitware\CMake", "InstallDir");

static GLOBAL: Lazy<Catalog> = Lazy::new(|| Catalog::builtin(&PlatformRegistry));

/// How a tool delivers what it extracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    /// Writes the extracted entries into its working directory itself
    Archive,
    /// Writes one decompressed byte stream to stdout, which the caller must
    /// store in a file
    StreamDecompressor,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    command: CommandLine,
    supported_media_types: Vec<String>,
    extra_search_dirs: Vec<PathBuf>,
    kind: ToolKind,
}

impl Tool {
    /// An archive-extracting tool
    pub fn archive<I, S>(command: CommandLine, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command,
            supported_media_types: media_types.into_iter().map(Into::into).collect(),
            extra_search_dirs: Vec::new(),
            kind: ToolKind::Archive,
        }
    }

    /// A raw stream decompressor
    pub fn stream_decompressor<I, S>(command: CommandLine, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: ToolKind::StreamDecompressor,
            ..Self::archive(command, media_types)
        }
    }

    /// Additional directories to look in when the executable is not on `PATH`
    pub fn with_search_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.extra_search_dirs.extend(dirs);
        self
    }

    /// The command template, with the executable still unresolved
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn supported_media_types(&self) -> &[String] {
        &self.supported_media_types
    }

    pub fn extra_search_dirs(&self) -> &[PathBuf] {
        &self.extra_search_dirs
    }

    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    /// Name of the executable as shown to users, e.g. `7z`
    pub fn display_name(&self) -> String {
        self.command.executable().display().to_string()
    }

    /// Whether the tool declares support for `media_type` or one of its ancestors
    pub fn supports(&self, media_type: &MediaType) -> bool {
        self.supported_media_types
            .iter()
            .any(|supported| media_type.inherits(supported))
    }
}

/// Ordered, immutable list of candidate tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    tools: Vec<Tool>,
}

impl Catalog {
    /// The process-wide built-in catalog, built on first use
    pub fn global() -> &'static Catalog {
        &GLOBAL
    }

    /// A catalog with exactly these tools, in this order
    pub fn from_tools(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    /// The built-in tool list, taking install hints from `registry`
    pub fn builtin(registry: &dyn InstallRegistry) -> Self {
        let (key, value) = SEVEN_ZIP_REGISTRY;
        let seven_zip_dirs = registry.lookup(key, value);
        let (key, value) = CMAKE_REGISTRY;
        let cmake_dirs = registry.lookup(key, value);

        let mut tools = Vec::new();
        if cfg!(windows) {
            tools.push(Tool::archive(
                CommandLine::raw(
                    "powershell",
                    "-command Expand-Archive -Force '%{src}' '%{dest}'",
                ),
                [mime::ZIP],
            ));
        }
        tools.push(Tool::archive(
            CommandLine::new("unzip", ["-o", "%{src}", "-d", "%{dest}"]),
            [mime::ZIP],
        ));
        tools.push(
            Tool::archive(
                CommandLine::new("7z", ["x", "-o%{dest}", "-y", "-bb", "%{src}"]),
                [mime::ZIP, mime::SEVEN_ZIP],
            )
            .with_search_dirs(seven_zip_dirs),
        );

        let tar_flavours: [(&str, &[&str]); 4] = [
            ("xvf", &[mime::ZIP, mime::TAR, mime::SEVEN_ZIP]),
            ("xvzf", &[mime::COMPRESSED_TAR]),
            ("xvJf", &[mime::XZ_COMPRESSED_TAR]),
            ("xvjf", &[mime::BZIP_COMPRESSED_TAR]),
        ];
        for (flags, media_types) in tar_flavours {
            tools.push(
                Tool::archive(
                    CommandLine::new("cmake", ["-E", "tar", flags, "%{src}"]),
                    media_types.iter().copied(),
                )
                .with_search_dirs(cmake_dirs.iter().cloned()),
            );
        }
        for (flags, media_types) in tar_flavours {
            tools.push(Tool::archive(
                CommandLine::new("tar", [flags, "%{src}"]),
                media_types.iter().copied(),
            ));
        }

        tools.push(Tool::stream_decompressor(
            CommandLine::new("gzip", ["-d", "%{src}", "-c"]),
            [mime::GZIP],
        ));

        Self { tools }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools able to handle `media_type`, in priority order
    pub fn tools_for<'a>(&'a self, media_type: &'a MediaType) -> impl Iterator<Item = &'a Tool> + 'a {
        self.tools.iter().filter(move |tool| tool.supports(media_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NoRegistry;
    use std::path::Path;

    struct FakeRegistry;

    impl InstallRegistry for FakeRegistry {
        fn lookup(&self, key: &str, _value_name: &str) -> Vec<PathBuf> {
            vec![PathBuf::from(format!("/registry/{}", key.rsplit('\\').next().unwrap()))]
        }
    }

    fn names(tools: &[&Tool]) -> Vec<String> {
        tools.iter().map(|t| t.display_name()).collect()
    }

    #[test]
    fn test_stream_decompressor_is_last() {
        let catalog = Catalog::builtin(&NoRegistry);
        let last = catalog.tools().last().unwrap();
        assert_eq!(last.kind(), &ToolKind::StreamDecompressor);
        assert_eq!(last.display_name(), "gzip");
        assert_eq!(
            catalog
                .tools()
                .iter()
                .filter(|t| t.kind() == &ToolKind::StreamDecompressor)
                .count(),
            1
        );
    }

    #[test]
    fn test_zip_priority_order() {
        let catalog = Catalog::builtin(&NoRegistry);
        let zip = MediaType::new(mime::ZIP);
        let candidates: Vec<_> = catalog.tools_for(&zip).collect();

        let mut expected = Vec::new();
        if cfg!(windows) {
            expected.push("powershell");
        }
        expected.extend(["unzip", "7z", "cmake", "tar"]);
        assert_eq!(names(&candidates), expected);
    }

    #[test]
    fn test_compressed_tar_never_selects_gzip() {
        let catalog = Catalog::builtin(&NoRegistry);
        let tgz = MediaType::new(mime::COMPRESSED_TAR);
        let candidates: Vec<_> = catalog.tools_for(&tgz).collect();

        assert_eq!(names(&candidates), ["cmake", "tar"]);
        assert!(candidates
            .iter()
            .all(|t| t.kind() == &ToolKind::Archive));
    }

    #[test]
    fn test_plain_gzip_only_matches_gzip_tool() {
        let catalog = Catalog::builtin(&NoRegistry);
        let gz = MediaType::new(mime::GZIP);
        let candidates: Vec<_> = catalog.tools_for(&gz).collect();
        assert_eq!(names(&candidates), ["gzip"]);
    }

    #[test]
    fn test_unknown_type_has_no_tools() {
        let catalog = Catalog::builtin(&NoRegistry);
        let unknown = MediaType::new("text/plain");
        assert_eq!(catalog.tools_for(&unknown).count(), 0);
    }

    #[test]
    fn test_registry_hints_attached() {
        let catalog = Catalog::builtin(&FakeRegistry);
        for tool in catalog.tools() {
            match tool.display_name().as_str() {
                "7z" => assert_eq!(tool.extra_search_dirs(), [PathBuf::from("/registry/7-Zip")]),
                "cmake" => assert_eq!(tool.extra_search_dirs(), [PathBuf::from("/registry/CMake")]),
                _ => assert!(tool.extra_search_dirs().is_empty()),
            }
        }
    }

    #[test]
    fn test_templates_keep_placeholders() {
        let catalog = Catalog::builtin(&NoRegistry);
        assert!(catalog.tools().iter().all(|t| t.command().has_placeholders()));
        assert!(catalog
            .tools()
            .iter()
            .all(|t| t.command().executable().is_relative()));
    }

    #[test]
    fn test_global_is_built_once() {
        let first = Catalog::global() as *const Catalog;
        let second = Catalog::global() as *const Catalog;
        assert_eq!(first, second);
        assert!(!Catalog::global().is_empty());
        assert_eq!(
            Catalog::global().tools().last().unwrap().command().executable(),
            Path::new("gzip")
        );
    }
}
