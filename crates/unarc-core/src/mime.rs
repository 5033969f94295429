//! Media type detection
//!
//! Extraction tools are selected by media type, not by file extension. A
//! [`MediaType`] knows its place in a small type hierarchy so that, for
//! example, `application/x-compressed-tar` is recognised as a kind of
//! `application/gzip`. Detection itself sits behind [`MediaTypeDetector`];
//! [`SniffingDetector`] is the default implementation and looks at magic
//! bytes first and the file name second.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const ZIP: &str = "application/zip";
pub const SEVEN_ZIP: &str = "application/x-7z-compressed";
pub const TAR: &str = "application/x-tar";
pub const GZIP: &str = "application/gzip";
pub const XZ: &str = "application/x-xz";
pub const BZIP2: &str = "application/x-bzip";
pub const COMPRESSED_TAR: &str = "application/x-compressed-tar";
pub const XZ_COMPRESSED_TAR: &str = "application/x-xz-compressed-tar";
pub const BZIP_COMPRESSED_TAR: &str = "application/x-bzip-compressed-tar";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Direct parent of each type that has one.
const HIERARCHY: &[(&str, &str)] = &[
    (COMPRESSED_TAR, GZIP),
    (XZ_COMPRESSED_TAR, XZ),
    (BZIP_COMPRESSED_TAR, BZIP2),
];

/// Compound suffixes are listed before the single ones they end with.
const SUFFIXES: &[(&str, &str)] = &[
    (".tar.gz", COMPRESSED_TAR),
    (".tgz", COMPRESSED_TAR),
    (".tar.xz", XZ_COMPRESSED_TAR),
    (".txz", XZ_COMPRESSED_TAR),
    (".tar.bz2", BZIP_COMPRESSED_TAR),
    (".tbz2", BZIP_COMPRESSED_TAR),
    (".tbz", BZIP_COMPRESSED_TAR),
    (".tar", TAR),
    (".zip", ZIP),
    (".7z", SEVEN_ZIP),
    (".gz", GZIP),
    (".xz", XZ),
    (".bz2", BZIP2),
];

/// A detected media type together with its ancestors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    name: String,
    ancestors: Vec<String>,
}

impl MediaType {
    /// Create a media type, looking up its ancestors in the built-in hierarchy
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut ancestors = Vec::new();
        let mut current = name.as_str();
        while let Some((_, parent)) = HIERARCHY.iter().find(|(child, _)| *child == current) {
            ancestors.push(parent.to_string());
            current = parent;
        }
        Self { name, ancestors }
    }

    /// The canonical type string, e.g. `application/zip`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All ancestors, nearest first
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Whether this type is `candidate` or derives from it.
    pub fn inherits(&self, candidate: &str) -> bool {
        self.name == candidate || self.ancestors.iter().any(|a| a == candidate)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Detects the media type of a file
pub trait MediaTypeDetector: Send + Sync {
    fn detect(&self, path: &Path) -> MediaType;
}

impl<F> MediaTypeDetector for F
where
    F: Fn(&Path) -> MediaType + Send + Sync,
{
    fn detect(&self, path: &Path) -> MediaType {
        self(path)
    }
}

/// Default detector: magic bytes, refined or replaced by the file name
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingDetector;

impl SniffingDetector {
    /// Bytes needed to see the `ustar` marker of a tar header.
    const HEADER_LEN: usize = 512;

    fn read_header(path: &Path) -> Option<Vec<u8>> {
        let file = File::open(path).ok()?;
        let mut header = Vec::with_capacity(Self::HEADER_LEN);
        file.take(Self::HEADER_LEN as u64)
            .read_to_end(&mut header)
            .ok()?;
        Some(header)
    }

    fn from_magic(header: &[u8]) -> Option<&'static str> {
        if header.starts_with(b"PK\x03\x04")
            || header.starts_with(b"PK\x05\x06")
            || header.starts_with(b"PK\x07\x08")
        {
            Some(ZIP)
        } else if header.starts_with(b"7z\xBC\xAF\x27\x1C") {
            Some(SEVEN_ZIP)
        } else if header.starts_with(&[0x1F, 0x8B]) {
            Some(GZIP)
        } else if header.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(XZ)
        } else if header.starts_with(b"BZh") {
            Some(BZIP2)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(TAR)
        } else {
            None
        }
    }

    fn from_name(path: &Path) -> Option<&'static str> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, media_type)| *media_type)
    }
}

impl MediaTypeDetector for SniffingDetector {
    fn detect(&self, path: &Path) -> MediaType {
        let by_name = Self::from_name(path);
        let by_magic = Self::read_header(path).and_then(|h| Self::from_magic(&h));

        let detected = match (by_magic, by_name) {
            // A compressed stream whose name says tar inside is a compressed tarball.
            (Some(magic), Some(name)) if MediaType::new(name).inherits(magic) => name,
            (Some(magic), _) => magic,
            (None, Some(name)) => name,
            (None, None) => OCTET_STREAM,
        };
        debug!(path = %path.display(), media_type = detected, "Detected media type");
        MediaType::new(detected)
    }
}
