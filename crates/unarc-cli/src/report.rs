//! `detect` and `tools` output

use anyhow::Result;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use unarc_core::catalog::ToolKind;
use unarc_core::mime::SniffingDetector;
use unarc_core::{Catalog, Config, MediaTypeDetector};

/// One catalog entry as reported by `unarc tools`
#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub kind: &'static str,
    pub command: String,
    pub media_types: Vec<String>,
    pub path: Option<PathBuf>,
    pub disabled: bool,
}

impl ToolStatus {
    fn status(&self) -> &'static str {
        if self.disabled {
            "disabled"
        } else if self.path.is_some() {
            "found"
        } else {
            "missing"
        }
    }
}

fn kind_name(kind: &ToolKind) -> &'static str {
    match kind {
        ToolKind::Archive => "archive",
        ToolKind::StreamDecompressor => "stream",
    }
}

/// Resolution status of every catalog entry, in priority order
pub fn tool_statuses(config: &Config) -> Vec<ToolStatus> {
    config
        .resolver()
        .probe()
        .into_iter()
        .map(|probe| ToolStatus {
            name: probe.tool.display_name(),
            kind: kind_name(probe.tool.kind()),
            command: probe.tool.command().to_user_output(),
            media_types: probe.tool.supported_media_types().to_vec(),
            path: probe.resolved,
            disabled: probe.disabled,
        })
        .collect()
}

pub fn tools(config: &Config, json: bool) -> Result<()> {
    let statuses = tool_statuses(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<8} {:<10} {}",
        "Tool", "Kind", "Status", "Location"
    );
    println!("{}", "-".repeat(72));
    for status in &statuses {
        let location = status
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<8} {:<10} {}",
            status.name,
            status.kind,
            status.status(),
            location
        );
    }
    Ok(())
}

pub fn detect(file: &Path) -> Result<()> {
    if !file.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File not found: {}", file.display()),
        )
        .into());
    }

    let media_type = SniffingDetector.detect(file);
    println!("{}", media_type);
    for ancestor in media_type.ancestors() {
        println!("  inherits {}", ancestor);
    }

    let candidates: Vec<String> = Catalog::global()
        .tools_for(&media_type)
        .map(|tool| tool.display_name())
        .collect();
    if candidates.is_empty() {
        println!("No tool supports this format");
    } else {
        println!("Candidates: {}", candidates.join(", "));
    }
    Ok(())
}
