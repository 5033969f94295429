//! Extraction with console output

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use unarc_core::{Config, DoneResult};

/// Where the tool's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Printed to stdout as it arrives
    Stream,
    /// Latest line shown next to a spinner on stderr
    Spinner,
    /// Discarded
    Silent,
}

impl OutputMode {
    pub fn new(progress: bool, quiet: bool) -> Self {
        if quiet {
            OutputMode::Silent
        } else if progress {
            OutputMode::Spinner
        } else {
            OutputMode::Stream
        }
    }
}

fn spinner(archive: &Path) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix(format!("Extracting {}", archive.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Extract `archive` into `output_dir` using the tools allowed by `config`
pub fn extract(
    config: &Config,
    archive: &Path,
    output_dir: &Path,
    mode: OutputMode,
    stream_name: Option<String>,
) -> Result<()> {
    if !archive.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Archive not found: {}", archive.display()),
        )
        .into());
    }

    let mut unarchiver = config.unarchiver();
    unarchiver.set_source(archive)?;
    unarchiver.set_destination(output_dir);
    if let Some(name) = stream_name {
        unarchiver.set_stream_file_name(name);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let progress = (mode == OutputMode::Spinner).then(|| spinner(archive));
    let mut ends_with_newline = true;

    let result = runtime.block_on(unarchiver.run(|text| match (&progress, mode) {
        (Some(bar), _) => {
            if let Some(line) = last_line(text) {
                bar.set_message(line.to_string());
            }
        }
        (None, OutputMode::Stream) => {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
            if !text.is_empty() {
                ends_with_newline = text.ends_with('\n');
            }
        }
        (None, _) => {}
    }));

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    if !ends_with_newline {
        println!();
    }

    match result {
        DoneResult::Success => Ok(()),
        DoneResult::Error => Err(unarc_core::Error::ProcessFailed)
            .with_context(|| format!("Failed to extract {}", archive.display())),
    }
}
