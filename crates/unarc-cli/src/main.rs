//! unarc-cli - Command-line interface for unarc
//!
//! This crate provides the `unarc` binary:
//! - Archive extraction through whichever unarchiving tool is installed
//! - Media type detection for a single file
//! - A report of the tool catalog and what resolves on this host

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use unarc_core::Config;

mod extract;
mod report;

/// unarc - Extract archives with the tools already on your system
///
/// unarc picks an installed unarchiving tool (unzip, 7z, cmake, tar, gzip)
/// for the archive's format and runs it into the output directory.
#[derive(Parser)]
#[command(name = "unarc")]
#[command(author, version, about = "Extract archives with the tools already on your system", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show a spinner instead of the tool's output
    #[arg(long, global = true)]
    progress: bool,

    /// Use this configuration file instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an archive
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// File name for the output of single-file decompressors such as gzip
        #[arg(long)]
        stream_name: Option<String>,
    },

    /// Detect the media type of a file
    Detect {
        /// File to inspect
        file: PathBuf,
    },

    /// List the known unarchiving tools and whether they are installed
    Tools {
        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "path")]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with = "show")]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let result = run();

    match result {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(),
    };
    Ok(config)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Extract {
            archive,
            output,
            stream_name,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            info!("Extracting {} into {}", archive.display(), output_dir.display());

            extract::extract(
                &config,
                &archive,
                &output_dir,
                extract::OutputMode::new(cli.progress, cli.quiet),
                stream_name,
            )?;
            info!("Extraction complete");
        }

        Commands::Detect { file } => {
            report::detect(&file)?;
        }

        Commands::Tools { json } => {
            let config = load_config(cli.config.as_deref())?;
            report::tools(&config, json)?;
        }

        Commands::Config { show, path } => {
            if show {
                let config = match cli.config.as_deref() {
                    Some(path) => Config::load_from(path)?,
                    None => Config::load()?,
                };
                println!("{}", toml::to_string_pretty(&config)?);
            } else if path {
                let config_path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()
                        .map_err(|e| anyhow::anyhow!("Failed to get config path: {}", e))?,
                };
                println!("{}", config_path.display());
            } else {
                eprintln!("Please specify --show or --path");
            }
        }
    }

    Ok(())
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: Configuration or other error
/// - 2: IO error
/// - 3: Unsupported format, missing tool or invalid input
/// - 4: The extraction tool failed
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<unarc_core::Error>() {
        match core_err {
            unarc_core::Error::UnsupportedFormat(_) => 3,
            unarc_core::Error::NoExecutableFound { .. } => 3,
            unarc_core::Error::MissingSource => 3,
            unarc_core::Error::MissingDestination => 3,
            unarc_core::Error::DestinationNotWritable { .. } => 2,
            unarc_core::Error::OutputOpenFailed { .. } => 2,
            unarc_core::Error::OutputWriteFailed { .. } => 2,
            unarc_core::Error::ProcessFailed => 4,
            unarc_core::Error::Io(_) => 2,
            unarc_core::Error::Config(_) => 1,
        }
    } else if err.is::<std::io::Error>() {
        2
    } else {
        1
    }
}
