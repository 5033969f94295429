//! The `Unarchiver` façade
//!
//! ```no_run
//! use unarc_core::Unarchiver;
//!
//! # async fn demo() -> unarc_core::Result<()> {
//! let mut unarchiver = Unarchiver::new();
//! unarchiver.set_source("release.zip")?;
//! unarchiver.set_destination("out");
//! let result = unarchiver.run(|line| print!("{line}")).await;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

use crate::executor::{DoneResult, Event, ExtractionRequest, ExtractionState, Executor};
use crate::resolver::{Resolver, SourceAndCommand};
use crate::Result;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tracing::error;

/// Used when no name is set and none can be derived from the source.
pub const DEFAULT_STREAM_FILE_NAME: &str = "output";

/// Extracts one archive at a time with an external tool
#[derive(Debug, Default)]
pub struct Unarchiver {
    resolver: Resolver,
    source_and_command: Option<SourceAndCommand>,
    destination: Option<PathBuf>,
    stream_file_name: Option<String>,
    state: Option<watch::Receiver<ExtractionState>>,
}

impl Unarchiver {
    pub fn new() -> Self {
        Self::with_resolver(Resolver::new())
    }

    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            resolver,
            source_and_command: None,
            destination: None,
            stream_file_name: None,
            state: None,
        }
    }

    /// Resolve a tool for `source`. On failure the previous source is cleared.
    pub fn set_source(&mut self, source: impl AsRef<Path>) -> Result<()> {
        self.source_and_command = None;
        self.source_and_command = Some(self.resolver.resolve(source.as_ref())?);
        Ok(())
    }

    /// Use an already resolved source and command
    pub fn set_source_and_command(&mut self, source_and_command: SourceAndCommand) {
        self.source_and_command = Some(source_and_command);
    }

    pub fn set_destination(&mut self, destination: impl Into<PathBuf>) {
        self.destination = Some(destination.into());
    }

    /// Name of the file a stream decompressor writes into the destination
    pub fn set_stream_file_name(&mut self, name: impl Into<String>) {
        self.stream_file_name = Some(name.into());
    }

    pub fn source_and_command(&self) -> Option<&SourceAndCommand> {
        self.source_and_command.as_ref()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// The explicit name, else the source name minus its last extension
    pub fn stream_file_name(&self) -> String {
        if let Some(name) = &self.stream_file_name {
            return name.clone();
        }
        self.source_and_command
            .as_ref()
            .and_then(|sac| sac.source_file().file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| DEFAULT_STREAM_FILE_NAME.to_string())
    }

    pub fn state(&self) -> ExtractionState {
        self.state
            .as_ref()
            .map(|state| *state.borrow())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// Start extracting in the background and return the event stream.
    ///
    /// Must be called from within a Tokio runtime. Starting while a previous
    /// extraction of this instance is still running is a caller bug: the
    /// call is refused and the returned stream holds only `Done(Error)`.
    pub fn start(&mut self) -> Extraction {
        if self.is_running() {
            error!("Unarchiver::start() called while an extraction is still running");
            return Extraction::rejected();
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ExtractionState::Launching);
        self.state = Some(state_rx);

        let request = ExtractionRequest {
            source_and_command: self.source_and_command.clone(),
            destination: self.destination.clone(),
            stream_file_name: self.stream_file_name(),
        };
        tokio::spawn(Executor::new(event_tx, state_tx).run(request));

        Extraction { events: event_rx }
    }

    /// Start and wait for the result, handing every output line to `on_output`
    pub async fn run(&mut self, on_output: impl FnMut(&str)) -> DoneResult {
        self.start().finish(on_output).await
    }
}

/// Event stream of one started extraction
#[derive(Debug)]
pub struct Extraction {
    events: mpsc::UnboundedReceiver<Event>,
}

impl Extraction {
    fn rejected() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(Event::Done(DoneResult::Error));
        Self { events: event_rx }
    }

    /// Next event; `None` after `Done` was delivered
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Drive the stream to the end
    pub async fn finish(mut self, mut on_output: impl FnMut(&str)) -> DoneResult {
        while let Some(event) = self.recv().await {
            match event {
                Event::Output(text) => on_output(&text),
                Event::Done(result) => return result,
            }
        }
        DoneResult::Error
    }
}
