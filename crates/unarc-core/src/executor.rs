//! Running one extraction
//!
//! The executor drives a single extraction through
//! `Launching -> Running -> Done`. Progress reaches the caller as
//! [`Event::Output`] lines followed by exactly one [`Event::Done`].

use crate::catalog::ToolKind;
use crate::command::{render, CommandLine};
use crate::process::{Process, ProcessEvent, ProcessResult, ProcessSpec};
use crate::resolver::SourceAndCommand;
use crate::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Terminal verdict of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneResult {
    Success,
    Error,
}

impl DoneResult {
    pub fn from_success(success: bool) -> Self {
        if success {
            DoneResult::Success
        } else {
            DoneResult::Error
        }
    }

    pub fn is_success(self) -> bool {
        self == DoneResult::Success
    }
}

/// Notification delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Human readable progress or diagnostic text
    Output(String),
    /// The extraction is over; nothing follows
    Done(DoneResult),
}

/// Lifecycle of one extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionState {
    #[default]
    Idle,
    Launching,
    Running,
    Done(DoneResult),
}

impl ExtractionState {
    /// Launching or running
    pub fn is_active(self) -> bool {
        matches!(self, ExtractionState::Launching | ExtractionState::Running)
    }
}

/// Everything one run needs, captured when it starts
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub source_and_command: Option<SourceAndCommand>,
    pub destination: Option<PathBuf>,
    /// File name for the output of a stream decompressor
    pub stream_file_name: String,
}

/// Runs one [`ExtractionRequest`] to completion
#[derive(Debug)]
pub struct Executor {
    events: mpsc::UnboundedSender<Event>,
    state: watch::Sender<ExtractionState>,
}

impl Executor {
    pub fn new(events: mpsc::UnboundedSender<Event>, state: watch::Sender<ExtractionState>) -> Self {
        Self { events, state }
    }

    /// Run the request and emit the terminal event. Consumes the executor:
    /// a terminal state is never left again.
    pub async fn run(self, request: ExtractionRequest) -> DoneResult {
        self.state.send_replace(ExtractionState::Launching);

        let done = match self.execute(request).await {
            Ok(()) => DoneResult::Success,
            Err(err) => {
                warn!(error = %err, "Extraction failed");
                self.output(err.to_string());
                DoneResult::Error
            }
        };

        self.state.send_replace(ExtractionState::Done(done));
        let _ = self.events.send(Event::Done(done));
        done
    }

    fn output(&self, text: impl Into<String>) {
        let _ = self.events.send(Event::Output(text.into()));
    }

    /// Emit decoded tool output, skipping chunks that were held back entirely.
    fn forward(&self, text: String) {
        if !text.is_empty() {
            self.output(text);
        }
    }

    async fn execute(&self, request: ExtractionRequest) -> Result<()> {
        let source_and_command = request.source_and_command.ok_or(Error::MissingSource)?;
        let destination = request.destination.ok_or(Error::MissingDestination)?;

        // The tool runs inside the destination, so relative paths would
        // resolve against the wrong directory.
        let source = std::path::absolute(source_and_command.source_file())?;
        let destination =
            std::path::absolute(&destination).map_err(|source| Error::DestinationNotWritable {
                path: destination.clone(),
                source,
            })?;

        ensure_writable_dir(&destination).await?;
        let command = render(source_and_command.command(), &source, &destination);

        match source_and_command.kind() {
            ToolKind::Archive => self.extract_archive(command, &destination).await,
            ToolKind::StreamDecompressor => {
                self.decompress_stream(command, &destination, &request.stream_file_name)
                    .await
            }
        }
    }

    fn announce(&self, command: &CommandLine, destination: &Path) {
        info!(command = %command, destination = %destination.display(), "Running extraction tool");
        self.output(format!(
            "Running {}\nin \"{}\".\n\n",
            command.to_user_output(),
            destination.display()
        ));
    }

    fn start_process(&self, spec: ProcessSpec) -> Process {
        let process = Process::start(spec);
        self.state.send_replace(ExtractionState::Running);
        process
    }

    /// The tool unpacks into its working directory; everything it prints is
    /// forwarded verbatim.
    async fn extract_archive(&self, command: CommandLine, destination: &Path) -> Result<()> {
        self.announce(&command, destination);
        let mut process = self.start_process(ProcessSpec::new(command, destination).merged());
        let mut decoder = OutputDecoder::default();

        while let Some(event) = process.next_event().await {
            match event {
                ProcessEvent::Stdout(data) | ProcessEvent::Stderr(data) => {
                    self.forward(decoder.decode(&data))
                }
                ProcessEvent::Done(result) => {
                    self.forward(decoder.finish());
                    return self.check(result);
                }
            }
        }
        Err(Error::ProcessFailed)
    }

    /// The tool writes the payload to stdout; it goes into
    /// `destination/file_name`. stderr is diagnostics and is forwarded.
    async fn decompress_stream(
        &self,
        command: CommandLine,
        destination: &Path,
        file_name: &str,
    ) -> Result<()> {
        let path = destination.join(file_name);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|source| Error::OutputOpenFailed {
                path: path.clone(),
                source,
            })?;

        self.announce(&command, destination);
        let mut process = self.start_process(ProcessSpec::new(command, destination));

        let mut diagnostics = OutputDecoder::default();
        let mut result = ProcessResult::FinishedWithError(None);
        while let Some(event) = process.next_event().await {
            match event {
                ProcessEvent::Stdout(data) => {
                    if let Err(source) = write_chunk(&mut file, &data).await {
                        // The tool must not outlive the run.
                        process.kill();
                        let _ = process.wait().await;
                        discard(file, &path).await;
                        return Err(Error::OutputWriteFailed { path, source });
                    }
                }
                ProcessEvent::Stderr(data) => self.forward(diagnostics.decode(&data)),
                ProcessEvent::Done(done) => {
                    result = done;
                    break;
                }
            }
        }
        self.forward(diagnostics.finish());

        if let Err(source) = close(&mut file).await {
            discard(file, &path).await;
            return Err(Error::OutputWriteFailed { path, source });
        }
        if !result.is_success() {
            discard(file, &path).await;
        }
        self.check(result)
    }

    fn check(&self, result: ProcessResult) -> Result<()> {
        match result {
            ProcessResult::FinishedWithSuccess => Ok(()),
            ProcessResult::StartFailed(message) => {
                self.output(message);
                Err(Error::ProcessFailed)
            }
            ProcessResult::FinishedWithError(_) | ProcessResult::Killed => Err(Error::ProcessFailed),
        }
    }
}

/// Write and flush so a failing write surfaces while the tool still runs.
async fn write_chunk(file: &mut File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

/// Lossy UTF-8 decoding of a chunked byte stream.
///
/// A multi-byte character split across two chunks is held back until its
/// remaining bytes arrive instead of being replaced twice.
#[derive(Debug, Default)]
struct OutputDecoder {
    pending: Vec<u8>,
}

impl OutputDecoder {
    fn decode(&mut self, data: &[u8]) -> String {
        self.pending.extend_from_slice(data);
        let split = self.pending.len() - incomplete_tail(&self.pending);
        let text = String::from_utf8_lossy(&self.pending[..split]).into_owned();
        self.pending.drain(..split);
        text
    }

    /// Whatever is still held back, decoded as is.
    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Number of trailing bytes that start a UTF-8 sequence without finishing it.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

async fn close(file: &mut File) -> io::Result<()> {
    file.flush().await?;
    file.sync_all().await
}

/// Drop a partially written output file.
async fn discard(file: File, path: &Path) {
    drop(file);
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "Failed to remove partial output");
        }
    }
}

/// Create `dir` if needed and make sure it can be written to.
pub async fn ensure_writable_dir(dir: &Path) -> Result<()> {
    let not_writable = |source| Error::DestinationNotWritable {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).await.map_err(not_writable)?;
    let metadata = fs::metadata(dir).await.map_err(not_writable)?;
    if !metadata.is_dir() {
        return Err(not_writable(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }
    // Permission bits alone do not tell whether this user may write here.
    let target = dir.to_path_buf();
    tokio::task::spawn_blocking(move || tempfile::tempfile_in(target))
        .await
        .map_err(|err| not_writable(io::Error::new(io::ErrorKind::Other, err)))?
        .map_err(not_writable)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_under_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let err = ensure_writable_dir(&file.join("sub")).await.unwrap_err();
        assert!(matches!(err, Error::DestinationNotWritable { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_reported_before_done() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ExtractionState::Idle);
        let request = ExtractionRequest {
            source_and_command: None,
            destination: Some(PathBuf::from("/unused")),
            stream_file_name: "out".into(),
        };

        let done = Executor::new(event_tx, state_tx).run(request).await;
        assert_eq!(done, DoneResult::Error);
        assert_eq!(
            event_rx.recv().await,
            Some(Event::Output("No source file set.".into()))
        );
        assert_eq!(event_rx.recv().await, Some(Event::Done(DoneResult::Error)));
        assert_eq!(event_rx.recv().await, None);
        assert_eq!(*state_rx.borrow(), ExtractionState::Done(DoneResult::Error));
    }

    #[test]
    fn test_decoder_joins_characters_split_across_chunks() {
        let text = "café costs 5€ 🎉";
        let bytes = text.as_bytes();
        let mut decoder = OutputDecoder::default();
        let mut decoded = String::new();
        for chunk in bytes.chunks(1) {
            decoded.push_str(&decoder.decode(chunk));
        }
        decoded.push_str(&decoder.finish());
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_decoder_holds_back_only_the_incomplete_tail() {
        let euro = "€".as_bytes();
        let mut decoder = OutputDecoder::default();
        assert_eq!(decoder.decode(&[b'a', euro[0], euro[1]]), "a");
        assert_eq!(decoder.decode(&euro[2..]), "€");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = OutputDecoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_state_activity() {
        assert!(!ExtractionState::Idle.is_active());
        assert!(ExtractionState::Launching.is_active());
        assert!(ExtractionState::Running.is_active());
        assert!(!ExtractionState::Done(DoneResult::Success).is_active());
    }
}
