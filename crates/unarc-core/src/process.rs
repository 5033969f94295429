//! Child process supervision
//!
//! A [`Process`] runs one command and reports what happens to it as a stream
//! of [`ProcessEvent`]s: chunks of stdout and stderr as they become
//! available, then exactly one [`ProcessEvent::Done`]. Every output chunk is
//! delivered before `Done`.

use crate::command::CommandLine;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const READ_CHUNK: usize = 8 * 1024;

/// Where stderr goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// stdout and stderr are reported separately
    #[default]
    Separate,
    /// stderr is reported as stdout
    Merged,
}

/// What to run and where
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub command: CommandLine,
    pub working_dir: PathBuf,
    pub channel_mode: ChannelMode,
}

impl ProcessSpec {
    pub fn new(command: CommandLine, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
            channel_mode: ChannelMode::Separate,
        }
    }

    pub fn merged(mut self) -> Self {
        self.channel_mode = ChannelMode::Merged;
        self
    }
}

/// How a process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Exit code zero
    FinishedWithSuccess,
    /// Non-zero exit code, or terminated by a signal (`None`)
    FinishedWithError(Option<i32>),
    /// The process could not be started at all
    StartFailed(String),
    /// Terminated through [`Process::kill`]
    Killed,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::FinishedWithSuccess)
    }
}

/// Notification from a running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Done(ProcessResult),
}

/// Handle to a started process
#[derive(Debug)]
pub struct Process {
    events: mpsc::UnboundedReceiver<ProcessEvent>,
    kill: Option<oneshot::Sender<()>>,
}

impl Process {
    /// Spawn the command in the background. Must be called from within a
    /// Tokio runtime; start failures are reported as an event, not an error.
    pub fn start(spec: ProcessSpec) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(supervise(spec, event_tx, kill_rx));
        Self {
            events: event_rx,
            kill: Some(kill_tx),
        }
    }

    /// Next notification; `None` once `Done` has been delivered.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    /// Ask the process to terminate. The `Done` event still follows.
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }

    /// Discard remaining output and return the final result
    pub async fn wait(&mut self) -> ProcessResult {
        while let Some(event) = self.next_event().await {
            if let ProcessEvent::Done(result) = event {
                return result;
            }
        }
        ProcessResult::FinishedWithError(None)
    }
}

async fn supervise(
    spec: ProcessSpec,
    events: mpsc::UnboundedSender<ProcessEvent>,
    kill: oneshot::Receiver<()>,
) {
    let mut command = spec.command.to_tokio_command();
    command
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(command = %spec.command, error = %err, "Failed to start process");
            let message = format!(
                "Failed to start {}: {}",
                spec.command.executable().display(),
                err
            );
            let _ = events.send(ProcessEvent::Done(ProcessResult::StartFailed(message)));
            return;
        }
    };
    debug!(command = %spec.command, pid = ?child.id(), "Process started");

    let stderr_as: fn(Vec<u8>) -> ProcessEvent = match spec.channel_mode {
        ChannelMode::Separate => ProcessEvent::Stderr,
        ChannelMode::Merged => ProcessEvent::Stdout,
    };
    let readers: Vec<_> = [
        child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward(out, events.clone(), ProcessEvent::Stdout))),
        child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward(err, events.clone(), stderr_as))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let result = tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => ProcessResult::FinishedWithSuccess,
            Ok(status) => ProcessResult::FinishedWithError(status.code()),
            Err(err) => {
                warn!(error = %err, "Failed to wait for process");
                ProcessResult::FinishedWithError(None)
            }
        },
        Ok(()) = kill => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "Failed to kill process");
            }
            ProcessResult::Killed
        }
    };

    for reader in readers {
        let _ = reader.await;
    }
    debug!(command = %spec.command, ?result, "Process finished");
    let _ = events.send(ProcessEvent::Done(result));
}

async fn forward<R>(
    mut reader: R,
    events: mpsc::UnboundedSender<ProcessEvent>,
    wrap: fn(Vec<u8>) -> ProcessEvent,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                // Drain even when nobody listens.
                let _ = events.send(wrap(buf[..n].to_vec()));
            }
            Err(err) => {
                warn!(error = %err, "Failed to read process output");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", ["-c", script])
    }

    async fn collect(mut process: Process) -> (Vec<u8>, Vec<u8>, ProcessResult) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        while let Some(event) = process.next_event().await {
            match event {
                ProcessEvent::Stdout(data) => out.extend(data),
                ProcessEvent::Stderr(data) => err.extend(data),
                ProcessEvent::Done(result) => return (out, err, result),
            }
        }
        panic!("process ended without Done");
    }

    #[tokio::test]
    async fn test_separate_channels() {
        let dir = TempDir::new().unwrap();
        let process = Process::start(ProcessSpec::new(
            sh("printf out; printf err >&2"),
            dir.path(),
        ));
        let (out, err, result) = collect(process).await;
        assert_eq!(out, b"out");
        assert_eq!(err, b"err");
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_merged_channels() {
        let dir = TempDir::new().unwrap();
        let process = Process::start(
            ProcessSpec::new(sh("printf a; printf b >&2"), dir.path()).merged(),
        );
        let (out, err, _) = collect(process).await;
        assert!(err.is_empty());
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = TempDir::new().unwrap();
        let process = Process::start(ProcessSpec::new(sh("touch here"), dir.path()));
        let (_, _, result) = collect(process).await;
        assert!(result.is_success());
        assert!(dir.path().join("here").exists());
    }

    #[tokio::test]
    async fn test_exit_code_reported() {
        let dir = TempDir::new().unwrap();
        let process = Process::start(ProcessSpec::new(sh("exit 3"), dir.path()));
        let (_, _, result) = collect(process).await;
        assert_eq!(result, ProcessResult::FinishedWithError(Some(3)));
    }

    #[tokio::test]
    async fn test_start_failure() {
        let dir = TempDir::new().unwrap();
        let command = CommandLine::new(dir.path().join("missing-tool"), ["x"]);
        let process = Process::start(ProcessSpec::new(command, dir.path()));
        let (_, _, result) = collect(process).await;
        assert!(matches!(result, ProcessResult::StartFailed(ref msg) if msg.contains("missing-tool")));
    }

    #[tokio::test]
    async fn test_kill() {
        let dir = TempDir::new().unwrap();
        let mut process = Process::start(ProcessSpec::new(sh("exec sleep 30"), dir.path()));
        process.kill();
        assert_eq!(process.wait().await, ProcessResult::Killed);
    }
}
