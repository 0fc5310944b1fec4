//! Standard stream redirection for child processes.
//!
//! Each of a child's three standard streams is described by an
//! [`InputSpec`] (stdin) or an [`OutputSpec`] (stdout/stderr). Resolution
//! happens in two steps: `stdio` produces the
//! `std::process::Stdio` handed to the launcher, and `attach` receives the
//! parent-side end of a pipe once the child exists.
//!
//! The handle types ([`Pipe`], [`OutputCapture`], [`InputFeed`]) are cheap to
//! clone; the caller keeps one clone and passes the other in the `InputSpec`
//! or `OutputSpec`. A handle serves exactly one child.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::oneshot;
use crate::core::{BackgroundTask, TaskError};

use super::error::ProcessError;
use super::pid::Pid;

#[derive(Debug)]
enum PipeEnd {
    Unattached,
    Open(File),
    Closed,
}

/// Parent-side end of a pipe connected to a child's standard stream.
///
/// For stdin the parent writes into the pipe; for stdout/stderr it reads from
/// it. Reads and writes hold the pipe's lock for their whole duration.
#[derive(Clone)]
pub struct Pipe {
    end: Arc<Mutex<PipeEnd>>,
}

impl Pipe {
    /// Creates an unattached pipe handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            end: Arc::new(Mutex::new(PipeEnd::Unattached)),
        }
    }

    /// Takes ownership of the parent-side file, leaving the pipe closed.
    pub fn take(&self) -> Option<File> {
        let mut end = self.end.lock();
        if !matches!(*end, PipeEnd::Open(_)) {
            return None;
        }
        match mem::replace(&mut *end, PipeEnd::Closed) {
            PipeEnd::Open(file) => Some(file),
            PipeEnd::Unattached | PipeEnd::Closed => None,
        }
    }

    /// Closes the parent-side end. For a stdin pipe this delivers EOF.
    pub fn close(&self) {
        let mut end = self.end.lock();
        if matches!(*end, PipeEnd::Open(_)) {
            *end = PipeEnd::Closed;
        }
    }

    /// Returns `true` while the parent-side end is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.end.lock(), PipeEnd::Open(_))
    }

    /// Reads until the child closes its end.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the pipe is not open, otherwise the read error.
    pub fn read_to_string(&self) -> io::Result<String> {
        self.with_file(|file| {
            let mut out = String::new();
            file.read_to_string(&mut out)?;
            Ok(out)
        })
    }

    /// Writes all of `data` to the child.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the pipe is not open, otherwise the write error.
    pub fn write_all(&self, data: &[u8]) -> io::Result<()> {
        self.with_file(|file| file.write_all(data))
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        match &mut *self.end.lock() {
            PipeEnd::Open(file) => f(file),
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "pipe is not connected to a process",
            )),
        }
    }

    fn connect(&self, file: File) -> Result<(), ProcessError> {
        let mut end = self.end.lock();
        if !matches!(*end, PipeEnd::Unattached) {
            return Err(ProcessError::AlreadyAttached);
        }
        *end = PipeEnd::Open(file);
        Ok(())
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("connected", &self.is_connected())
            .finish()
    }
}

enum CaptureState {
    Pending,
    Running(BackgroundTask<io::Result<Vec<u8>>>),
    Taken,
}

/// Collects everything a child writes to stdout or stderr.
///
/// A background thread drains the pipe from the moment the child starts, so
/// the child never blocks on a full pipe buffer.
#[derive(Clone)]
pub struct OutputCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl OutputCapture {
    /// Creates a capture handle that is not yet attached to a child.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::Pending)),
        }
    }

    /// Waits for the child to close the stream and returns what it wrote,
    /// decoded as lossy UTF-8.
    ///
    /// # Errors
    ///
    /// `CaptureNotStarted` before the handle is attached, `OutputTaken` on a
    /// second call, `Capture` if reading the pipe failed.
    pub fn output(&self) -> Result<String, ProcessError> {
        let task = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, CaptureState::Taken) {
                CaptureState::Running(task) => task,
                CaptureState::Pending => {
                    *state = CaptureState::Pending;
                    return Err(ProcessError::CaptureNotStarted);
                }
                CaptureState::Taken => return Err(ProcessError::OutputTaken),
            }
        };
        let bytes = task.join()?.map_err(ProcessError::Capture)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn start(&self, thread_name: String, mut file: File) -> Result<(), ProcessError> {
        let mut state = self.state.lock();
        if !matches!(*state, CaptureState::Pending) {
            return Err(ProcessError::AlreadyAttached);
        }
        let task = BackgroundTask::spawn(thread_name, move || {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map(|_| buf)
        })?;
        *state = CaptureState::Running(task);
        Ok(())
    }
}

impl Default for OutputCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OutputCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            CaptureState::Pending => "pending",
            CaptureState::Running(_) => "running",
            CaptureState::Taken => "taken",
        };
        f.debug_struct("OutputCapture")
            .field("state", &state)
            .finish()
    }
}

type FeedJob = Box<dyn FnOnce() -> io::Result<()> + Send + 'static>;

enum FeedState {
    Pending(Vec<u8>),
    Running(BackgroundTask<io::Result<()>>),
    Finished,
}

/// Writes a fixed buffer to a child's stdin, then closes it.
#[derive(Clone)]
pub struct InputFeed {
    state: Arc<Mutex<FeedState>>,
}

impl InputFeed {
    /// Creates a feed that will write `data` once attached.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState::Pending(data.into()))),
        }
    }

    /// Waits for the feeder thread and reports whether every byte was written.
    ///
    /// # Errors
    ///
    /// `Feed` if the write failed (e.g. the child exited without reading),
    /// `CaptureNotStarted` before the handle is attached, `OutputTaken` on a
    /// second call.
    pub fn finish(&self) -> Result<(), ProcessError> {
        let task = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, FeedState::Finished) {
                FeedState::Running(task) => task,
                pending @ FeedState::Pending(_) => {
                    *state = pending;
                    return Err(ProcessError::CaptureNotStarted);
                }
                FeedState::Finished => return Err(ProcessError::OutputTaken),
            }
        };
        task.join()?.map_err(ProcessError::Feed)
    }

    fn start(&self, thread_name: String, file: File) -> Result<(), ProcessError> {
        self.start_with(file, |job| BackgroundTask::spawn(thread_name, job))
    }

    /// The buffer stays `Pending` until the feeder thread exists, so a failed
    /// spawn leaves the feed attachable.
    fn start_with<S>(&self, mut file: File, spawn: S) -> Result<(), ProcessError>
    where
        S: FnOnce(FeedJob) -> Result<BackgroundTask<io::Result<()>>, TaskError>,
    {
        let mut state = self.state.lock();
        if !matches!(*state, FeedState::Pending(_)) {
            return Err(ProcessError::AlreadyAttached);
        }
        let (data_tx, data_rx) = oneshot::channel::<Vec<u8>>();
        let task = spawn(Box::new(move || -> io::Result<()> {
            let Some(data) = data_rx.recv() else {
                return Ok(());
            };
            file.write_all(&data)?;
            // Dropping the file closes the pipe and delivers EOF.
            drop(file);
            Ok(())
        }))?;
        if let FeedState::Pending(data) = mem::replace(&mut *state, FeedState::Running(task)) {
            data_tx.send(data);
        }
        Ok(())
    }
}

impl fmt::Debug for InputFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            FeedState::Pending(data) => format!("pending ({} bytes)", data.len()),
            FeedState::Running(_) => "running".to_string(),
            FeedState::Finished => "finished".to_string(),
        };
        f.debug_struct("InputFeed").field("state", &state).finish()
    }
}

/// Where a child's stdin comes from.
#[derive(Debug, Clone, Default)]
pub enum InputSpec {
    /// Inherit the parent's stdin.
    #[default]
    Inherit,
    /// Read from an existing file.
    File(PathBuf),
    /// Read from a pipe the caller writes to.
    Pipe(Pipe),
    /// Read a fixed buffer, then EOF.
    Feed(InputFeed),
}

impl InputSpec {
    pub(crate) fn stdio(&self) -> Result<Stdio, ProcessError> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::File(path) => File::open(path)
                .map(Stdio::from)
                .map_err(|source| redirect_error(path, source)),
            Self::Pipe(_) | Self::Feed(_) => Ok(Stdio::piped()),
        }
    }

    pub(crate) fn attach(&self, pid: Pid, end: Option<File>) -> Result<(), ProcessError> {
        match (self, end) {
            (Self::Pipe(pipe), Some(file)) => pipe.connect(file),
            (Self::Feed(feed), Some(file)) => feed.start(format!("proc-{pid}-stdin"), file),
            _ => Ok(()),
        }
    }
}

/// Where a child's stdout or stderr goes.
#[derive(Debug, Clone, Default)]
pub enum OutputSpec {
    /// Inherit the parent's stream.
    #[default]
    Inherit,
    /// Create or truncate a file and write to it.
    File(PathBuf),
    /// Write to a pipe the caller reads from.
    Pipe(Pipe),
    /// Collect everything into a string.
    Capture(OutputCapture),
}

impl OutputSpec {
    pub(crate) fn stdio(&self) -> Result<Stdio, ProcessError> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::File(path) => File::create(path)
                .map(Stdio::from)
                .map_err(|source| redirect_error(path, source)),
            Self::Pipe(_) | Self::Capture(_) => Ok(Stdio::piped()),
        }
    }

    pub(crate) fn attach(
        &self,
        pid: Pid,
        stream: &str,
        end: Option<File>,
    ) -> Result<(), ProcessError> {
        match (self, end) {
            (Self::Pipe(pipe), Some(file)) => pipe.connect(file),
            (Self::Capture(capture), Some(file)) => {
                debug!(pid = %pid, stream = stream, "capturing child output");
                capture.start(format!("proc-{pid}-{stream}"), file)
            }
            _ => Ok(()),
        }
    }
}

fn redirect_error(path: &Path, source: io::Error) -> ProcessError {
    ProcessError::Redirect {
        path: path.to_path_buf(),
        source,
    }
}
