//! Error type for sub-process management.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

use crate::core::TaskError;

use super::pid::Pid;

/// Errors produced while spawning, redirecting, reaping or killing children.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The command could not be started (not found, not executable, bad cwd).
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        /// Command that was requested.
        cmd: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// A redirect file could not be opened.
    #[error("failed to open redirect file {}: {source}", path.display())]
    Redirect {
        /// File that was requested.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The child exited with a non-zero status.
    #[error("process exited with status {0}")]
    NonZeroExit(i32),
    /// The child was terminated by a signal.
    #[error("process terminated by signal {0}")]
    Signaled(Signal),
    /// The child was stopped by a signal.
    #[error("process stopped by signal {0}")]
    Stopped(Signal),
    /// The child was resumed by `SIGCONT`.
    #[error("process continued")]
    Continued,
    /// `waitpid` reported a state this crate does not model.
    #[error("process changed state unexpectedly: {0}")]
    Abnormal(String),
    /// The pid is not a live child owned by this manager.
    #[error("No such pid: {0}")]
    NoSuchPid(Pid),
    /// `waitpid` itself failed.
    #[error("waitpid failed: {0}")]
    Wait(#[source] Errno),
    /// `kill` failed, typically because the child was already reaped.
    #[error("failed to kill process {pid}: {source}")]
    Kill {
        /// Target pid.
        pid: Pid,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// Reading captured output failed.
    #[error("failed to read captured output: {0}")]
    Capture(#[source] io::Error),
    /// Writing fed input failed.
    #[error("failed to feed child input: {0}")]
    Feed(#[source] io::Error),
    /// The redirect was never attached to a child.
    #[error("redirect has not been attached to a process")]
    CaptureNotStarted,
    /// The redirect result was already taken.
    #[error("redirect result already taken")]
    OutputTaken,
    /// The redirect handle is already in use by another child.
    #[error("redirect is already attached to a process")]
    AlreadyAttached,
    /// A capture or feed thread failed.
    #[error(transparent)]
    Task(#[from] TaskError),
}
