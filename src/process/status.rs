//! Lifecycle state of a child process.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

use super::error::ProcessError;

/// Terminal (or state-change) outcome reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with the given status code.
    Exited(i32),
    /// Terminated by a signal.
    Signaled(Signal),
    /// Stopped by a signal.
    Stopped(Signal),
    /// Resumed by `SIGCONT`.
    Continued,
}

impl ExitOutcome {
    /// Returns `true` only for a zero exit status.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// `Ok` for a zero exit status, the matching structured error otherwise.
    ///
    /// # Errors
    ///
    /// `NonZeroExit`, `Signaled`, `Stopped` or `Continued`.
    pub const fn into_result(self) -> Result<(), ProcessError> {
        match self {
            Self::Exited(0) => Ok(()),
            Self::Exited(code) => Err(ProcessError::NonZeroExit(code)),
            Self::Signaled(signal) => Err(ProcessError::Signaled(signal)),
            Self::Stopped(signal) => Err(ProcessError::Stopped(signal)),
            Self::Continued => Err(ProcessError::Continued),
        }
    }
}

impl TryFrom<WaitStatus> for ExitOutcome {
    type Error = ProcessError;

    fn try_from(status: WaitStatus) -> Result<Self, ProcessError> {
        match status {
            WaitStatus::Exited(_, code) => Ok(Self::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Ok(Self::Signaled(signal)),
            WaitStatus::Stopped(_, signal) => Ok(Self::Stopped(signal)),
            WaitStatus::Continued(_) => Ok(Self::Continued),
            other => Err(ProcessError::Abnormal(format!("{other:?}"))),
        }
    }
}

/// Last known state of a [`SubProcess`](super::SubProcess).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// Not reaped yet.
    #[default]
    Running,
    /// Exited with the given status code.
    Exited(i32),
    /// Terminated by a signal.
    Signaled(Signal),
    /// Stopped by a signal.
    Stopped(Signal),
    /// Resumed by `SIGCONT`.
    Continued,
}

impl ProcessState {
    /// Returns `true` until the child has been reaped.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl From<ExitOutcome> for ProcessState {
    fn from(outcome: ExitOutcome) -> Self {
        match outcome {
            ExitOutcome::Exited(code) => Self::Exited(code),
            ExitOutcome::Signaled(signal) => Self::Signaled(signal),
            ExitOutcome::Stopped(signal) => Self::Stopped(signal),
            ExitOutcome::Continued => Self::Continued,
        }
    }
}
