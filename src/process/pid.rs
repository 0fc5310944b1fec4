//! Process identifier newtype.

use std::fmt;

use nix::sys::signal::{self, Signal};
use nix::unistd;

/// OS process id of a child started by a [`ProcessManager`](super::ProcessManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(i32);

impl Pid {
    /// Wraps a raw pid.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw pid value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Sends `SIGKILL` to the process.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by `kill(2)`, e.g. `ESRCH` once the process
    /// has been reaped.
    pub fn kill(self) -> nix::Result<()> {
        self.signal(Signal::SIGKILL)
    }

    /// Sends `sig` to the process.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by `kill(2)`.
    pub fn signal(self, sig: Signal) -> nix::Result<()> {
        signal::kill(self.into(), sig)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<unistd::Pid> for Pid {
    fn from(pid: unistd::Pid) -> Self {
        Self(pid.as_raw())
    }
}

impl From<Pid> for unistd::Pid {
    fn from(pid: Pid) -> Self {
        Self::from_raw(pid.0)
    }
}
