//! Child process creation.

use std::fmt;
use std::fs::File;
use std::io;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::warn;

use super::pid::Pid;

/// Everything a launcher needs to start one child.
///
/// The `Stdio` values are already resolved from the process specs: inherited,
/// redirected to an opened file, or piped.
#[derive(Debug)]
pub struct LaunchRequest<'a> {
    /// Program to execute, looked up on `PATH` when it has no slash.
    pub cmd: &'a str,
    /// Arguments, not including the program name.
    pub args: &'a [String],
    /// Working directory of the child, or the parent's when `None`.
    pub cwd: Option<&'a Path>,
    /// Child stdin.
    pub stdin: Stdio,
    /// Child stdout.
    pub stdout: Stdio,
    /// Child stderr.
    pub stderr: Stdio,
}

/// A started child plus the parent-side ends of any piped streams.
#[derive(Debug)]
pub struct Launched {
    /// Child pid. The child must be reaped through `waitpid`, not through
    /// the launcher.
    pub pid: Pid,
    /// Write end of the child's stdin pipe.
    pub stdin: Option<File>,
    /// Read end of the child's stdout pipe.
    pub stdout: Option<File>,
    /// Read end of the child's stderr pipe.
    pub stderr: Option<File>,
}

/// Starts child processes.
///
/// Implementations must either return a running child or an error; an exec
/// failure in the child has to surface here as an `Err`, never as a child that
/// exits with a made-up status.
pub trait ProcessLauncher: Send + Sync + fmt::Debug + 'static {
    /// Start the child described by `request`.
    ///
    /// # Errors
    ///
    /// Any OS error raised while creating or executing the child.
    fn launch(&self, request: LaunchRequest<'_>) -> io::Result<Launched>;
}

/// Launcher built on `std::process::Command`.
///
/// `Command` performs fork, the descriptor redirections, `chdir` and exec in
/// the child, and reports an exec failure back to the parent through a
/// close-on-exec status pipe, so `launch` fails synchronously for a missing
/// program or working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, request: LaunchRequest<'_>) -> io::Result<Launched> {
        let mut command = Command::new(request.cmd);
        command
            .args(request.args)
            .stdin(request.stdin)
            .stdout(request.stdout)
            .stderr(request.stderr);
        if let Some(cwd) = request.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn()?;
        let pid = match i32::try_from(child.id()) {
            Ok(raw) => Pid::from_raw(raw),
            Err(e) => {
                warn!(pid = child.id(), "child pid out of range, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        };

        // `child` is dropped without waiting; reaping is done with waitpid.
        Ok(Launched {
            pid,
            stdin: child.stdin.take().map(into_file),
            stdout: child.stdout.take().map(into_file),
            stderr: child.stderr.take().map(into_file),
        })
    }
}

fn into_file(end: impl Into<OwnedFd>) -> File {
    File::from(end.into())
}
