//! Registry of running children and the handles used to reap them.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ProcessConfig;

use super::args::CreateProcessArgs;
use super::error::ProcessError;
use super::launcher::{CommandLauncher, LaunchRequest, Launched, ProcessLauncher};
use super::pid::Pid;
use super::status::{ExitOutcome, ProcessState};

/// A child reaped by [`ProcessManager::wait_any`].
#[derive(Debug, Clone)]
pub struct ProcessStatus {
    /// Handle of the reaped child.
    pub proc: Arc<SubProcess>,
    /// How it ended.
    pub outcome: ExitOutcome,
}

#[derive(Debug)]
struct ManagerInner {
    running: Mutex<BTreeMap<Pid, Arc<SubProcess>>>,
    /// Launches ever started.
    launches: AtomicUsize,
    /// Launches that have not returned yet. A child that fails to exec is
    /// reaped inside the launch, and `wait_any` may see it first.
    launching: AtomicUsize,
    launcher: Box<dyn ProcessLauncher>,
    config: ProcessConfig,
}

impl ManagerInner {
    fn is_registered(&self, pid: Pid) -> bool {
        self.running.lock().contains_key(&pid)
    }

    fn deregister(&self, pid: Pid) -> Option<Arc<SubProcess>> {
        self.running.lock().remove(&pid)
    }

    fn launch(&self, request: LaunchRequest<'_>) -> io::Result<Launched> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.launching.fetch_add(1, Ordering::SeqCst);
        let launched = self.launcher.launch(request);
        self.launching.fetch_sub(1, Ordering::SeqCst);
        launched
    }
}

/// Spawns children and tracks them until they are reaped.
///
/// Clones share one registry. [`ProcessManager::global`] gives a single
/// process-wide instance; separate managers can be created for isolation, but
/// note that [`wait_any`](Self::wait_any) reaps *any* child of the current
/// process, including children started by another manager.
#[derive(Debug, Clone)]
pub struct ProcessManager {
    inner: Arc<ManagerInner>,
}

impl ProcessManager {
    /// Manager with default configuration and the `std::process` launcher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProcessConfig::default())
    }

    /// Manager with the given configuration and the `std::process` launcher.
    #[must_use]
    pub fn with_config(config: ProcessConfig) -> Self {
        Self::with_launcher(config, CommandLauncher)
    }

    /// Manager using a custom launcher.
    #[must_use]
    pub fn with_launcher(config: ProcessConfig, launcher: impl ProcessLauncher) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                running: Mutex::new(BTreeMap::new()),
                launches: AtomicUsize::new(0),
                launching: AtomicUsize::new(0),
                launcher: Box::new(launcher),
                config,
            }),
        }
    }

    /// Process-wide manager, created on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ProcessManager> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Manager configuration.
    #[must_use]
    pub fn config(&self) -> &ProcessConfig {
        &self.inner.config
    }

    /// Starts a child and registers it as running.
    ///
    /// Capture and feed threads are started before this returns. If wiring a
    /// redirect fails after the child exists, the child is killed and reaped
    /// and the error is returned.
    ///
    /// # Errors
    ///
    /// `Redirect` if a redirect file cannot be opened, `Spawn` if the program
    /// cannot be executed, `AlreadyAttached` if a redirect handle was already
    /// used by another child.
    pub fn spawn(&self, args: &CreateProcessArgs) -> Result<Arc<SubProcess>, ProcessError> {
        let request = LaunchRequest {
            cmd: &args.cmd,
            args: &args.args,
            cwd: args
                .cwd
                .as_deref()
                .or(self.inner.config.default_cwd.as_deref()),
            stdin: args.stdin.stdio()?,
            stdout: args.stdout.stdio()?,
            stderr: args.stderr.stdio()?,
        };

        // Registration happens under the same lock wait_any takes after
        // reaping, so a child that exits immediately is never unknown there.
        let (proc, launched) = {
            let mut running = self.inner.running.lock();
            let launched = self
                .inner
                .launch(request)
                .map_err(|source| ProcessError::Spawn {
                    cmd: args.cmd.clone(),
                    source,
                })?;
            let proc = Arc::new(SubProcess {
                pid: launched.pid,
                command: args.command_line(),
                state: Mutex::new(ProcessState::Running),
                manager: Arc::downgrade(&self.inner),
            });
            running.insert(launched.pid, Arc::clone(&proc));
            (proc, launched)
        };

        if let Err(e) = attach_streams(args, launched) {
            warn!(pid = %proc.pid, error = %e, "redirect setup failed, killing child");
            if let Err(cleanup) = proc.discard() {
                warn!(pid = %proc.pid, error = %cleanup, "failed to clean up child");
            }
            return Err(e);
        }

        info!(pid = %proc.pid, command = %proc.command, "process spawned");
        Ok(proc)
    }

    /// Spawns a child and waits for it.
    ///
    /// # Errors
    ///
    /// Any error from [`spawn`](Self::spawn) or [`SubProcess::wait`].
    pub fn run(&self, args: &CreateProcessArgs) -> Result<(), ProcessError> {
        self.spawn(args)?.wait()
    }

    /// Reaps whichever child changes state first.
    ///
    /// With `block == false` this returns `Ok(None)` immediately when no child
    /// has exited yet. `Ok(None)` is also returned when the process has no
    /// children at all.
    ///
    /// An unknown child reaped while one of this manager's launches was in
    /// flight is taken to be a child that failed to exec. It is skipped and
    /// the wait goes on.
    ///
    /// # Errors
    ///
    /// `NoSuchPid` if the reaped child is not registered with this manager,
    /// `Wait` if `waitpid` fails.
    pub fn wait_any(&self, block: bool) -> Result<Option<ProcessStatus>, ProcessError> {
        let flags = if block { None } else { Some(WaitPidFlag::WNOHANG) };
        loop {
            let launches = self.inner.launches.load(Ordering::SeqCst);
            let launching = self.inner.launching.load(Ordering::SeqCst);
            let status = match waitpid(unistd::Pid::from_raw(-1), flags) {
                Ok(status) => status,
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return Ok(None),
                Err(e) => return Err(ProcessError::Wait(e)),
            };

            let Some(pid) = status.pid().map(Pid::from) else {
                return Ok(None);
            };
            let outcome = ExitOutcome::try_from(status)?;
            if let Some(proc) = self.inner.deregister(pid) {
                proc.record(outcome);
                return Ok(Some(ProcessStatus { proc, outcome }));
            }
            if launching > 0 || self.inner.launches.load(Ordering::SeqCst) != launches {
                debug!(pid = %pid, outcome = ?outcome, "reaped a child that failed to launch");
                continue;
            }
            warn!(pid = %pid, "reaped a child this manager does not know");
            return Err(ProcessError::NoSuchPid(pid));
        }
    }

    /// Number of children spawned and not yet reaped.
    #[must_use]
    pub fn num_running_processes(&self) -> usize {
        self.inner.running.lock().len()
    }

    /// Pids of children spawned and not yet reaped, in ascending order.
    #[must_use]
    pub fn running_pids(&self) -> Vec<Pid> {
        self.inner.running.lock().keys().copied().collect()
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

fn attach_streams(args: &CreateProcessArgs, launched: Launched) -> Result<(), ProcessError> {
    let pid = launched.pid;
    args.stdin.attach(pid, launched.stdin)?;
    args.stdout.attach(pid, "stdout", launched.stdout)?;
    args.stderr.attach(pid, "stderr", launched.stderr)
}

/// Handle to one spawned child.
pub struct SubProcess {
    pid: Pid,
    command: String,
    state: Mutex<ProcessState>,
    manager: Weak<ManagerInner>,
}

impl SubProcess {
    /// Child pid.
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// Command line the child was started with.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Last known state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    /// Blocks until the child exits and reaps it.
    ///
    /// # Errors
    ///
    /// `NoSuchPid` if the child was already reaped (by an earlier `wait` or by
    /// `wait_any`), otherwise the error matching a non-clean exit.
    pub fn wait(&self) -> Result<(), ProcessError> {
        let manager = self.manager.upgrade();
        if let Some(manager) = &manager {
            if !manager.is_registered(self.pid) {
                return Err(ProcessError::NoSuchPid(self.pid));
            }
        }

        let status = loop {
            match waitpid(unistd::Pid::from(self.pid), None) {
                Ok(status) => break status,
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return Err(ProcessError::NoSuchPid(self.pid)),
                Err(e) => return Err(ProcessError::Wait(e)),
            }
        };
        let outcome = self.reaped(status)?;
        if let Some(manager) = manager {
            manager.deregister(self.pid);
        }
        self.record(outcome);
        outcome.into_result()
    }

    /// Sends `SIGKILL` to the child.
    ///
    /// # Errors
    ///
    /// `Kill` if the signal cannot be delivered. A child that has already
    /// been reaped is refused with `ESRCH` without signalling, since its pid
    /// may have been reused.
    pub fn kill(&self) -> Result<(), ProcessError> {
        let result = if self.state().is_running() {
            self.pid.kill()
        } else {
            Err(Errno::ESRCH)
        };
        result.map_err(|source| ProcessError::Kill {
            pid: self.pid,
            source,
        })?;
        debug!(pid = %self.pid, "sent SIGKILL");
        Ok(())
    }

    /// Kills and reaps a child that will not be handed out. Exit statuses are
    /// expected here, only a failed kill or reap is an error.
    fn discard(&self) -> Result<(), ProcessError> {
        let killed = self.kill();
        let reaped = match self.wait() {
            Ok(()) | Err(ProcessError::NonZeroExit(_) | ProcessError::Signaled(_)) => Ok(()),
            Err(e) => Err(e),
        };
        killed.and(reaped)
    }

    fn reaped(&self, status: WaitStatus) -> Result<ExitOutcome, ProcessError> {
        ExitOutcome::try_from(status).inspect_err(|e| {
            warn!(pid = %self.pid, error = %e, "unexpected wait status");
        })
    }

    fn record(&self, outcome: ExitOutcome) {
        *self.state.lock() = outcome.into();
        info!(pid = %self.pid, outcome = ?outcome, "process reaped");
    }
}

impl fmt::Debug for SubProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubProcess")
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("state", &self.state())
            .finish()
    }
}
