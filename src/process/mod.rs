//! Sub-process orchestration.
//!
//! [`ProcessManager`] starts children with redirected standard streams, keeps
//! a registry of the ones not yet reaped, and reaps them either one at a time
//! ([`SubProcess::wait`]) or whichever finishes first
//! ([`ProcessManager::wait_any`]).
//!
//! ```no_run
//! use prometheus_task_core::process::{
//!     CreateProcessArgs, OutputCapture, OutputSpec, ProcessManager,
//! };
//!
//! let capture = OutputCapture::new();
//! ProcessManager::global().run(
//!     &CreateProcessArgs::new("echo")
//!         .arg("hello")
//!         .stdout(OutputSpec::Capture(capture.clone())),
//! )?;
//! assert_eq!(capture.output()?, "hello\n");
//! # Ok::<(), prometheus_task_core::process::ProcessError>(())
//! ```
//!
//! The parent-death signal some platforms offer for orphaned children is not
//! set; a child outlives a parent that exits without reaping it.

pub mod args;
pub mod error;
pub mod launcher;
pub mod manager;
pub mod pid;
pub mod redirect;
pub mod status;

pub use args::CreateProcessArgs;
pub use error::ProcessError;
pub use launcher::{CommandLauncher, LaunchRequest, Launched, ProcessLauncher};
pub use manager::{ProcessManager, ProcessStatus, SubProcess};
pub use pid::Pid;
pub use redirect::{InputFeed, InputSpec, OutputCapture, OutputSpec, Pipe};
pub use status::{ExitOutcome, ProcessState};
