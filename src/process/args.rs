//! Arguments describing a child process.

use std::path::PathBuf;

use super::redirect::{InputSpec, OutputSpec};

/// Command line, standard streams and working directory of a child.
///
/// ```
/// use prometheus_task_core::process::{CreateProcessArgs, OutputCapture, OutputSpec};
///
/// let capture = OutputCapture::new();
/// let args = CreateProcessArgs::new("echo")
///     .arg("hello")
///     .stdout(OutputSpec::Capture(capture.clone()));
/// assert_eq!(args.args, vec!["hello".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateProcessArgs {
    /// Program to run.
    pub cmd: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Stdin source.
    pub stdin: InputSpec,
    /// Stdout destination.
    pub stdout: OutputSpec,
    /// Stderr destination.
    pub stderr: OutputSpec,
    /// Working directory; falls back to the manager's configured default.
    pub cwd: Option<PathBuf>,
}

impl CreateProcessArgs {
    /// Runs `cmd` with no arguments and inherited streams.
    #[must_use]
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the stdin source.
    #[must_use]
    pub fn stdin(mut self, spec: InputSpec) -> Self {
        self.stdin = spec;
        self
    }

    /// Sets the stdout destination.
    #[must_use]
    pub fn stdout(mut self, spec: OutputSpec) -> Self {
        self.stdout = spec;
        self
    }

    /// Sets the stderr destination.
    #[must_use]
    pub fn stderr(mut self, spec: OutputSpec) -> Self {
        self.stderr = spec;
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Command line for log messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.cmd.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
