//! The [`Vcs`] trait and its result type.

use std::path::Path;

use crate::error::VcsError;

/// What an external invocation resolved to once the process exited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Everything the process wrote to stdout.
    pub stdout: String,
    /// Everything the process wrote to stderr, kept for error reporting.
    pub stderr: String,
}

impl ProcessOutput {
    /// A successful exit with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed exit with the given code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// The first line of stdout, trimmed.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim()
    }
}

/// An external version-control executable.
///
/// Implementations run one command to completion, forward its output to the
/// log, and return the exit status with the captured output. Calls are
/// strictly sequential; nothing in the pipeline invokes a `Vcs` concurrently.
pub trait Vcs {
    /// Run the tool with `args` in `cwd` and wait for it to exit.
    ///
    /// # Errors
    /// Returns [`VcsError`] only if the process could not be spawned or
    /// supervised. Non-zero exits are reported in the returned output.
    fn run(&self, args: &[&str], cwd: &Path) -> Result<ProcessOutput, VcsError>;
}

impl<T: Vcs + ?Sized> Vcs for &T {
    fn run(&self, args: &[&str], cwd: &Path) -> Result<ProcessOutput, VcsError> {
        (**self).run(args, cwd)
    }
}

impl<T: Vcs + ?Sized> Vcs for Box<T> {
    fn run(&self, args: &[&str], cwd: &Path) -> Result<ProcessOutput, VcsError> {
        (**self).run(args, cwd)
    }
}
