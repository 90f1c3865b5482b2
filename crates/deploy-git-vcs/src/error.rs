//! Error types for process invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`Vcs::run`](crate::Vcs::run).
///
/// Only failures to start or supervise the child process land here. A child
/// that ran and exited non-zero is reported through
/// [`ProcessOutput::exit_code`](crate::ProcessOutput::exit_code).
#[derive(Debug, Error)]
pub enum VcsError {
    /// The executable could not be started.
    #[error("failed to spawn `{program}` in {}: {source}", cwd.display())]
    Spawn {
        /// Program name (e.g. `"git"`).
        program: String,
        /// Working directory the spawn was attempted in.
        cwd: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The child started but reading its output or waiting on it failed.
    #[error("lost track of `{program}`: {source}")]
    Wait {
        /// Program name.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}
