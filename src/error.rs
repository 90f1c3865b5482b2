//! Hard-failure type for deploy pipeline steps.
//!
//! [`DeployError`] is the single error every step returns. Each variant
//! carries the [`Step`] that failed so the final report can say *where* the
//! pipeline stopped as well as *why*. Soft skips (branch not allowed, nothing
//! to commit) are not represented here; see
//! [`PipelineOutcome`](crate::pipeline::PipelineOutcome).

use std::fmt;
use std::path::{Path, PathBuf};

use deploy_git_vcs::VcsError;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A fallible pipeline step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Resolve the active branch and check it against the allow-list.
    BranchCheck,
    /// Clone the deploy repository into the workspace.
    Clone,
    /// Delete tracked content from the workspace.
    Purge,
    /// Copy artifacts into the workspace.
    Copy,
    /// `git add --all .`
    Stage,
    /// Pick the commit message.
    ResolveMessage,
    /// `git commit`
    Commit,
    /// `git push`
    Push,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BranchCheck => "branch check",
            Self::Clone => "clone",
            Self::Purge => "purge",
            Self::Copy => "copy",
            Self::Stage => "stage",
            Self::ResolveMessage => "resolve message",
            Self::Commit => "commit",
            Self::Push => "push",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// DeployError
// ---------------------------------------------------------------------------

/// A step failed and the pipeline stopped.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The version-control tool exited non-zero (outside the benign cases).
    #[error("{step} failed: `{command}` {}", exit_detail(.exit_code, .stderr))]
    Tool {
        /// Step that ran the command.
        step: Step,
        /// The command line, e.g. `"git push origin master"`.
        command: String,
        /// Exit code, `None` if killed by a signal.
        exit_code: Option<i32>,
        /// What the tool printed on stderr, trimmed.
        stderr: String,
    },

    /// The tool could not be started at all.
    #[error("{step} failed: {source}")]
    Spawn {
        /// Step that tried to run the command.
        step: Step,
        /// Underlying runner error.
        #[source]
        source: VcsError,
    },

    /// A filesystem operation failed.
    #[error("{step} failed: {}: {source}", path.display())]
    Io {
        /// Step that touched the filesystem.
        step: Step,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// No explicit message was configured and the upstream log had none.
    #[error("{step} failed: no commit message configured and `{command}` printed nothing")]
    EmptyMessage {
        /// Always [`Step::ResolveMessage`].
        step: Step,
        /// The query that came back empty.
        command: String,
    },
}

impl DeployError {
    /// Build an I/O failure for `path`.
    pub fn io(step: Step, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            step,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The step that failed.
    #[must_use]
    pub const fn step(&self) -> Step {
        match self {
            Self::Tool { step, .. }
            | Self::Spawn { step, .. }
            | Self::Io { step, .. }
            | Self::EmptyMessage { step, .. } => *step,
        }
    }

    /// The exit code if this was a tool failure.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Tool { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn exit_detail(exit_code: &Option<i32>, stderr: &str) -> String {
    let mut detail = match exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "was killed by a signal".to_owned(),
    };
    if !stderr.is_empty() {
        detail.push_str(": ");
        detail.push_str(stderr);
    }
    detail
}
