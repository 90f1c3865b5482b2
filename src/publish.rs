//! Stage, commit and push the workspace.
//!
//! Each operation is a separate invocation. `git commit` exiting with
//! [`NOTHING_TO_COMMIT_EXIT`] is the one non-zero exit that is not a failure:
//! the staged tree equals the clone and there is nothing to deploy.

use std::path::Path;

use deploy_git_vcs::Vcs;
use tracing::{debug, info};

use crate::error::{DeployError, Step};
use crate::exec::{command_line, invoke, invoke_ok, tool_failure};

/// Exit code of `git commit` when the index matches `HEAD`.
pub const NOTHING_TO_COMMIT_EXIT: i32 = 1;

/// Query for the last upstream commit, used as the fallback message.
pub const LAST_COMMIT_ARGS: [&str; 3] = ["log", "-1", "--oneline"];

/// Result of the commit step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitResult {
    /// A new commit was created.
    Committed,
    /// Nothing differed from the clone.
    NothingToCommit,
}

/// Publishes one workspace to `origin/<remote_branch>`.
#[derive(Debug)]
pub struct Publisher<'a, V: ?Sized> {
    vcs: &'a V,
    workspace: &'a Path,
    source_dir: &'a Path,
    remote_branch: &'a str,
}

impl<'a, V: Vcs + ?Sized> Publisher<'a, V> {
    /// A publisher for `workspace`, reading upstream history from `source_dir`.
    pub const fn new(
        vcs: &'a V,
        workspace: &'a Path,
        source_dir: &'a Path,
        remote_branch: &'a str,
    ) -> Self {
        Self {
            vcs,
            workspace,
            source_dir,
            remote_branch,
        }
    }

    /// `git add --all .` in the workspace: new, modified and deleted paths.
    ///
    /// # Errors
    /// Tagged [`Step::Stage`].
    pub fn stage(&self) -> Result<(), DeployError> {
        invoke_ok(self.vcs, Step::Stage, &["add", "--all", "."], self.workspace)?;
        Ok(())
    }

    /// Pick the commit message.
    ///
    /// An explicit message wins. Otherwise the one-line summary of the last
    /// commit in the *source* repository is used verbatim, so the deploy
    /// history mirrors what was built.
    ///
    /// # Errors
    /// Tagged [`Step::ResolveMessage`] if the log query fails or is empty.
    pub fn resolve_message(&self, explicit: Option<&str>) -> Result<String, DeployError> {
        if let Some(message) = explicit {
            return Ok(message.to_owned());
        }
        let output = invoke_ok(
            self.vcs,
            Step::ResolveMessage,
            &LAST_COMMIT_ARGS,
            self.source_dir,
        )?;
        let message = output.first_line();
        if message.is_empty() {
            return Err(DeployError::EmptyMessage {
                step: Step::ResolveMessage,
                command: command_line(&LAST_COMMIT_ARGS),
            });
        }
        debug!(%message, "using last upstream commit as message");
        Ok(message.to_owned())
    }

    /// `git commit -m <message>` in the workspace.
    ///
    /// # Errors
    /// Tagged [`Step::Commit`] for any non-zero exit other than
    /// [`NOTHING_TO_COMMIT_EXIT`].
    pub fn commit(&self, message: &str) -> Result<CommitResult, DeployError> {
        info!("Committing changes to deployment repository");
        let args = ["commit", "-m", message];
        let output = invoke(self.vcs, Step::Commit, &args, self.workspace)?;
        match output.exit_code {
            Some(0) => Ok(CommitResult::Committed),
            Some(NOTHING_TO_COMMIT_EXIT) => Ok(CommitResult::NothingToCommit),
            _ => Err(tool_failure(Step::Commit, &args, &output)),
        }
    }

    /// `git push origin <remote_branch>` from the workspace.
    ///
    /// # Errors
    /// Tagged [`Step::Push`].
    pub fn push(&self) -> Result<(), DeployError> {
        info!("Pushing to remote deployment repository");
        invoke_ok(
            self.vcs,
            Step::Push,
            &["push", "origin", self.remote_branch],
            self.workspace,
        )?;
        Ok(())
    }
}
