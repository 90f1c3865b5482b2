//! Branch gate: decides whether this invocation may deploy.
//!
//! An externally supplied branch (the `GIT_BRANCH` variable CI systems set)
//! is authoritative. Without one, the source repository is asked for its
//! current branch with `git rev-parse --abbrev-ref HEAD`.

use std::path::Path;

use deploy_git_vcs::Vcs;
use tracing::{debug, info};

use crate::error::{DeployError, Step};
use crate::exec::{invoke_ok, tool_failure};

/// Query for the current short branch name.
pub const REV_PARSE_ARGS: [&str; 3] = ["rev-parse", "--abbrev-ref", "HEAD"];

/// Reduce a fully-qualified ref to its short branch name.
///
/// `refs/heads/main` and `refs/remotes/origin/main` both become `main`.
/// Anything else is returned trimmed but otherwise verbatim.
#[must_use]
pub fn short_name(raw: &str) -> &str {
    let name = raw.trim();
    if let Some(rest) = name.strip_prefix("refs/heads/") {
        return rest;
    }
    if let Some(rest) = name.strip_prefix("refs/remotes/")
        && let Some((_remote, branch)) = rest.split_once('/')
    {
        return branch;
    }
    name
}

/// Determine the branch the deploy is being attempted from.
///
/// A blank `supplied` value counts as absent.
///
/// # Errors
/// Returns [`DeployError`] tagged [`Step::BranchCheck`] if the tool cannot be
/// run, exits non-zero, or prints nothing.
pub fn resolve<V: Vcs + ?Sized>(
    vcs: &V,
    supplied: Option<&str>,
    source_dir: &Path,
) -> Result<String, DeployError> {
    if let Some(raw) = supplied.filter(|s| !s.trim().is_empty()) {
        let branch = short_name(raw).to_owned();
        debug!(supplied = raw, %branch, "using externally supplied branch");
        return Ok(branch);
    }

    let output = invoke_ok(vcs, Step::BranchCheck, &REV_PARSE_ARGS, source_dir)?;
    let branch = short_name(output.first_line()).to_owned();
    if branch.is_empty() {
        return Err(tool_failure(Step::BranchCheck, &REV_PARSE_ARGS, &output));
    }
    info!("Current branch: {branch}");
    Ok(branch)
}
