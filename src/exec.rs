//! Runs one version-control invocation on behalf of a pipeline step.
//!
//! Every step goes through [`invoke`] (exit code interpreted by the caller)
//! or [`invoke_ok`] (any non-zero exit is a [`DeployError::Tool`]).

use std::path::Path;

use deploy_git_vcs::{ProcessOutput, Vcs};

use crate::error::{DeployError, Step};

/// Render an argument vector the way it would be typed.
pub fn command_line(args: &[&str]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Run `args` in `cwd`, failing only if the tool could not be spawned.
///
/// # Errors
/// Returns [`DeployError::Spawn`] tagged with `step`.
pub fn invoke<V: Vcs + ?Sized>(
    vcs: &V,
    step: Step,
    args: &[&str],
    cwd: &Path,
) -> Result<ProcessOutput, DeployError> {
    vcs.run(args, cwd)
        .map_err(|source| DeployError::Spawn { step, source })
}

/// Run `args` in `cwd` and require exit status 0.
///
/// # Errors
/// Returns [`DeployError::Spawn`] or [`DeployError::Tool`] tagged with `step`.
pub fn invoke_ok<V: Vcs + ?Sized>(
    vcs: &V,
    step: Step,
    args: &[&str],
    cwd: &Path,
) -> Result<ProcessOutput, DeployError> {
    let output = invoke(vcs, step, args, cwd)?;
    if output.success() {
        Ok(output)
    } else {
        Err(tool_failure(step, args, &output))
    }
}

/// Turn a non-zero exit into a [`DeployError::Tool`].
pub fn tool_failure(step: Step, args: &[&str], output: &ProcessOutput) -> DeployError {
    DeployError::Tool {
        step,
        command: command_line(args),
        exit_code: output.exit_code,
        stderr: output.stderr.trim().to_owned(),
    }
}
