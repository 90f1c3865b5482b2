//! Pipeline orchestrator.
//!
//! Runs one deploy as a fixed waterfall of fallible steps:
//!
//! ```text
//! Init → BranchCheck ─┬─ SkippedBranch ─────────────────────────────┐
//!                     └─ Clone → Purge → Copy → Stage → ResolveMessage
//!                          → Commit ─┬─ SkippedNoChanges ───────────┤
//!                                    └─ Push → Deployed ────────────┤
//!        any step ── Failed ────────────────────────────────────────┤
//!                                                        Teardown → Done
//! ```
//!
//! Each step returns `Result<_, Halt>`. A `Halt` is either a soft skip or a
//! hard failure, so `?` stops the waterfall at the first of either. Teardown
//! runs after the driver returns on every path. All per-run state lives in a
//! `RunContext`; a [`Pipeline`] can be run any number of times.

use std::fmt;
use std::path::{Path, PathBuf};

use deploy_git_vcs::Vcs;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::branch;
use crate::collect::{ArtifactInput, ArtifactRecord, CollectError, Collector};
use crate::config::{ConfigError, PipelineConfig};
use crate::error::{DeployError, Step};
use crate::materialize::materialize;
use crate::publish::{CommitResult, Publisher};
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Outcome and states
// ---------------------------------------------------------------------------

/// How a run ended. Exactly one per invocation.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Changes were committed and pushed.
    Deployed,
    /// The active branch is not on the allow-list. No workspace was created.
    SkippedBranchNotAllowed {
        /// The branch that was refused.
        branch: String,
    },
    /// The artifacts matched what the deploy branch already had.
    SkippedNoChanges,
    /// A step failed.
    Failed(DeployError),
}

impl PipelineOutcome {
    /// Whether the run ended without a hard failure.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Whether the run stopped early on a soft skip.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::SkippedBranchNotAllowed { .. } | Self::SkippedNoChanges
        )
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::SkippedBranchNotAllowed { branch } => {
                write!(f, "branch {branch} is not configured to deploy")
            }
            Self::SkippedNoChanges => write!(f, "nothing changed, nothing to deploy"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// A state of the pipeline state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    Init,
    BranchCheck,
    SkippedBranch,
    Clone,
    Purge,
    Copy,
    Stage,
    ResolveMessage,
    Commit,
    SkippedNoChanges,
    Push,
    Deployed,
    Failed,
    Teardown,
    Done,
}

impl From<Step> for State {
    fn from(step: Step) -> Self {
        match step {
            Step::BranchCheck => Self::BranchCheck,
            Step::Clone => Self::Clone,
            Step::Purge => Self::Purge,
            Step::Copy => Self::Copy,
            Step::Stage => Self::Stage,
            Step::ResolveMessage => Self::ResolveMessage,
            Step::Commit => Self::Commit,
            Step::Push => Self::Push,
        }
    }
}

impl From<&PipelineOutcome> for State {
    fn from(outcome: &PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Deployed => Self::Deployed,
            PipelineOutcome::SkippedBranchNotAllowed { .. } => Self::SkippedBranch,
            PipelineOutcome::SkippedNoChanges => Self::SkippedNoChanges,
            PipelineOutcome::Failed(_) => Self::Failed,
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: PipelineOutcome,
    /// The branch the gate resolved, if it got that far.
    pub branch: Option<String>,
    /// The workspace path, if one was allocated.
    pub workspace: Option<PathBuf>,
    /// States visited, in order, ending with `Teardown` and `Done`.
    pub trace: Vec<State>,
}

// ---------------------------------------------------------------------------
// Step driver
// ---------------------------------------------------------------------------

/// Why the waterfall stopped before `Deployed`.
enum Halt {
    Skip(Skip),
    Fail(DeployError),
}

enum Skip {
    BranchNotAllowed(String),
    NoChanges,
}

impl From<DeployError> for Halt {
    fn from(e: DeployError) -> Self {
        Self::Fail(e)
    }
}

/// Per-run state threaded through every step.
#[derive(Default)]
struct RunContext {
    trace: Vec<State>,
    branch: Option<String>,
    workspace: Option<Workspace>,
}

impl RunContext {
    fn enter(&mut self, state: State) {
        debug!(?state, "pipeline state");
        self.trace.push(state);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A validated deploy configuration bound to a version-control runner.
#[derive(Debug)]
pub struct Pipeline<V> {
    config: PipelineConfig,
    vcs: V,
    source_dir: PathBuf,
    work_dir: PathBuf,
}

impl<V: Vcs> Pipeline<V> {
    /// Validate `config` and resolve its directories.
    ///
    /// Unset `source_dir`/`work_dir` default to the process working directory.
    ///
    /// # Errors
    /// Returns [`ConfigError`] before any filesystem or process side effect.
    pub fn new(config: PipelineConfig, vcs: V) -> Result<Self, ConfigError> {
        config.validate()?;
        let cwd = || std::env::current_dir().map_err(ConfigError::CurrentDir);
        let source_dir = match &config.source_dir {
            Some(dir) => dir.clone(),
            None => cwd()?,
        };
        let work_dir = match &config.work_dir {
            Some(dir) => dir.clone(),
            None => cwd()?,
        };
        Ok(Self {
            config,
            vcs,
            source_dir,
            work_dir,
        })
    }

    /// The version-control runner.
    pub const fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Where workspaces are created.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// A collector configured with this pipeline's prefix.
    #[must_use]
    pub fn collector(&self) -> Collector {
        Collector::new(&self.config.prefix)
    }

    /// Collect `inputs` until the stream ends, then run.
    ///
    /// # Errors
    /// Returns [`CollectError`] if an input is rejected; nothing has been run
    /// at that point.
    pub fn deploy<I>(&self, inputs: I, supplied_branch: Option<&str>) -> Result<RunReport, CollectError>
    where
        I: IntoIterator<Item = ArtifactInput>,
    {
        let mut collector = self.collector();
        collector.extend(inputs)?;
        debug!(artifacts = collector.len(), "artifact stream ended");
        Ok(self.run(&collector.into_records(), supplied_branch))
    }

    /// Run the pipeline over already collected artifacts.
    ///
    /// Always tears the workspace down before returning. A teardown failure
    /// is logged and does not change the outcome.
    pub fn run(&self, artifacts: &[ArtifactRecord], supplied_branch: Option<&str>) -> RunReport {
        let mut ctx = RunContext::default();
        ctx.enter(State::Init);

        let outcome = match self.drive(&mut ctx, artifacts, supplied_branch) {
            Ok(()) => PipelineOutcome::Deployed,
            Err(Halt::Skip(Skip::BranchNotAllowed(branch))) => {
                PipelineOutcome::SkippedBranchNotAllowed { branch }
            }
            Err(Halt::Skip(Skip::NoChanges)) => PipelineOutcome::SkippedNoChanges,
            Err(Halt::Fail(e)) => PipelineOutcome::Failed(e),
        };
        ctx.enter(State::from(&outcome));

        ctx.enter(State::Teardown);
        if let Some(ws) = &ctx.workspace {
            match ws.teardown() {
                Ok(true) => debug!(workspace = %ws.path().display(), "workspace removed"),
                Ok(false) => debug!(workspace = %ws.path().display(), "workspace never created"),
                Err(e) => warn!(
                    workspace = %ws.path().display(),
                    error = %e,
                    "failed to remove deployment folder"
                ),
            }
        }
        ctx.enter(State::Done);

        match &outcome {
            PipelineOutcome::Deployed => {
                info!(remote_branch = %self.config.remote_branch, "deployed");
            }
            PipelineOutcome::SkippedBranchNotAllowed { .. } | PipelineOutcome::SkippedNoChanges => {
                info!("{outcome}");
            }
            PipelineOutcome::Failed(_) => {}
        }

        RunReport {
            outcome,
            branch: ctx.branch,
            workspace: ctx.workspace.map(|ws| ws.path().to_path_buf()),
            trace: ctx.trace,
        }
    }

    fn drive(
        &self,
        ctx: &mut RunContext,
        artifacts: &[ArtifactRecord],
        supplied_branch: Option<&str>,
    ) -> Result<(), Halt> {
        ctx.enter(State::BranchCheck);
        let branch = branch::resolve(&self.vcs, supplied_branch, &self.source_dir)?;
        ctx.branch = Some(branch.clone());
        if !self.config.allows(&branch) {
            return Err(Halt::Skip(Skip::BranchNotAllowed(branch)));
        }

        ctx.enter(State::Clone);
        let workspace = Workspace::allocate(&self.work_dir);
        ctx.workspace = Some(workspace.clone());
        workspace.create(&self.vcs, &self.config, &self.source_dir)?;

        ctx.enter(State::Purge);
        workspace.purge()?;

        ctx.enter(State::Copy);
        materialize(artifacts, workspace.path())?;

        let publisher = Publisher::new(
            &self.vcs,
            workspace.path(),
            &self.source_dir,
            &self.config.remote_branch,
        );

        ctx.enter(State::Stage);
        publisher.stage()?;

        ctx.enter(State::ResolveMessage);
        let message = publisher.resolve_message(self.config.explicit_message())?;

        ctx.enter(State::Commit);
        if publisher.commit(&message)? == CommitResult::NothingToCommit {
            return Err(Halt::Skip(Skip::NoChanges));
        }

        ctx.enter(State::Push);
        publisher.push()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
