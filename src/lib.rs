//! deploy-git library crate.
//!
//! The primary interface is the `deploy-git` binary. The library exposes the
//! pipeline so it can be embedded in other build tools and exercised by
//! integration tests with a real or scripted [`Vcs`](deploy_git_vcs::Vcs).
//!
//! A run goes: collect artifacts → branch gate → clone → purge → copy →
//! stage → resolve message → commit → push, with the workspace torn down on
//! every exit path. See [`pipeline`] for the state machine.

pub mod branch;
pub mod collect;
pub mod config;
pub mod error;
pub mod exec;
pub mod format;
pub mod inputs;
pub mod materialize;
pub mod pipeline;
pub mod publish;
pub mod telemetry;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use collect::{ArtifactInput, ArtifactRecord, CollectError, Collector};
pub use config::{ConfigError, PipelineConfig};
pub use error::{DeployError, Step};
pub use pipeline::{Pipeline, PipelineOutcome, RunReport, State};
