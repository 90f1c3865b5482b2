//! Process runner for deploy-git.
//!
//! This crate defines the [`Vcs`] trait, the single interface through which
//! the deploy pipeline talks to the version-control tool. No pipeline step
//! spawns a process directly; each one hands an argument vector and a working
//! directory to a [`Vcs`] and interprets the [`ProcessOutput`] it gets back.
//!
//! # Crate layout
//!
//! - [`runner`]: the [`Vcs`] trait and the [`ProcessOutput`] value.
//! - [`git_cli`]: [`GitCli`], the implementation backed by the `git` binary.
//! - [`error`]: the [`VcsError`] enum for spawn/wait failures.
//!
//! A non-zero exit status is **not** an error at this layer. The exit code is
//! the sole control signal and belongs to the caller.

pub mod error;
pub mod git_cli;
pub mod runner;

pub use error::VcsError;
pub use git_cli::GitCli;
pub use runner::{ProcessOutput, Vcs};
