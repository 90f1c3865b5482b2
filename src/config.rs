//! Deploy configuration (`deploy-git.toml`).
//!
//! Defines [`PipelineConfig`], the immutable input of one pipeline run. The
//! file is optional; CLI flags are layered over it by the binary. Every field
//! has a default except `repository`, whose absence is caught by
//! [`PipelineConfig::validate`] before any work begins.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "deploy-git.toml";

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Settings for one deploy run.
///
/// ```toml
/// repository = "git@example.com:site/deploy.git"
/// remote_branch = "gh-pages"
/// branches = ["main", "release"]
/// prefix = "dist"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Leading path segment(s) stripped from every artifact's relative path.
    #[serde(default)]
    pub prefix: String,

    /// Explicit commit message. Empty means "reuse the last upstream commit".
    #[serde(default)]
    pub message: String,

    /// Remote URL of the deploy repository. Required.
    #[serde(default)]
    pub repository: String,

    /// Branch of the deploy repository to clone and push (default `"master"`).
    #[serde(default = "default_remote_branch")]
    pub remote_branch: String,

    /// Branches allowed to trigger a real deploy (default `["master"]`).
    #[serde(default = "default_branches")]
    pub branches: BTreeSet<String>,

    /// Log at debug level.
    #[serde(default)]
    pub verbose: bool,

    /// Log at trace level.
    #[serde(default)]
    pub debug: bool,

    /// Repository the artifacts were built from. Branch detection and the
    /// fallback commit message are read here. Defaults to the process cwd.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Directory the ephemeral `deploy-<millis>` workspace is created in.
    /// Defaults to the process cwd.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            message: String::new(),
            repository: String::new(),
            remote_branch: default_remote_branch(),
            branches: default_branches(),
            verbose: false,
            debug: false,
            source_dir: None,
            work_dir: None,
        }
    }
}

fn default_remote_branch() -> String {
    "master".to_owned()
}

fn default_branches() -> BTreeSet<String> {
    BTreeSet::from(["master".to_owned()])
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// The configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `repository` is missing or blank.
    #[error("no deploy repository configured\n  To fix: set `repository` in {DEFAULT_CONFIG_FILE} or pass --repository <url>")]
    MissingRepository,

    /// `branches` is empty, so nothing could ever deploy.
    #[error("no branches are allowed to deploy\n  To fix: list at least one branch in `branches`")]
    NoAllowedBranches,

    /// `remote_branch` is blank.
    #[error("remote branch must not be empty")]
    EmptyRemoteBranch,

    /// The config file exists but could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("{}{message}", location(.path, .line))]
    Parse {
        /// Config file path, if parsed from a file.
        path: Option<PathBuf>,
        /// 1-based line of the offending span.
        line: Option<usize>,
        /// Parser message.
        message: String,
    },

    /// The process working directory could not be determined.
    #[error("could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

fn location(path: &Option<PathBuf>, line: &Option<usize>) -> String {
    match (path, line) {
        (Some(p), Some(l)) => format!("{}:{l}: ", p.display()),
        (Some(p), None) => format!("{}: ", p.display()),
        (None, Some(l)) => format!("line {l}: "),
        (None, None) => "config error: ".to_owned(),
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// Loading does not validate; call [`validate`](Self::validate) once all
    /// overrides are applied.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { line, message, .. } => ConfigError::Parse {
                path: Some(path.to_owned()),
                line,
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let line = e.span().map(|span| {
                toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1
            });
            ConfigError::Parse {
                path: None,
                line,
                message: e.message().to_owned(),
            }
        })
    }

    /// Check the invariants a run depends on.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.trim().is_empty() {
            return Err(ConfigError::MissingRepository);
        }
        if self.remote_branch.trim().is_empty() {
            return Err(ConfigError::EmptyRemoteBranch);
        }
        if self.branches.iter().all(|b| b.trim().is_empty()) {
            return Err(ConfigError::NoAllowedBranches);
        }
        Ok(())
    }

    /// Whether `branch` may trigger a real deploy.
    #[must_use]
    pub fn allows(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }

    /// The explicit commit message, if one was configured.
    #[must_use]
    pub fn explicit_message(&self) -> Option<&str> {
        let m = self.message.trim();
        (!m.is_empty()).then_some(self.message.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
