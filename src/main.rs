use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use deploy_git::config::{DEFAULT_CONFIG_FILE, PipelineConfig};
use deploy_git::format::OutputFormat;
use deploy_git::inputs::glob_inputs;
use deploy_git::telemetry::{self, LogFormat};
use deploy_git::{Pipeline, PipelineOutcome};
use deploy_git_vcs::GitCli;

/// Stage build artifacts into a deploy repository and push them
///
/// Clones the deploy repository into a throwaway `deploy-<millis>` folder,
/// replaces its contents with the matched artifacts, commits and pushes.
/// Nothing happens unless the current branch is allowed to deploy.
///
/// OUTCOMES:
///   deployed                  changes pushed (exit 0)
///   branch not allowed        logged, nothing cloned (exit 0)
///   nothing changed           logged, nothing pushed (exit 0)
///   failure                   error names the failing step (exit 1)
///
/// EXAMPLES:
///   deploy-git --repository git@host:site.git --prefix dist 'dist/**/*'
///   GIT_BRANCH=refs/heads/main deploy-git --allow-branch main 'build/**/*'
#[derive(Parser)]
#[command(name = "deploy-git")]
#[command(version, about)]
struct Cli {
    /// Artifact glob patterns, relative to --cwd
    #[arg(required = true, value_name = "PATTERN")]
    artifacts: Vec<String>,

    /// Working root artifact paths are made relative to (default: current directory)
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Config file; a missing file means all defaults
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Remote URL of the deploy repository
    #[arg(long)]
    repository: Option<String>,

    /// Branch of the deploy repository to clone and push
    #[arg(long, value_name = "BRANCH")]
    remote_branch: Option<String>,

    /// Branch allowed to deploy (repeatable; replaces the configured list)
    #[arg(long = "allow-branch", value_name = "BRANCH")]
    allow_branch: Vec<String>,

    /// Leading path segment stripped from every artifact
    #[arg(long)]
    prefix: Option<String>,

    /// Commit message (default: last commit of the source repository)
    #[arg(long, short = 'm')]
    message: Option<String>,

    /// Branch being deployed from; when unset, asks git
    #[arg(long, env = "GIT_BRANCH")]
    branch: Option<String>,

    /// Repository the artifacts were built from (default: current directory)
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Where the temporary deploy folder is created (default: current directory)
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// git executable to run
    #[arg(long, default_value = "git")]
    git: String,

    /// Show git output and pipeline states
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Trace-level logging
    #[arg(long)]
    debug: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl Cli {
    /// Config file values with command-line flags layered on top.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(&self.config)?;
        if let Some(repository) = &self.repository {
            config.repository.clone_from(repository);
        }
        if let Some(remote_branch) = &self.remote_branch {
            config.remote_branch.clone_from(remote_branch);
        }
        if !self.allow_branch.is_empty() {
            config.branches = self.allow_branch.iter().cloned().collect();
        }
        if let Some(prefix) = &self.prefix {
            config.prefix.clone_from(prefix);
        }
        if let Some(message) = &self.message {
            config.message.clone_from(message);
        }
        if self.source_dir.is_some() {
            config.source_dir.clone_from(&self.source_dir);
        }
        if self.work_dir.is_some() {
            config.work_dir.clone_from(&self.work_dir);
        }
        config.verbose |= self.verbose;
        config.debug |= self.debug;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.pipeline_config()?;
    telemetry::init(cli.log_format, config.verbose, config.debug);

    let pipeline = Pipeline::new(config, GitCli::with_program(&cli.git))
        .context("invalid deploy configuration")?;

    let root = match &cli.cwd {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("could not resolve --cwd {}", dir.display()))?,
        None => std::env::current_dir().context("could not determine the current directory")?,
    };
    let inputs = glob_inputs(&cli.artifacts, &root)?;
    let report = pipeline
        .deploy(inputs, cli.branch.as_deref())
        .context("could not collect artifacts")?;

    if let Some(rendered) = cli.format.render(&report)? {
        println!("{rendered}");
    }

    match report.outcome {
        PipelineOutcome::Failed(e) => Err(anyhow::Error::new(e).context("deploy failed")),
        _ => Ok(()),
    }
}
