//! Shared test helpers for deploy-git integration tests.
//!
//! All tests use temp directories with no side effects outside them. Each
//! [`Fixture`] owns a bare "deploy" remote seeded with one commit on
//! `master`, a source repository on `main` the artifacts were "built" from,
//! and an empty work dir for the ephemeral workspace.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use deploy_git::PipelineConfig;
use deploy_git_vcs::GitCli;
use tempfile::TempDir;

/// Identity and config isolation applied to every git we run.
const GIT_ENV: [(&str, &str); 6] = [
    ("GIT_AUTHOR_NAME", "Deploy Test"),
    ("GIT_AUTHOR_EMAIL", "deploy@localhost"),
    ("GIT_COMMITTER_NAME", "Deploy Test"),
    ("GIT_COMMITTER_EMAIL", "deploy@localhost"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_TERMINAL_PROMPT", "0"),
];

/// Run git in `dir`, returning the raw output.
pub fn git(dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    for (k, v) in GIT_ENV {
        cmd.env(k, v);
    }
    cmd.output().expect("failed to run git")
}

/// Run git in `dir` and require success. Returns trimmed stdout.
pub fn git_ok(dir: &Path, args: &[&str]) -> String {
    let out = git(dir, args);
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// A [`GitCli`] with the test identity.
pub fn git_cli() -> GitCli {
    GIT_ENV
        .iter()
        .fold(GitCli::new(), |cli, (k, v)| cli.with_env(*k, *v))
}

pub struct Fixture {
    _dir: TempDir,
    pub remote: PathBuf,
    pub source: PathBuf,
    pub work: PathBuf,
    pub artifacts: PathBuf,
}

impl Fixture {
    /// Remote seeded with `old.txt` and `assets/old.css` on `master`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path();
        let remote = root.join("remote.git");
        let seed = root.join("seed");
        let source = root.join("source");
        let work = root.join("work");
        let artifacts = root.join("source").join("dist");
        for d in [&remote, &seed, &source, &work] {
            fs::create_dir_all(d).unwrap();
        }

        git_ok(&remote, &["init", "--bare"]);
        git_ok(&remote, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        git_ok(&seed, &["init"]);
        git_ok(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        git_ok(&seed, &["config", "commit.gpgsign", "false"]);
        fs::write(seed.join("old.txt"), "stale\n").unwrap();
        fs::create_dir_all(seed.join("assets")).unwrap();
        fs::write(seed.join("assets/old.css"), "body {}\n").unwrap();
        git_ok(&seed, &["add", "--all", "."]);
        git_ok(&seed, &["commit", "-m", "seed"]);
        git_ok(&seed, &["push", remote.to_str().unwrap(), "master"]);

        git_ok(&source, &["init"]);
        git_ok(&source, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git_ok(&source, &["config", "commit.gpgsign", "false"]);
        fs::write(source.join("build.sh"), "#!/bin/sh\n").unwrap();
        git_ok(&source, &["add", "build.sh"]);
        git_ok(&source, &["commit", "-m", "build: ship the landing page"]);

        fs::create_dir_all(artifacts.join("css")).unwrap();
        fs::write(artifacts.join("index.html"), "<h1>hi</h1>\n").unwrap();
        fs::write(artifacts.join("css/site.css"), "h1 { color: red }\n").unwrap();

        Self {
            _dir: dir,
            remote,
            source,
            work,
            artifacts,
        }
    }

    /// Config targeting the fixture's remote, allowing `main`, prefix `dist`.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            repository: self.remote.to_string_lossy().into_owned(),
            branches: ["main".to_owned()].into(),
            prefix: "dist".to_owned(),
            source_dir: Some(self.source.clone()),
            work_dir: Some(self.work.clone()),
            ..PipelineConfig::default()
        }
    }

    /// The tip commit of `master` on the remote.
    pub fn remote_head(&self) -> String {
        git_ok(&self.remote, &["rev-parse", "refs/heads/master"])
    }

    /// Subject of the tip commit on the remote.
    pub fn remote_subject(&self) -> String {
        git_ok(&self.remote, &["log", "-1", "--format=%s", "master"])
    }

    /// Files tracked on the remote's `master`, sorted.
    pub fn remote_files(&self) -> Vec<String> {
        let out = git_ok(&self.remote, &["ls-tree", "-r", "--name-only", "master"]);
        let mut files: Vec<String> = out.lines().map(str::to_owned).collect();
        files.sort();
        files
    }

    /// Number of entries left in the work dir.
    pub fn work_entries(&self) -> usize {
        fs::read_dir(&self.work).unwrap().count()
    }
}
