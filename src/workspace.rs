//! The ephemeral deploy workspace.
//!
//! One pipeline run owns exactly one [`Workspace`]: a fresh single-branch
//! clone of the deploy repository under `<work_dir>/deploy-<millis>`. It is
//! purged of tracked content before artifacts are copied in, and removed when
//! the run ends however it ends.
//!
//! # Directory layout
//!
//! ```text
//! work_dir/
//! └── deploy-1718031212345/   ← workspace (clone of remote_branch)
//!     ├── .git/               ← kept by purge; needed for commit/push
//!     └── ...                 ← deleted by purge, replaced by artifacts
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use deploy_git_vcs::Vcs;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{DeployError, Step};
use crate::exec::invoke_ok;

/// Version-control metadata directory, never touched by purge.
pub const METADATA_DIR: &str = ".git";

/// Workspace directory name prefix.
pub const WORKSPACE_PREFIX: &str = "deploy-";

/// A workspace path reserved for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Reserve `deploy-<unix millis>` under `work_dir`.
    ///
    /// If that name is taken (two runs in the same millisecond, or a leftover
    /// from a crashed run) the timestamp is bumped until a free name is found.
    /// Nothing is created on disk.
    #[must_use]
    pub fn allocate(work_dir: &Path) -> Self {
        let mut stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        loop {
            let path = work_dir.join(format!("{WORKSPACE_PREFIX}{stamp}"));
            if fs::symlink_metadata(&path).is_err() {
                return Self { path };
            }
            stamp += 1;
        }
    }

    /// A workspace at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The workspace root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether anything exists at the workspace path.
    #[must_use]
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    /// Clone `remote_branch` of `repository` into the workspace.
    ///
    /// # Errors
    /// Returns [`DeployError`] tagged [`Step::Clone`] if the clone exits non-zero.
    pub fn create<V: Vcs + ?Sized>(
        &self,
        vcs: &V,
        config: &PipelineConfig,
        cwd: &Path,
    ) -> Result<(), DeployError> {
        info!("Cloning remote deployment repository");
        let dest = self.path.to_string_lossy();
        let args = [
            "clone",
            "-b",
            config.remote_branch.as_str(),
            "--single-branch",
            config.repository.as_str(),
            dest.as_ref(),
        ];
        invoke_ok(vcs, Step::Clone, &args, cwd)?;
        debug!(workspace = %self.path.display(), "clone complete");
        Ok(())
    }

    /// Delete every file in the workspace except version-control metadata.
    ///
    /// Directories are descended into (never the metadata directory) and
    /// removed once empty. Symlinks are unlinked, not followed. Running purge
    /// on an already purged workspace is a no-op.
    ///
    /// # Errors
    /// Returns [`DeployError`] tagged [`Step::Purge`] on the first I/O failure.
    pub fn purge(&self) -> Result<(), DeployError> {
        info!("Cleaning deployment repository folder");
        purge_dir(&self.path)
    }

    /// Remove the workspace if it exists.
    ///
    /// Returns whether there was anything to remove.
    ///
    /// # Errors
    /// Returns the I/O error from the removal. Callers log it; it never
    /// changes a run's outcome.
    pub fn teardown(&self) -> std::io::Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        info!("Removing local deployment folder");
        fs::remove_dir_all(&self.path)?;
        Ok(true)
    }
}

fn io(path: &Path) -> impl FnOnce(std::io::Error) -> DeployError + use<> {
    let path = path.to_path_buf();
    move |source| DeployError::io(Step::Purge, &path, source)
}

fn purge_dir(dir: &Path) -> Result<(), DeployError> {
    for entry in fs::read_dir(dir).map_err(io(dir))? {
        let entry = entry.map_err(io(dir))?;
        let path = entry.path();
        // `DirEntry::file_type` does not follow symlinks.
        let file_type = entry.file_type().map_err(io(&path))?;
        if file_type.is_dir() {
            if entry.file_name() == METADATA_DIR {
                continue;
            }
            purge_dir(&path)?;
            let now_empty = fs::read_dir(&path).map_err(io(&path))?.next().is_none();
            if now_empty {
                fs::remove_dir(&path).map_err(io(&path))?;
            }
        } else {
            fs::remove_file(&path).map_err(io(&path))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedVcs;
    use deploy_git_vcs::ProcessOutput;
    use tempfile::TempDir;

    fn remaining(root: &Path) -> Vec<String> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
            for entry in fs::read_dir(dir).unwrap() {
                let entry = entry.unwrap();
                let path = entry.path();
                out.push(path.strip_prefix(root).unwrap().to_string_lossy().into_owned());
                if entry.file_type().unwrap().is_dir() {
                    walk(root, &path, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(root, root, &mut out);
        out.sort();
        out
    }

    fn populated() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::at(dir.path().join("ws"));
        let root = ws.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        fs::write(root.join("index.html"), "<html>").unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/c.txt"), "c").unwrap();
        fs::create_dir_all(root.join("vendor/.git")).unwrap();
        fs::write(root.join("vendor/.git/config"), "").unwrap();
        fs::write(root.join("vendor/lib.js"), "").unwrap();
        (dir, ws)
    }

    #[test]
    fn allocate_names_by_timestamp_and_avoids_collisions() {
        let dir = TempDir::new().unwrap();
        let first = Workspace::allocate(dir.path());
        let name = first.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(WORKSPACE_PREFIX));
        assert!(name[WORKSPACE_PREFIX.len()..].parse::<u128>().is_ok());
        assert!(!first.exists());

        fs::create_dir(first.path()).unwrap();
        let second = Workspace::allocate(dir.path());
        assert_ne!(first, second);
        assert!(!second.exists());
    }

    #[test]
    fn create_clones_single_branch_into_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::at(dir.path().join("deploy-1"));
        let config = PipelineConfig {
            repository: "https://example/repo.git".to_owned(),
            remote_branch: "gh-pages".to_owned(),
            ..PipelineConfig::default()
        };
        let vcs = ScriptedVcs::new();
        ws.create(&vcs, &config, dir.path()).unwrap();

        let call = vcs.call("clone").unwrap();
        let dest = ws.path().to_string_lossy().into_owned();
        assert_eq!(
            call.args,
            [
                "clone",
                "-b",
                "gh-pages",
                "--single-branch",
                "https://example/repo.git",
                dest.as_str(),
            ]
        );
        assert!(ws.path().join(METADATA_DIR).is_dir());
    }

    #[test]
    fn create_fails_on_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::at(dir.path().join("deploy-1"));
        let config = PipelineConfig {
            repository: "https://example/repo.git".to_owned(),
            ..PipelineConfig::default()
        };
        let vcs = ScriptedVcs::new().respond("clone", ProcessOutput::failed(128, "not found"));
        let err = ws.create(&vcs, &config, dir.path()).unwrap_err();
        assert_eq!(err.step(), Step::Clone);
    }

    #[test]
    fn purge_keeps_only_metadata() {
        let (_dir, ws) = populated();
        ws.purge().unwrap();
        assert_eq!(
            remaining(ws.path()),
            vec![
                ".git",
                ".git/HEAD",
                ".git/objects",
                "vendor",
                "vendor/.git",
                "vendor/.git/config",
            ]
        );
    }

    #[test]
    fn purge_is_idempotent() {
        let (_dir, ws) = populated();
        ws.purge().unwrap();
        let after_first = remaining(ws.path());
        ws.purge().unwrap();
        assert_eq!(remaining(ws.path()), after_first);
    }

    #[cfg(unix)]
    #[test]
    fn purge_unlinks_symlinks_without_following() {
        let (dir, ws) = populated();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("keep.txt"), "keep").unwrap();
        std::os::unix::fs::symlink(&outside, ws.path().join("link")).unwrap();

        ws.purge().unwrap();
        assert!(fs::symlink_metadata(ws.path().join("link")).is_err());
        assert!(outside.join("keep.txt").exists());
    }

    #[test]
    fn purge_of_missing_workspace_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::at(dir.path().join("missing"));
        let err = ws.purge().unwrap_err();
        assert!(matches!(err, DeployError::Io { step: Step::Purge, .. }));
    }

    #[test]
    fn teardown_removes_tree_and_reports_absence() {
        let (_dir, ws) = populated();
        assert!(ws.teardown().unwrap());
        assert!(!ws.exists());
        assert!(!ws.teardown().unwrap());
    }

    #[test]
    fn teardown_of_non_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::at(dir.path().join("ws"));
        fs::write(ws.path(), "not a checkout").unwrap();
        assert!(ws.teardown().is_err());
        assert!(ws.exists());
    }
}
