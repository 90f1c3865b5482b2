//! Copy collected artifacts into the workspace.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::collect::ArtifactRecord;
use crate::error::{DeployError, Step};

/// What [`materialize`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Materialized {
    /// Files written into the workspace.
    pub copied: usize,
    /// Directory artifacts passed over.
    pub skipped_dirs: usize,
}

/// Copy every file artifact to `<root>/<dest>`, creating parent directories.
///
/// Sources are re-stated here: directory artifacts (a tree passed wholesale)
/// are skipped and only their leaf files count. Existing files at the
/// destination are overwritten. Runs after purge, so the only collisions are
/// with artifacts copied earlier in the same run.
///
/// # Errors
/// Returns [`DeployError`] tagged [`Step::Copy`] on the first I/O failure.
pub fn materialize(records: &[ArtifactRecord], root: &Path) -> Result<Materialized, DeployError> {
    info!("Copying source files to deployment folder");
    let mut result = Materialized::default();

    for record in records {
        let meta = fs::metadata(&record.source)
            .map_err(|e| DeployError::io(Step::Copy, &record.source, e))?;
        if meta.is_dir() {
            result.skipped_dirs += 1;
            continue;
        }

        let dest = root.join(&record.dest);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::io(Step::Copy, parent, e))?;
        }
        fs::copy(&record.source, &dest).map_err(|e| DeployError::io(Step::Copy, &dest, e))?;
        debug!(
            source = %record.source.display(),
            dest = %record.dest.display(),
            "copied artifact"
        );
        result.copied += 1;
    }

    debug!(copied = result.copied, skipped_dirs = result.skipped_dirs, "materialize complete");
    Ok(result)
}
