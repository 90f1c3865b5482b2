//! Artifact collection.
//!
//! The upstream producer streams [`ArtifactInput`]s. The [`Collector`] turns
//! each one into an [`ArtifactRecord`]: the source file plus its destination
//! path relative to the workspace root, with the configured prefix removed.
//! Collection is pure bookkeeping and never touches the filesystem.
//!
//! Path handling is component-based. A prefix of `dist` strips `dist/a.txt`
//! to `a.txt` but leaves `distribution/a.txt` alone.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::workspace::METADATA_DIR;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One item from the upstream artifact stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactInput {
    /// A file (or directory) on disk.
    File {
        /// Absolute path of the artifact.
        path: PathBuf,
        /// Working root the destination path is computed against.
        root: PathBuf,
    },
    /// In-memory content with no backing file. Not supported.
    Buffer {
        /// Name the producer gave the buffer.
        name: String,
    },
}

impl ArtifactInput {
    /// A file input.
    pub fn file(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            root: root.into(),
        }
    }
}

/// A source file and where it lands in the workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Absolute, readable path owned by the producer.
    pub source: PathBuf,
    /// Normalized path relative to the workspace root.
    pub dest: PathBuf,
}

/// Why an input was rejected. Any of these aborts collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The input has no backing path.
    #[error("unsupported input `{name}`: only files on disk can be deployed")]
    Unsupported {
        /// Name of the rejected buffer.
        name: String,
    },

    /// The artifact is not under its working root.
    #[error("artifact {} is outside its working root {}", path.display(), root.display())]
    OutsideRoot {
        /// Artifact path.
        path: PathBuf,
        /// Working root.
        root: PathBuf,
    },

    /// The destination lies inside the workspace's version-control metadata.
    #[error(
        "artifact {} would land in {}, inside the `{}` metadata directory",
        path.display(),
        dest.display(),
        METADATA_DIR
    )]
    Metadata {
        /// Artifact path.
        path: PathBuf,
        /// Rejected destination.
        dest: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates artifacts keyed by destination path.
///
/// A later artifact with the same destination replaces an earlier one.
#[derive(Debug, Default)]
pub struct Collector {
    prefix: PathBuf,
    records: BTreeMap<PathBuf, PathBuf>,
}

impl Collector {
    /// A collector that strips `prefix` from every destination.
    ///
    /// Both `/` and `\` are accepted as separators; empty and `.` segments
    /// are dropped.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: split_prefix(prefix),
            records: BTreeMap::new(),
        }
    }

    /// Record one input.
    ///
    /// An input that resolves to the prefix directory itself has no
    /// destination and is ignored.
    ///
    /// # Errors
    /// Returns [`CollectError`] for buffers, for paths outside the root and
    /// for destinations under the metadata directory.
    pub fn push(&mut self, input: ArtifactInput) -> Result<(), CollectError> {
        let (path, root) = match input {
            ArtifactInput::File { path, root } => (path, root),
            ArtifactInput::Buffer { name } => return Err(CollectError::Unsupported { name }),
        };

        let root_abs = lexical_normalize(&root);
        let source_abs = lexical_normalize(&root.join(&path));
        let Ok(rel) = source_abs.strip_prefix(&root_abs) else {
            return Err(CollectError::OutsideRoot { path, root });
        };

        let dest = if !self.prefix.as_os_str().is_empty() && rel.starts_with(&self.prefix) {
            rel.strip_prefix(&self.prefix).unwrap_or(rel)
        } else {
            rel
        };

        if dest.as_os_str().is_empty() {
            debug!(path = %source_abs.display(), "artifact is the working root itself, ignoring");
            return Ok(());
        }

        if dest.components().any(|c| c.as_os_str() == METADATA_DIR) {
            let dest = dest.to_path_buf();
            return Err(CollectError::Metadata {
                path: source_abs,
                dest,
            });
        }

        let dest = dest.to_path_buf();
        if let Some(previous) = self.records.insert(dest.clone(), source_abs) {
            debug!(
                dest = %dest.display(),
                previous = %previous.display(),
                "artifact destination collected twice, keeping the later source"
            );
        }
        Ok(())
    }

    /// Record every input, stopping at the first rejected one.
    ///
    /// # Errors
    /// Returns the first [`CollectError`].
    pub fn extend<I>(&mut self, inputs: I) -> Result<(), CollectError>
    where
        I: IntoIterator<Item = ArtifactInput>,
    {
        for input in inputs {
            self.push(input)?;
        }
        Ok(())
    }

    /// Number of distinct destinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finish collection. Records come back ordered by destination.
    #[must_use]
    pub fn into_records(self) -> Vec<ArtifactRecord> {
        self.records
            .into_iter()
            .map(|(dest, source)| ArtifactRecord { source, dest })
            .collect()
    }
}

/// Split a user-supplied prefix into path segments.
fn split_prefix(prefix: &str) -> PathBuf {
    prefix
        .split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect()
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the root or a leading `..` of a relative path.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
