//! Glob-based artifact producer for the CLI.
//!
//! Each pattern is evaluated relative to the working root and every match,
//! file or directory, becomes one [`ArtifactInput`]. Order is pattern order,
//! then the glob crate's alphabetical match order.
//!
//! Wildcards never match a leading `.`, so `**/*` skips dotfiles and does
//! not descend into hidden directories such as `.git`. Name a dotfile
//! literally (`dist/.nojekyll`) to ship it.

use std::path::{Path, PathBuf};

use glob::MatchOptions;
use thiserror::Error;

use crate::collect::ArtifactInput;

/// A pattern could not be expanded.
#[derive(Debug, Error)]
pub enum InputError {
    /// The pattern is not valid glob syntax.
    #[error("invalid artifact pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },

    /// A path matched but could not be read while walking.
    #[error("could not read artifact {}: {source}", path.display())]
    Walk {
        /// The unreadable path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// Expand `patterns` under `root` into artifact inputs.
///
/// Absolute patterns are used as given. Patterns that match nothing
/// contribute nothing.
///
/// # Errors
/// Returns [`InputError`] for malformed patterns or unreadable matches.
pub fn glob_inputs(patterns: &[String], root: &Path) -> Result<Vec<ArtifactInput>, InputError> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            root.join(pattern).to_string_lossy().into_owned()
        };
        let paths = glob::glob_with(&full, MATCH_OPTIONS).map_err(|source| InputError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in paths {
            let path = entry.map_err(|e| InputError::Walk {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            inputs.push(ArtifactInput::file(path, root));
        }
    }
    Ok(inputs)
}
