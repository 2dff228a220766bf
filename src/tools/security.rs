//! Path guard confining path arguments to the allowed root
//!
//! Every path-like argument is resolved to its canonical form before the
//! containment check:
//! - Relative paths are joined onto the root first
//! - Symlinks, `..` and `.` are resolved by the OS
//! - Containment is checked component-wise (`/sandbox2` is not in `/sandbox`)

use crate::errors::{GatewayError, Result, SecurityError};
use std::path::{Path, PathBuf};

/// Resolves and confines paths to a single directory tree
#[derive(Debug, Clone)]
pub struct PathGuard {
    /// Canonicalized allowed root directory
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard over `root`
    ///
    /// The root must exist and be a directory. It is canonicalized once here
    /// and never changes afterwards.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        if !root.exists() {
            return Err(GatewayError::ConfigError(format!(
                "Allowed directory does not exist: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            GatewayError::ConfigError(format!(
                "Failed to canonicalize allowed directory {}: {}",
                root.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(GatewayError::ConfigError(format!(
                "Allowed directory is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Resolve `raw` to a canonical absolute path inside the root
    ///
    /// # Resolution rules
    ///
    /// ```text
    /// Root: R (canonical)
    /// full(p)  = p            if p is absolute
    ///          = R.join(p)    otherwise
    /// resolve(p) = c          if c = canonicalize(full(p)) and c ∈ Subtree(R)
    ///            = PathEscape if c ∉ Subtree(R)
    ///            = InvalidPath if canonicalize fails
    /// ```
    ///
    /// Canonicalization touches the filesystem, so the path must exist.
    ///
    /// # Containment
    ///
    /// `canonicalize` removes every `..`, `.` and symlink, so the canonical
    /// path `c` names the real location on disk. `Path::starts_with` compares
    /// whole components, so `c.starts_with(R)` holds exactly when `c` is `R`
    /// or lies beneath it. An approved path therefore refers to a location
    /// inside `R` at the moment of the check.
    pub fn resolve(&self, raw: &str) -> std::result::Result<PathBuf, SecurityError> {
        let path = Path::new(raw);

        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = full_path
            .canonicalize()
            .map_err(|e| SecurityError::InvalidPath {
                path: raw.to_string(),
                reason: e.to_string(),
            })?;

        if !canonical.starts_with(&self.root) {
            return Err(SecurityError::PathEscape {
                path: raw.to_string(),
                root: self.root.display().to_string(),
            });
        }

        Ok(canonical)
    }

    /// Canonical allowed root
    pub fn root(&self) -> &Path {
        &self.root
    }
}
