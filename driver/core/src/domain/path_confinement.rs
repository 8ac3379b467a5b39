// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Confinement Domain Service
//!
//! Resolves client-supplied share-relative paths against the share root and
//! rejects anything that would land outside it. Every server request path
//! (stat, list, open, watch subscribe) goes through [`PathConfinement::confine`];
//! no handler builds an absolute path any other way.
//!
//! Resolution is purely lexical: `.` segments are dropped, `..` pops one
//! segment and popping past the root is an escape. Symlinks are never resolved
//! here. Callers that need to follow a link (open, list) must re-check the
//! resolved target with [`PathConfinement::contains`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Single security boundary between remote requests and the host filesystem

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default maximum accepted length of a client path, in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Path confinement errors
#[derive(Debug, Error)]
pub enum ConfinementError {
    #[error("Path escapes share root: {0}")]
    Escape(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path too long: {len} bytes (max {max})")]
    PathTooLong { len: usize, max: usize },

    #[error("Invalid share root {root}: {reason}")]
    InvalidRoot { root: String, reason: String },
}

/// Share-root confinement
///
/// Holds the canonical absolute share root. Cheap to clone and share between
/// request handlers.
#[derive(Debug, Clone)]
pub struct PathConfinement {
    root: PathBuf,
    max_path_len: usize,
}

impl PathConfinement {
    /// Create a confinement rooted at `root`.
    ///
    /// The root is canonicalized once here, so it must exist. Later checks
    /// compare against the canonical form, which keeps symlinked share paths
    /// (e.g. `/tmp` on macOS) consistent with what the OS reports back.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ConfinementError> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|e| ConfinementError::InvalidRoot {
            root: root.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root: canonical,
            max_path_len: DEFAULT_MAX_PATH_LEN,
        })
    }

    /// Override the maximum accepted path length
    pub fn with_max_length(mut self, max_path_len: usize) -> Self {
        self.max_path_len = max_path_len;
        self
    }

    /// Canonical absolute share root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` to an absolute path that is the root or a descendant of it.
    ///
    /// A leading `/` is treated as the share root, not the host root.
    ///
    /// # Examples
    /// ```
    /// use fsdriver_core::domain::path_confinement::PathConfinement;
    ///
    /// let dir = std::env::temp_dir();
    /// let confinement = PathConfinement::new(&dir).unwrap();
    ///
    /// let inside = confinement.confine("a/./b/../c.txt").unwrap();
    /// assert_eq!(inside, confinement.root().join("a").join("c.txt"));
    ///
    /// assert!(confinement.confine("../etc/passwd").is_err());
    /// ```
    pub fn confine(&self, relative: &str) -> Result<PathBuf, ConfinementError> {
        if relative.len() > self.max_path_len {
            tracing::warn!(len = relative.len(), "Rejected over-long path");
            return Err(ConfinementError::PathTooLong {
                len: relative.len(),
                max: self.max_path_len,
            });
        }

        if relative.contains('\0') {
            tracing::warn!("Rejected path containing NUL byte");
            return Err(ConfinementError::InvalidPath(
                "path contains NUL byte".to_string(),
            ));
        }

        let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => segments.push(part),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    if segments.pop().is_none() {
                        tracing::warn!(path = %relative, "Path traversal beyond share root");
                        return Err(ConfinementError::Escape(relative.to_string()));
                    }
                }
            }
        }

        let mut resolved = self.root.clone();
        resolved.extend(segments);

        if !self.contains(&resolved) {
            tracing::warn!(path = %relative, "Resolved path outside share root");
            return Err(ConfinementError::Escape(relative.to_string()));
        }

        Ok(resolved)
    }

    /// True when `path` is the root itself or lies beneath it.
    ///
    /// Compares whole components, so `/share2` is not inside `/share`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Express an absolute path as a share-relative, forward-slash path.
    ///
    /// Returns `None` for paths outside the root. The root itself maps to `""`.
    pub fn relative_to_root(&self, path: &Path) -> Option<String> {
        let stripped = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = stripped
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn share() -> (TempDir, PathConfinement) {
        let dir = TempDir::new().unwrap();
        let confinement = PathConfinement::new(dir.path()).unwrap();
        (dir, confinement)
    }

    #[test]
    fn test_empty_and_dot_resolve_to_root() {
        let (_dir, c) = share();
        assert_eq!(c.confine("").unwrap(), c.root());
        assert_eq!(c.confine(".").unwrap(), c.root());
        assert_eq!(c.confine("./").unwrap(), c.root());
    }

    #[test]
    fn test_nested_path() {
        let (_dir, c) = share();
        assert_eq!(
            c.confine("docs/guide/intro.md").unwrap(),
            c.root().join("docs/guide/intro.md")
        );
    }

    #[test]
    fn test_leading_slash_is_share_relative() {
        let (_dir, c) = share();
        assert_eq!(c.confine("/etc/passwd").unwrap(), c.root().join("etc/passwd"));
    }

    #[test]
    fn test_parent_segments_within_root() {
        let (_dir, c) = share();
        assert_eq!(c.confine("a/b/../../c").unwrap(), c.root().join("c"));
        assert_eq!(c.confine("a/..").unwrap(), c.root());
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, c) = share();
        assert!(matches!(c.confine(".."), Err(ConfinementError::Escape(_))));
        assert!(matches!(c.confine("../etc"), Err(ConfinementError::Escape(_))));
        assert!(matches!(c.confine("a/../../b"), Err(ConfinementError::Escape(_))));
        assert!(matches!(c.confine("/../x"), Err(ConfinementError::Escape(_))));
    }

    #[test]
    fn test_sibling_with_common_prefix_is_outside() {
        let parent = TempDir::new().unwrap();
        std::fs::create_dir(parent.path().join("share")).unwrap();
        std::fs::create_dir(parent.path().join("share2")).unwrap();

        let c = PathConfinement::new(parent.path().join("share")).unwrap();
        let sibling = std::fs::canonicalize(parent.path().join("share2")).unwrap();

        assert!(!c.contains(&sibling));
        assert!(!c.contains(&sibling.join("file")));
        assert!(c.confine("../share2/file").is_err());
    }

    #[test]
    fn test_nul_byte_rejected() {
        let (_dir, c) = share();
        assert!(matches!(
            c.confine("a\0b"),
            Err(ConfinementError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_path_too_long() {
        let (_dir, c) = share();
        let c = c.with_max_length(8);
        assert!(matches!(
            c.confine("abcdefghij"),
            Err(ConfinementError::PathTooLong { len: 10, max: 8 })
        ));
    }

    #[test]
    fn test_missing_root_is_invalid() {
        let dir = TempDir::new().unwrap();
        let err = PathConfinement::new(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ConfinementError::InvalidRoot { .. }));
    }

    #[test]
    fn test_never_resolves_outside_root() {
        let (_dir, c) = share();
        let segments = ["..", ".", "a", "b", "", "/"];
        // Every path of up to four segments drawn from the alphabet above
        for a in segments {
            for b in segments {
                for d in segments {
                    for e in segments {
                        let p = format!("{a}/{b}/{d}/{e}");
                        if let Ok(resolved) = c.confine(&p) {
                            assert!(c.contains(&resolved), "{p} resolved to {resolved:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_relative_to_root() {
        let (_dir, c) = share();
        assert_eq!(c.relative_to_root(c.root()).unwrap(), "");
        assert_eq!(
            c.relative_to_root(&c.root().join("a").join("b.txt")).unwrap(),
            "a/b.txt"
        );
        assert!(c.relative_to_root(Path::new("/definitely/elsewhere")).is_none());
    }
}
