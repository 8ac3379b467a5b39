// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filesystem Engine
//!
//! Server-side implementation of stat, paginated directory listing and
//! open/read/close. Every path goes through [`PathConfinement`]; open files
//! live in the [`HandleTable`].
//!
//! All failures come back as [`FsError`] values so the RPC layer can put them
//! in the response payload instead of failing the call.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Confined, read-only file operations for remote clients

use crate::domain::file_info::FileInfo;
use crate::domain::fs_error::{FsError, FsResult};
use crate::domain::path_confinement::PathConfinement;
use crate::domain::remote::DirectoryPage;
use crate::infrastructure::handle_table::HandleTable;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Default clamp on a single read
pub const DEFAULT_MAX_READ_BYTES: usize = 1024 * 1024;

pub struct FileSystemEngine {
    confinement: PathConfinement,
    handles: Arc<HandleTable>,
    max_read_bytes: usize,
}

impl FileSystemEngine {
    pub fn new(confinement: PathConfinement) -> Self {
        Self {
            confinement,
            handles: Arc::new(HandleTable::new()),
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }

    pub fn with_max_read_bytes(mut self, max_read_bytes: usize) -> Self {
        self.max_read_bytes = max_read_bytes.max(1);
        self
    }

    pub fn confinement(&self) -> &PathConfinement {
        &self.confinement
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// `lstat` a share-relative path. A symlink in the final component is
    /// reported, not followed; symlinked directories along the way must
    /// resolve inside the share.
    pub async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let abs = self.confinement.confine(path)?;
        self.ensure_parent_confined(&abs).await?;
        let meta = tokio::fs::symlink_metadata(&abs).await?;
        Ok(FileInfo::from_metadata(entry_name(&abs), &meta))
    }

    /// List one page of a directory.
    ///
    /// The directory is enumerated in full on every call and sorted by name;
    /// `offset`/`limit` index into that snapshot. `limit <= 0` means no limit.
    pub async fn read_dir(&self, path: &str, offset: i32, limit: i32) -> FsResult<DirectoryPage> {
        if offset < 0 {
            return Err(FsError::invalid_argument(format!("negative offset {offset}")));
        }

        let abs = self.confinement.confine(path)?;
        self.ensure_target_confined(&abs).await?;

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&abs).await?;
        while let Some(entry) = dir.next_entry().await? {
            match tokio::fs::symlink_metadata(entry.path()).await {
                Ok(meta) => entries.push(FileInfo::from_metadata(
                    entry.file_name().to_string_lossy(),
                    &meta,
                )),
                // Removed between enumeration and lstat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(paginate(entries, offset as usize, limit))
    }

    /// Open a file for reading and return its handle id.
    ///
    /// `flags` are accepted for protocol compatibility; only read access is
    /// provided.
    pub async fn open(&self, path: &str, flags: i32) -> FsResult<u64> {
        let abs = self.confinement.confine(path)?;
        self.ensure_target_confined(&abs).await?;

        let file = tokio::fs::File::open(&abs).await?;
        let id = self.handles.register(abs, file);
        debug!(handle = id, flags, "Opened {}", path);
        Ok(id)
    }

    /// Read up to `size` bytes at `offset`.
    ///
    /// Short reads at end of file are successful and return the bytes
    /// actually available, possibly none.
    pub async fn read(&self, handle: u64, offset: i64, size: i32) -> FsResult<Vec<u8>> {
        let open = self.handles.get(handle)?;

        if offset < 0 {
            return Err(FsError::invalid_argument(format!("negative offset {offset}")));
        }
        if size < 0 {
            return Err(FsError::invalid_argument(format!("negative size {size}")));
        }

        let want = (size as usize).min(self.max_read_bytes);
        let mut buf = vec![0u8; want];
        let mut filled = 0;

        {
            let mut file = open.lock().await;
            file.seek(SeekFrom::Start(offset as u64)).await?;
            while filled < want {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    /// Close a handle. Closing an unknown or already-closed id is a
    /// bad-handle error every time.
    pub async fn close(&self, handle: u64) -> FsResult<()> {
        let open = self.handles.take(handle)?;
        debug!(handle, "Closed {:?}", open.path());
        Ok(())
    }

    /// Reject a path whose symlink-resolved target lies outside the share.
    async fn ensure_target_confined(&self, abs: &Path) -> FsResult<()> {
        let resolved = tokio::fs::canonicalize(abs).await?;
        if !self.confinement.contains(&resolved) {
            tracing::warn!(path = ?abs, "Symlink target escapes share root");
            return Err(FsError::permission_denied("path escapes share root"));
        }
        Ok(())
    }

    /// Same check for every component but the last, which lstat leaves alone.
    async fn ensure_parent_confined(&self, abs: &Path) -> FsResult<()> {
        match abs.parent() {
            Some(parent) if abs != self.confinement.root() => {
                self.ensure_target_confined(parent).await
            }
            _ => Ok(()),
        }
    }
}

fn entry_name(abs: &Path) -> String {
    abs.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn paginate(entries: Vec<FileInfo>, offset: usize, limit: i32) -> DirectoryPage {
    let total = entries.len();
    let start = offset.min(total);
    let end = if limit <= 0 {
        total
    } else {
        start.saturating_add(limit as usize).min(total)
    };

    let page: Vec<FileInfo> = entries.into_iter().skip(start).take(end - start).collect();
    let has_more = start + page.len() < total;
    DirectoryPage {
        entries: page,
        has_more,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<FileInfo> {
        names
            .iter()
            .map(|n| FileInfo {
                name: n.to_string(),
                ..Default::default()
            })
            .collect()
    }

    fn names(page: &DirectoryPage) -> Vec<&str> {
        page.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_paginate_unlimited() {
        let page = paginate(named(&["a", "b", "c"]), 0, 0);
        assert_eq!(names(&page), ["a", "b", "c"]);
        assert!(!page.has_more);

        let page = paginate(named(&["a", "b", "c"]), 1, -5);
        assert_eq!(names(&page), ["b", "c"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_window() {
        let page = paginate(named(&["a", "b", "c", "d"]), 1, 2);
        assert_eq!(names(&page), ["b", "c"]);
        assert!(page.has_more);

        let page = paginate(named(&["a", "b", "c", "d"]), 2, 2);
        assert_eq!(names(&page), ["c", "d"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_offset_past_end() {
        let page = paginate(named(&["a"]), 5, 2);
        assert!(page.entries.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_large_limit_does_not_overflow() {
        let page = paginate(named(&["a", "b"]), 1, i32::MAX);
        assert_eq!(names(&page), ["b"]);
    }

    #[test]
    fn test_tiny_read_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), b"abc").unwrap();
        let engine = FileSystemEngine::new(PathConfinement::new(dir.path()).unwrap()).with_max_read_bytes(1);

        let handle = tokio_test::block_on(engine.open("f", 0)).unwrap();
        let data = tokio_test::block_on(engine.read(handle, 0, 3)).unwrap();
        assert_eq!(data, b"a");
    }

    #[test]
    fn test_entry_name_of_root() {
        assert_eq!(entry_name(Path::new("/")), ".");
        assert_eq!(entry_name(Path::new("/srv/a.txt")), "a.txt");
    }
}
