// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Open file handle table
//!
//! Maps the opaque `u64` handles given to clients onto open host files.
//! The table lock is held only while the map is mutated; the per-handle async
//! mutex serializes seek+read on one descriptor.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Server-side open-file state shared by all concurrent calls

use crate::domain::fs_error::{FsError, FsResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One open file
#[derive(Debug)]
pub struct OpenHandle {
    id: u64,
    path: PathBuf,
    file: Mutex<File>,
}

impl OpenHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Confined absolute path the handle was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive access to the descriptor and its seek position
    pub async fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().await
    }
}

/// Handle registry
///
/// Ids come from a monotonically increasing counter starting at 1 and are
/// never reused within the life of the table.
#[derive(Debug)]
pub struct HandleTable {
    next_id: AtomicU64,
    handles: RwLock<HashMap<u64, Arc<OpenHandle>>>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Register an open file and return its new handle id
    pub fn register(&self, path: PathBuf, file: File) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!("Registered file handle: handle={}, path={:?}", id, path);

        let handle = Arc::new(OpenHandle {
            id,
            path,
            file: Mutex::new(file),
        });
        self.handles.write().insert(id, handle);
        id
    }

    /// Look up a live handle. A miss is a bad-handle error.
    pub fn get(&self, id: u64) -> FsResult<Arc<OpenHandle>> {
        self.handles
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| FsError::bad_handle(id))
    }

    /// Remove a handle and hand ownership to the caller.
    ///
    /// The descriptor closes once the returned value and any in-flight reads
    /// holding it are dropped. A second `take` of the same id fails.
    pub fn take(&self, id: u64) -> FsResult<Arc<OpenHandle>> {
        let handle = self
            .handles
            .write()
            .remove(&id)
            .ok_or_else(|| FsError::bad_handle(id))?;
        debug!("Released file handle: handle={}", id);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fs_error::FsErrorKind;
    use tempfile::TempDir;

    async fn open_temp(dir: &TempDir, name: &str) -> (PathBuf, File) {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"data").await.unwrap();
        let file = File::open(&path).await.unwrap();
        (path, file)
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let dir = TempDir::new().unwrap();
        let table = HandleTable::new();

        let (p1, f1) = open_temp(&dir, "a").await;
        let (p2, f2) = open_temp(&dir, "b").await;
        let h1 = table.register(p1, f1);
        let h2 = table.register(p2, f2);
        assert!(h2 > h1);

        table.take(h2).unwrap();
        let (p3, f3) = open_temp(&dir, "c").await;
        let h3 = table.register(p3, f3);
        assert!(h3 > h2, "ids must not be reused");
    }

    #[tokio::test]
    async fn test_get_and_take() {
        let dir = TempDir::new().unwrap();
        let table = HandleTable::new();
        let (path, file) = open_temp(&dir, "a").await;
        let id = table.register(path.clone(), file);

        assert_eq!(table.get(id).unwrap().path(), path.as_path());
        assert_eq!(table.len(), 1);

        table.take(id).unwrap();
        assert!(table.is_empty());

        let err = table.get(id).unwrap_err();
        assert_eq!(err.kind, FsErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_double_take_is_bad_handle() {
        let dir = TempDir::new().unwrap();
        let table = HandleTable::new();
        let (path, file) = open_temp(&dir, "a").await;
        let id = table.register(path, file);

        assert!(table.take(id).is_ok());
        assert_eq!(table.take(id).unwrap_err(), FsError::bad_handle(id));
        assert_eq!(table.take(9999).unwrap_err(), FsError::bad_handle(9999));
    }
}
