// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote filesystem bridge
//!
//! Async implementation of the kernel callbacks on top of a
//! [`RemoteFileSystem`]. Results are plain errno values so the fuser adapter
//! only has to forward them.
//!
//! Error mapping:
//! - in-band remote errors keep their errno
//! - transport failures become `ENOENT` for lookup/getattr and `EIO` elsewhere
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Kernel callback semantics independent of the FUSE library

use super::inode_table::{child_path, parent_path, InodeTable, ROOT_INODE};
use crate::domain::file_info::FileInfo;
use crate::domain::remote::{RemoteError, RemoteFileSystem};
use libc::{c_int, EBADF, EIO, ENOENT, EROFS};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry type as shown in directory listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

impl EntryKind {
    pub fn of(info: &FileInfo) -> Self {
        if info.is_dir {
            EntryKind::Directory
        } else if info.is_symlink {
            EntryKind::Symlink
        } else {
            EntryKind::File
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub kind: EntryKind,
    pub name: String,
}

/// Snapshot held by one directory handle
#[derive(Debug)]
struct Listing {
    entries: Arc<Vec<DirEntry>>,
    /// Inodes pinned for this snapshot, released with it
    pinned: Vec<u64>,
}

/// One kernel-level open of a remote file
#[derive(Debug)]
struct OpenSession {
    remote_handle: u64,
    /// Serializes reads issued through this open
    lock: tokio::sync::Mutex<()>,
}

fn errno_or(err: RemoteError, transport: c_int) -> c_int {
    match err {
        RemoteError::Fs(e) => e.code(),
        RemoteError::Transport(_) => transport,
    }
}

pub struct RemoteFsBridge {
    remote: Arc<dyn RemoteFileSystem>,
    inodes: InodeTable,
    read_only: bool,
    next_fh: AtomicU64,
    sessions: Mutex<HashMap<u64, Arc<OpenSession>>>,
    listings: Mutex<HashMap<u64, Listing>>,
}

impl RemoteFsBridge {
    pub fn new(remote: Arc<dyn RemoteFileSystem>, read_only: bool) -> Self {
        Self {
            remote,
            inodes: InodeTable::new(),
            read_only,
            next_fh: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
            listings: Mutex::new(HashMap::new()),
        }
    }

    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes.path(ino).ok_or(ENOENT)
    }

    fn allocate_fh(&self) -> u64 {
        self.next_fh.fetch_add(1, Ordering::SeqCst)
    }

    /// Resolve `name` in `parent`; returns the child's inode and attributes.
    pub async fn lookup(&self, parent: u64, name: &str) -> Result<(u64, FileInfo), c_int> {
        let path = child_path(&self.path_of(parent)?, name);
        match self.remote.stat(&path).await {
            Ok(info) => Ok((self.inodes.lookup(&path), info)),
            Err(e) => {
                debug!(path = %path, error = %e, "lookup failed");
                Err(errno_or(e, ENOENT))
            }
        }
    }

    pub async fn getattr(&self, ino: u64) -> Result<FileInfo, c_int> {
        let path = self.path_of(ino)?;
        self.remote.stat(&path).await.map_err(|e| {
            debug!(path = %path, error = %e, "getattr failed");
            errno_or(e, ENOENT)
        })
    }

    /// Open a remote file and return a local file handle for it
    pub async fn open(&self, ino: u64, flags: i32) -> Result<u64, c_int> {
        if self.read_only && (flags & libc::O_ACCMODE) != libc::O_RDONLY {
            return Err(EROFS);
        }
        let path = self.path_of(ino)?;

        let remote_handle = self.remote.open(&path, flags).await.map_err(|e| {
            warn!(path = %path, error = %e, "open failed");
            errno_or(e, EIO)
        })?;

        let fh = self.allocate_fh();
        self.sessions.lock().insert(
            fh,
            Arc::new(OpenSession {
                remote_handle,
                lock: tokio::sync::Mutex::new(()),
            }),
        );
        debug!(path = %path, fh, remote_handle, "opened");
        Ok(fh)
    }

    /// Read up to `size` bytes; fewer at end of file.
    pub async fn read(&self, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let session = self.sessions.lock().get(&fh).cloned().ok_or(EBADF)?;
        let size = i32::try_from(size).unwrap_or(i32::MAX);

        let _guard = session.lock.lock().await;
        self.remote
            .read(session.remote_handle, offset, size)
            .await
            .map_err(|e| {
                debug!(fh, error = %e, "read failed");
                errno_or(e, EIO)
            })
    }

    /// Close the remote handle. Failures are logged and reported as `EIO`.
    pub async fn release(&self, fh: u64) -> Result<(), c_int> {
        let session = self.sessions.lock().remove(&fh).ok_or(EBADF)?;

        // Let in-flight reads on this open finish first
        let _guard = session.lock.lock().await;
        self.remote.close(session.remote_handle).await.map_err(|e| {
            warn!(fh, remote_handle = session.remote_handle, error = %e, "release failed");
            EIO
        })
    }

    /// Fetch the full listing once and keep it for the directory handle.
    ///
    /// The snapshot starts with `.` and `..`.
    pub async fn opendir(&self, ino: u64) -> Result<u64, c_int> {
        let path = self.path_of(ino)?;
        let page = self.remote.read_dir(&path, 0, 0).await.map_err(|e| {
            debug!(path = %path, error = %e, "opendir failed");
            errno_or(e, EIO)
        })?;
        if page.has_more {
            debug!(path = %path, "server reported more entries for an unlimited listing");
        }

        let mut pinned = Vec::with_capacity(page.entries.len() + 1);
        let parent_ino = if ino == ROOT_INODE {
            ROOT_INODE
        } else {
            let parent = self.inodes.pin(parent_path(&path));
            pinned.push(parent);
            parent
        };

        let mut entries = Vec::with_capacity(page.entries.len() + 2);
        entries.push(DirEntry {
            ino,
            kind: EntryKind::Directory,
            name: ".".to_string(),
        });
        entries.push(DirEntry {
            ino: parent_ino,
            kind: EntryKind::Directory,
            name: "..".to_string(),
        });
        for info in &page.entries {
            let child = self.inodes.pin(&child_path(&path, &info.name));
            pinned.push(child);
            entries.push(DirEntry {
                ino: child,
                kind: EntryKind::of(info),
                name: info.name.clone(),
            });
        }

        let fh = self.allocate_fh();
        self.listings.lock().insert(
            fh,
            Listing {
                entries: Arc::new(entries),
                pinned,
            },
        );
        Ok(fh)
    }

    /// Snapshot taken at `opendir`
    pub fn readdir(&self, fh: u64) -> Result<Arc<Vec<DirEntry>>, c_int> {
        self.listings
            .lock()
            .get(&fh)
            .map(|listing| listing.entries.clone())
            .ok_or(EBADF)
    }

    /// Drop the snapshot; entries the kernel never looked up are released.
    pub fn releasedir(&self, fh: u64) {
        let listing = self.listings.lock().remove(&fh);
        if let Some(listing) = listing {
            for ino in listing.pinned {
                self.inodes.unpin(ino);
            }
        }
    }

    pub fn forget(&self, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }
}
