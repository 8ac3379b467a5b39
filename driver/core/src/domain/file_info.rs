// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File metadata value object
//!
//! POSIX-shaped metadata reported by stat and directory listings. Built fresh
//! from host metadata on every call; the server never caches it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Platform-neutral file attributes

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata for one filesystem entry
///
/// Timestamps are whole seconds since the Unix epoch. `mode` holds permission
/// bits only; the entry type is carried by `is_dir`/`is_symlink`. Ownership is
/// not mapped, so `uid`/`gid` are always 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub mod_time: i64,
    pub access_time: i64,
    pub change_time: i64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl FileInfo {
    /// Build from `lstat`-style metadata (symlinks are not followed).
    pub fn from_metadata(name: impl Into<String>, meta: &Metadata) -> Self {
        let (access_time, mod_time, change_time, mode) = times_and_mode(meta);
        let file_type = meta.file_type();

        Self {
            name: name.into(),
            is_dir: file_type.is_dir(),
            is_symlink: file_type.is_symlink(),
            size: meta.len(),
            mod_time,
            access_time,
            change_time,
            mode,
            uid: 0,
            gid: 0,
        }
    }
}

#[cfg(unix)]
fn times_and_mode(meta: &Metadata) -> (i64, i64, i64, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.atime(), meta.mtime(), meta.ctime(), meta.mode() & 0o7777)
}

#[cfg(not(unix))]
fn times_and_mode(meta: &Metadata) -> (i64, i64, i64, u32) {
    let mtime = meta.modified().map(epoch_seconds).unwrap_or(0);
    let atime = meta.accessed().map(epoch_seconds).unwrap_or(mtime);
    let mode = match (meta.is_dir(), meta.permissions().readonly()) {
        (true, true) => 0o555,
        (true, false) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    };
    (atime, mtime, mtime, mode)
}

/// Seconds since the Unix epoch; negative for times before it.
pub fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
