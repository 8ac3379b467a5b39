// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inode table for the FUSE translation layer
//!
//! Maps kernel inode numbers to share-relative paths. Numbers come from a
//! sequential arena with an explicit occupancy check, so two paths never share
//! an inode. The root directory is always inode 1 with path `""`.
//!
//! An entry stays alive while the kernel holds lookups on it or an open
//! directory listing pins it; it is dropped as soon as both reach zero.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Stable kernel node identity for remote entries

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Inode of the mount root (matches `fuser::FUSE_ROOT_ID`)
pub const ROOT_INODE: u64 = 1;

#[derive(Debug)]
struct InodeEntry {
    path: String,
    /// Kernel lookup count
    lookups: u64,
    /// Open directory listings that handed this inode out
    pins: u64,
}

impl InodeEntry {
    fn unused(&self) -> bool {
        self.lookups == 0 && self.pins == 0
    }
}

#[derive(Debug)]
struct Arena {
    next: u64,
    forward: HashMap<u64, InodeEntry>,
    reverse: HashMap<String, u64>,
}

impl Arena {
    fn allocate(&mut self, path: &str) -> u64 {
        let mut ino = self.next;
        while ino <= ROOT_INODE || self.forward.contains_key(&ino) {
            ino = ino.wrapping_add(1);
        }
        self.next = ino.wrapping_add(1);

        self.forward.insert(
            ino,
            InodeEntry {
                path: path.to_string(),
                lookups: 0,
                pins: 0,
            },
        );
        self.reverse.insert(path.to_string(), ino);
        debug!("Registered inode: ino={}, path={}", ino, path);
        ino
    }

    fn get_or_allocate(&mut self, path: &str) -> u64 {
        match self.reverse.get(path) {
            Some(&ino) => ino,
            None => self.allocate(path),
        }
    }

    /// Drop `ino` once nothing references it. The root is never released.
    fn release_if_unused(&mut self, ino: u64) {
        if ino == ROOT_INODE || !self.forward.get(&ino).is_some_and(InodeEntry::unused) {
            return;
        }
        if let Some(entry) = self.forward.remove(&ino) {
            self.reverse.remove(&entry.path);
            debug!("Released inode: ino={}, path={}", ino, entry.path);
        }
    }
}

/// Thread-safe inode <-> path registry
#[derive(Debug)]
pub struct InodeTable {
    arena: RwLock<Arena>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut forward = HashMap::new();
        forward.insert(
            ROOT_INODE,
            InodeEntry {
                path: String::new(),
                lookups: 1,
                pins: 0,
            },
        );
        let mut reverse = HashMap::new();
        reverse.insert(String::new(), ROOT_INODE);

        Self {
            arena: RwLock::new(Arena {
                next: ROOT_INODE + 1,
                forward,
                reverse,
            }),
        }
    }

    pub fn path(&self, ino: u64) -> Option<String> {
        self.arena.read().forward.get(&ino).map(|e| e.path.clone())
    }

    /// Inode for `path` after a successful kernel lookup; bumps the lookup count.
    pub fn lookup(&self, path: &str) -> u64 {
        let mut arena = self.arena.write();
        let ino = arena.get_or_allocate(path);
        if let Some(entry) = arena.forward.get_mut(&ino) {
            entry.lookups += 1;
        }
        ino
    }

    /// Inode for `path` held by an open directory listing. Pair with
    /// [`InodeTable::unpin`] when the listing is released.
    pub fn pin(&self, path: &str) -> u64 {
        let mut arena = self.arena.write();
        let ino = arena.get_or_allocate(path);
        if let Some(entry) = arena.forward.get_mut(&ino) {
            entry.pins += 1;
        }
        ino
    }

    pub fn unpin(&self, ino: u64) {
        let mut arena = self.arena.write();
        if let Some(entry) = arena.forward.get_mut(&ino) {
            entry.pins = entry.pins.saturating_sub(1);
        }
        arena.release_if_unused(ino);
    }

    /// Drop `nlookup` kernel references. The root is never released.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        let mut arena = self.arena.write();
        if let Some(entry) = arena.forward.get_mut(&ino) {
            entry.lookups = entry.lookups.saturating_sub(nlookup);
        }
        arena.release_if_unused(ino);
    }

    pub fn len(&self) -> usize {
        self.arena.read().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Share-relative path of `name` inside `parent`
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Share-relative path of the parent directory; the root is its own parent
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
