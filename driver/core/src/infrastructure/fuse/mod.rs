// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! FUSE Translation Layer (client)
//!
//! Maps kernel filesystem callbacks onto a [`RemoteFileSystem`]:
//! - **inode_table**: path-keyed inode arena with lookup counting
//! - **bridge**: async callback semantics and errno mapping
//! - **adapter**: `fuser::Filesystem` shell over the bridge
//! - **mount**: background mount lifecycle
//!
//! Attributes and entries are cached by the kernel for the configured TTLs
//! (one second by default); staleness within that window is accepted.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Client-side kernel filesystem integration
//!
//! [`RemoteFileSystem`]: crate::domain::remote::RemoteFileSystem

pub mod adapter;
pub mod bridge;
pub mod inode_table;
pub mod mount;

pub use bridge::{DirEntry, EntryKind, RemoteFsBridge};
pub use inode_table::{InodeTable, ROOT_INODE};
pub use mount::{mount, MountError, MountedShare};
