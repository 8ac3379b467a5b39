// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote filesystem seam
//!
//! The operations the FUSE translation layer needs from a remote share. The
//! gRPC client in `fsdriver-sdk` implements this; tests use in-memory mocks.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Decouples the kernel-facing layer from the transport

use crate::domain::file_info::FileInfo;
use crate::domain::fs_error::FsError;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a remote call
///
/// `Fs` is an in-band error returned by the server for the requested
/// operation. `Transport` covers everything else: connection loss, timeouts,
/// cancelled calls and malformed responses.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote error: {0}")]
    Fs(#[from] FsError),

    #[error("transport error: {0}")]
    Transport(String),
}

/// One page of a directory listing
#[derive(Debug, Clone, Default)]
pub struct DirectoryPage {
    pub entries: Vec<FileInfo>,
    pub has_more: bool,
}

/// Read-only remote filesystem operations
///
/// Paths are share-relative with forward slashes; `""` is the share root.
#[async_trait]
pub trait RemoteFileSystem: Send + Sync {
    async fn stat(&self, path: &str) -> Result<FileInfo, RemoteError>;

    /// `limit <= 0` returns everything from `offset` on.
    async fn read_dir(&self, path: &str, offset: i32, limit: i32) -> Result<DirectoryPage, RemoteError>;

    async fn open(&self, path: &str, flags: i32) -> Result<u64, RemoteError>;

    /// May return fewer than `size` bytes at end of file.
    async fn read(&self, handle: u64, offset: i64, size: i32) -> Result<Vec<u8>, RemoteError>;

    async fn close(&self, handle: u64) -> Result<(), RemoteError>;
}
