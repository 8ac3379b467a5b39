// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types, error taxonomy and the security boundary shared by the
//! server engines and the client translation layer.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types with no transport or runtime dependencies

pub mod config;
pub mod file_info;
pub mod fs_error;
pub mod path_confinement;
pub mod remote;
pub mod watch;

pub use file_info::FileInfo;
pub use fs_error::{FsError, FsErrorKind, FsResult};
pub use path_confinement::{ConfinementError, PathConfinement};
pub use remote::{DirectoryPage, RemoteError, RemoteFileSystem};
pub use watch::{WatchEvent, WatchEventKind, WatchSubscription};
