// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filesystem Error Taxonomy
//!
//! Errors that travel inside RPC payloads. Codes match the POSIX errno values
//! so the client can hand them straight to the kernel.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Shared error vocabulary for server engines and client

use crate::domain::path_confinement::ConfinementError;
use std::fmt;
use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

/// Error category with its errno value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    /// ENOENT
    NotFound,
    /// EACCES
    PermissionDenied,
    /// EINVAL: negative offsets/sizes, bad handles, malformed paths
    InvalidArgument,
    /// EIO: any other local OS failure
    IoFailure,
}

impl FsErrorKind {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const EACCES: i32 = 13;
    pub const EINVAL: i32 = 22;

    pub fn code(self) -> i32 {
        match self {
            FsErrorKind::NotFound => Self::ENOENT,
            FsErrorKind::PermissionDenied => Self::EACCES,
            FsErrorKind::InvalidArgument => Self::EINVAL,
            FsErrorKind::IoFailure => Self::EIO,
        }
    }

    /// Unknown codes fold into `IoFailure`.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::ENOENT => FsErrorKind::NotFound,
            Self::EACCES => FsErrorKind::PermissionDenied,
            Self::EINVAL => FsErrorKind::InvalidArgument,
            _ => FsErrorKind::IoFailure,
        }
    }
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsErrorKind::NotFound => "not found",
            FsErrorKind::PermissionDenied => "permission denied",
            FsErrorKind::InvalidArgument => "invalid argument",
            FsErrorKind::IoFailure => "i/o failure",
        };
        f.write_str(name)
    }
}

/// An in-band filesystem error: `{code, message}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FsError {
    pub kind: FsErrorKind,
    pub message: String,
}

impl FsError {
    pub fn new(kind: FsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(FsErrorKind::PermissionDenied, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FsErrorKind::InvalidArgument, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FsErrorKind::IoFailure, message)
    }

    /// Lookup miss in the handle table: never opened or already closed.
    pub fn bad_handle(handle: u64) -> Self {
        Self::invalid_argument(format!("bad handle {handle}"))
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Rebuild from a wire `{code, message}` pair.
    ///
    /// The original code is preserved in the message when it is not one of
    /// the four known values.
    pub fn from_wire(code: i32, message: String) -> Self {
        let kind = FsErrorKind::from_code(code);
        if kind.code() == code {
            Self::new(kind, message)
        } else {
            Self::new(kind, format!("errno {code}: {message}"))
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => FsErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidInput => FsErrorKind::InvalidArgument,
            _ => FsErrorKind::IoFailure,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ConfinementError> for FsError {
    fn from(err: ConfinementError) -> Self {
        match err {
            // Do not echo resolved paths back to the client
            ConfinementError::Escape(_) => Self::permission_denied("path escapes share root"),
            ConfinementError::InvalidPath(reason) => Self::invalid_argument(reason),
            ConfinementError::PathTooLong { len, max } => {
                Self::invalid_argument(format!("path too long: {len} bytes (max {max})"))
            }
            ConfinementError::InvalidRoot { .. } => Self::io("share root unavailable"),
        }
    }
}
