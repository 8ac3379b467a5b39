// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire contract
//!
//! Generated protobuf/gRPC code for `fsdriver.v1` plus conversions between the
//! generated messages and domain types. Server and client both convert here,
//! so the two sides cannot drift.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Protocol contract shared by server and client

use crate::domain::file_info::FileInfo;
use crate::domain::fs_error::FsError;
use crate::domain::watch::{WatchEvent, WatchEventKind, WatchSubscription};

// Generated protobuf code
pub mod fsdriver_v1 {
    tonic::include_proto!("fsdriver.v1");
}

pub use fsdriver_v1::file_system_service_client::FileSystemServiceClient;
pub use fsdriver_v1::file_system_service_server::{FileSystemService, FileSystemServiceServer};

impl From<&FsError> for fsdriver_v1::Error {
    fn from(err: &FsError) -> Self {
        Self {
            code: err.code(),
            message: err.message.clone(),
        }
    }
}

impl From<FsError> for fsdriver_v1::Error {
    fn from(err: FsError) -> Self {
        Self {
            code: err.code(),
            message: err.message,
        }
    }
}

impl From<fsdriver_v1::Error> for FsError {
    fn from(err: fsdriver_v1::Error) -> Self {
        FsError::from_wire(err.code, err.message)
    }
}

impl From<FileInfo> for fsdriver_v1::FileInfo {
    fn from(info: FileInfo) -> Self {
        Self {
            name: info.name,
            is_dir: info.is_dir,
            size: i64::try_from(info.size).unwrap_or(i64::MAX),
            mod_time: info.mod_time,
            access_time: info.access_time,
            change_time: info.change_time,
            mode: info.mode,
            uid: info.uid,
            gid: info.gid,
            is_symlink: info.is_symlink,
        }
    }
}

impl From<fsdriver_v1::FileInfo> for FileInfo {
    fn from(info: fsdriver_v1::FileInfo) -> Self {
        Self {
            name: info.name,
            is_dir: info.is_dir,
            is_symlink: info.is_symlink,
            size: u64::try_from(info.size).unwrap_or(0),
            mod_time: info.mod_time,
            access_time: info.access_time,
            change_time: info.change_time,
            mode: info.mode,
            uid: info.uid,
            gid: info.gid,
        }
    }
}

impl From<fsdriver_v1::WatchRequest> for WatchSubscription {
    fn from(req: fsdriver_v1::WatchRequest) -> Self {
        Self::new(req.path, req.recursive)
    }
}

impl From<WatchSubscription> for fsdriver_v1::WatchRequest {
    fn from(sub: WatchSubscription) -> Self {
        Self {
            path: sub.path,
            recursive: sub.recursive,
        }
    }
}

impl From<WatchEventKind> for fsdriver_v1::WatchEventType {
    fn from(kind: WatchEventKind) -> Self {
        match kind {
            WatchEventKind::Create => Self::Create,
            WatchEventKind::Delete => Self::Delete,
            WatchEventKind::Rename => Self::Rename,
            WatchEventKind::Modify => Self::Modify,
            WatchEventKind::Attrib => Self::Attrib,
        }
    }
}

impl From<WatchEvent> for fsdriver_v1::WatchEvent {
    fn from(event: WatchEvent) -> Self {
        let mut out = Self {
            path: event.path,
            r#type: 0,
            old_path: event.old_path,
            timestamp: event.timestamp,
        };
        out.set_type(event.kind.into());
        out
    }
}

impl TryFrom<fsdriver_v1::WatchEvent> for WatchEvent {
    type Error = FsError;

    /// Fails for `UNKNOWN` or out-of-range event types.
    fn try_from(event: fsdriver_v1::WatchEvent) -> Result<Self, Self::Error> {
        use fsdriver_v1::WatchEventType;

        let kind = match WatchEventType::try_from(event.r#type) {
            Ok(WatchEventType::Create) => WatchEventKind::Create,
            Ok(WatchEventType::Delete) => WatchEventKind::Delete,
            Ok(WatchEventType::Rename) => WatchEventKind::Rename,
            Ok(WatchEventType::Modify) => WatchEventKind::Modify,
            Ok(WatchEventType::Attrib) => WatchEventKind::Attrib,
            Ok(WatchEventType::Unknown) | Err(_) => {
                return Err(FsError::invalid_argument(format!(
                    "unknown watch event type {}",
                    event.r#type
                )))
            }
        };

        Ok(Self {
            path: event.path,
            kind,
            old_path: event.old_path,
            timestamp: event.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fs_error::FsErrorKind;

    #[test]
    fn test_error_keeps_errno() {
        let wire: fsdriver_v1::Error = FsError::bad_handle(7).into();
        assert_eq!(wire.code, 22);

        let back: FsError = wire.into();
        assert_eq!(back.kind, FsErrorKind::InvalidArgument);
        assert_eq!(back.message, "bad handle 7");
    }

    #[test]
    fn test_watch_event_type_on_wire() {
        let wire: fsdriver_v1::WatchEvent = WatchEvent::renamed("a", "b").into();
        assert_eq!(wire.r#type(), fsdriver_v1::WatchEventType::Rename);
        assert_eq!(wire.path, "b");
        assert_eq!(wire.old_path, "a");
    }

    #[test]
    fn test_unknown_watch_event_type_rejected() {
        let wire = fsdriver_v1::WatchEvent {
            path: "x".into(),
            r#type: 0,
            old_path: String::new(),
            timestamp: 0,
        };
        assert!(WatchEvent::try_from(wire).is_err());
    }
}
