// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Change notification vocabulary
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Watch events as produced by the watch engine

/// Kind of change reported to a watching client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Create,
    Delete,
    Rename,
    Modify,
    /// Attribute change; also carries in-band subscription and watcher errors
    Attrib,
}

impl std::fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WatchEventKind::Create => "CREATE",
            WatchEventKind::Delete => "DELETE",
            WatchEventKind::Rename => "RENAME",
            WatchEventKind::Modify => "MODIFY",
            WatchEventKind::Attrib => "ATTRIB",
        };
        f.pad(label)
    }
}

/// A change notification
///
/// `path` is share-relative with forward slashes. `old_path` holds the source
/// path of a rename, or the error text of an `Attrib` error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchEventKind,
    pub old_path: String,
    pub timestamp: i64,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            old_path: String::new(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            old_path: from.into(),
            ..Self::new(WatchEventKind::Rename, to)
        }
    }

    /// A subscription that could not be honoured
    pub fn subscription_error(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            old_path: format!("error: {error}"),
            ..Self::new(WatchEventKind::Attrib, path)
        }
    }

    /// A failure reported by the native event source
    pub fn watcher_error(error: impl std::fmt::Display) -> Self {
        Self {
            old_path: format!("watch-error: {error}"),
            ..Self::new(WatchEventKind::Attrib, "")
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == WatchEventKind::Attrib
            && (self.old_path.starts_with("error: ") || self.old_path.starts_with("watch-error: "))
    }
}

/// A client request to watch `path` (share-relative)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSubscription {
    pub path: String,
    pub recursive: bool,
}

impl WatchSubscription {
    pub fn new(path: impl Into<String>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }
}
