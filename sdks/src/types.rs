// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use fsdriver_core::domain::fs_error::FsError;
use fsdriver_core::domain::remote::RemoteError;
use fsdriver_core::domain::watch::WatchEvent;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

pub use fsdriver_core::domain::file_info::FileInfo;
pub use fsdriver_core::domain::remote::DirectoryPage;
pub use fsdriver_core::domain::watch::{WatchEventKind, WatchSubscription};

/// Event stream returned by [`crate::FsDriverClient::watch`]
pub type WatchEvents = Pin<Box<dyn Stream<Item = Result<WatchEvent, ClientError>> + Send>>;

/// Client-side errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The server handled the call and reported a filesystem error
    #[error(transparent)]
    Remote(#[from] FsError),

    #[error("rpc failed: {0}")]
    Transport(#[from] tonic::Status),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Response did not match the protocol (e.g. an empty result union)
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// True for in-band filesystem errors
    pub fn is_remote(&self) -> bool {
        matches!(self, ClientError::Remote(_))
    }
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Remote(e) => RemoteError::Fs(e),
            other => RemoteError::Transport(other.to_string()),
        }
    }
}
