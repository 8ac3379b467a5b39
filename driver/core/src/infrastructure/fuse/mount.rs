// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mounting
//!
//! Mounts a remote share through fuser in a background session. The share
//! stays mounted until the returned [`MountedShare`] is dropped or unmounted.

use super::adapter::RemoteFsAdapter;
use super::bridge::RemoteFsBridge;
use crate::domain::config::MountConfig;
use crate::domain::remote::RemoteFileSystem;
use fuser::{BackgroundSession, MountOption};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::info;

#[derive(Debug, Error)]
pub enum MountError {
    #[error("Failed to mount {mountpoint}: {source}")]
    Mount {
        mountpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// A live mount
pub struct MountedShare {
    mountpoint: PathBuf,
    session: BackgroundSession,
}

impl MountedShare {
    pub fn mountpoint(&self) -> &std::path::Path {
        &self.mountpoint
    }

    /// Unmount and wait for the FUSE session thread to finish
    pub fn unmount(self) {
        info!("Unmounting {:?}", self.mountpoint);
        self.session.join();
    }
}

pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName(format!("fsdriver:{}", config.share)),
        MountOption::Subtype("fsdriver".to_string()),
        MountOption::NoDev,
        MountOption::NoSuid,
    ];
    if config.read_only {
        options.push(MountOption::RO);
    }
    options
}

/// Mount `remote` at `config.mountpoint`.
///
/// Kernel callbacks run their remote calls on `runtime`.
pub fn mount(
    remote: Arc<dyn RemoteFileSystem>,
    config: &MountConfig,
    runtime: Handle,
) -> Result<MountedShare, MountError> {
    let bridge = Arc::new(RemoteFsBridge::new(remote, config.read_only));
    let adapter = RemoteFsAdapter::new(bridge, runtime, config.attr_ttl, config.entry_ttl);
    let options = mount_options(config);

    info!(
        "Mounting share '{}' at {:?} (read_only={})",
        config.share, config.mountpoint, config.read_only
    );
    let session = fuser::spawn_mount2(adapter, &config.mountpoint, &options).map_err(|source| {
        MountError::Mount {
            mountpoint: config.mountpoint.display().to_string(),
            source,
        }
    })?;

    Ok(MountedShare {
        mountpoint: config.mountpoint.clone(),
        session,
    })
}
