// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fsdriver mount`
//!
//! Connects to the server, checks the share root, mounts it through FUSE and
//! keeps it mounted until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use fsdriver_core::domain::config::{ConfigError, MountConfig};
use fsdriver_sdk::FsDriverClient;

#[derive(Debug, Args)]
pub struct MountArgs {
    /// Share name, shown as the filesystem source in the mount table
    #[arg(long, env = "FSDRIVER_SHARE_NAME")]
    pub share: Option<String>,

    /// Existing directory to mount on
    #[arg(long, env = "FSDRIVER_MOUNTPOINT", value_name = "DIR")]
    pub mountpoint: Option<PathBuf>,

    /// Server address, host:port or URI (default: 127.0.0.1:50051)
    #[arg(long, env = "FSDRIVER_ADDR", value_name = "ADDR")]
    pub addr: Option<String>,

    /// Mount read-only (the default)
    #[arg(long, conflicts_with = "rw")]
    pub ro: bool,

    /// Let write opens through to the server
    #[arg(long)]
    pub rw: bool,
}

pub fn resolve_config(args: MountArgs, config_path: Option<&Path>) -> Result<MountConfig, ConfigError> {
    let mut config = MountConfig::load(config_path)?;
    if let Some(share) = args.share {
        config.share = share;
    }
    if let Some(mountpoint) = args.mountpoint {
        config.mountpoint = mountpoint;
    }
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if args.ro {
        config.read_only = true;
    } else if args.rw {
        config.read_only = false;
    }
    config.validate()?;
    Ok(config)
}

pub async fn execute(args: MountArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(args, config_path.as_deref())?;

    let client = FsDriverClient::connect(&config.addr, config.connect_timeout, config.call_timeout)
        .await
        .with_context(|| format!("Failed to connect to {}", config.addr))?;
    client
        .test_connection()
        .await
        .context("Share root check failed")?;
    info!("Share '{}' reachable at {}", config.share, config.addr);

    mount_until_signal(client, &config).await
}

#[cfg(unix)]
async fn mount_until_signal(client: FsDriverClient, config: &MountConfig) -> Result<()> {
    use fsdriver_core::domain::remote::RemoteFileSystem;
    use fsdriver_core::infrastructure::fuse;
    use std::sync::Arc;

    let remote: Arc<dyn RemoteFileSystem> = Arc::new(client);
    let mounted = fuse::mount(remote, config, tokio::runtime::Handle::current())?;
    println!(
        "{}",
        format!(
            "✓ Mounted '{}' at {}",
            config.share,
            mounted.mountpoint().display()
        )
        .green()
    );

    crate::signal::shutdown_signal().await;

    info!("Unmounting {}", mounted.mountpoint().display());
    tokio::task::spawn_blocking(move || mounted.unmount())
        .await
        .context("Unmount task failed")?;
    println!("{}", "✓ Unmounted".green());
    Ok(())
}

#[cfg(not(unix))]
async fn mount_until_signal(_client: FsDriverClient, _config: &MountConfig) -> Result<()> {
    anyhow::bail!("FUSE mounts are only supported on unix platforms")
}
