// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fsdriver serve`

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fsdriver_core::application::{FileSystemEngine, WatchEngine};
use fsdriver_core::domain::config::{ConfigError, ServerConfig};
use fsdriver_core::domain::path_confinement::PathConfinement;
use fsdriver_core::presentation::grpc::{start_grpc_server, FileSystemGrpcService};

use crate::signal::shutdown_signal;

/// Entries logged from the share root at startup
const PREVIEW_ENTRIES: i32 = 10;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Directory to export
    #[arg(long, env = "FSDRIVER_SHARE", value_name = "DIR")]
    pub share: Option<PathBuf>,

    /// Listen address (default: 127.0.0.1:50051)
    #[arg(long, env = "FSDRIVER_ADDR", value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Maximum bytes returned by one read
    #[arg(long, value_name = "BYTES")]
    pub max_read_bytes: Option<usize>,
}

/// Layer flags over the file and environment configuration
pub fn resolve_config(args: ServeArgs, config_path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::load(config_path)?;
    if let Some(share) = args.share {
        config.share = share;
    }
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(max_read_bytes) = args.max_read_bytes {
        config.max_read_bytes = max_read_bytes;
    }
    config.validate()?;
    Ok(config)
}

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(args, config_path.as_deref())?;
    let addr = config.socket_addr()?;

    let confinement = PathConfinement::new(&config.share)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?
        .with_max_length(config.max_path_len);
    info!("Serving share root {}", confinement.root().display());

    let engine = Arc::new(
        FileSystemEngine::new(confinement.clone()).with_max_read_bytes(config.max_read_bytes),
    );
    log_share_preview(&engine).await;

    let shutdown = CancellationToken::new();
    let service = FileSystemGrpcService::new(engine, WatchEngine::new(confinement), shutdown.clone())
        .with_watch_channel_capacity(config.watch_channel_capacity);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down fsdriver server");
        signal_token.cancel();
    });

    start_grpc_server(addr, service, config.request_timeout, shutdown)
        .await
        .context("gRPC server failed")?;

    info!("fsdriver server stopped");
    Ok(())
}

async fn log_share_preview(engine: &FileSystemEngine) {
    match engine.read_dir("", 0, PREVIEW_ENTRIES).await {
        Ok(page) => {
            info!("Share contains {}{} entries", page.entries.len(), if page.has_more { "+" } else { "" });
            for entry in &page.entries {
                info!(
                    "  {} {}",
                    if entry.is_dir { "d" } else { "-" },
                    entry.name
                );
            }
        }
        Err(e) => warn!("Could not list share root: {}", e),
    }
}
