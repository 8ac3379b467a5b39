// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fsdriver CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Argument parsing, logging setup, signal handling and the
//!   `serve` / `mount` / `probe` / `watch` command implementations

pub mod commands;
pub mod signal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{MountArgs, ProbeArgs, ServeArgs, WatchArgs};

/// fsdriver - share a directory over gRPC and mount it remotely
#[derive(Debug, Parser)]
#[command(name = "fsdriver")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML configuration file for `serve` or `mount`
    #[arg(
        short,
        long,
        global = true,
        env = "FSDRIVER_CONFIG_PATH",
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FSDRIVER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export a local directory over gRPC
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Mount a remote share through FUSE
    #[command(name = "mount")]
    Mount(MountArgs),

    /// Check connectivity and list a remote directory
    #[command(name = "probe")]
    Probe(ProbeArgs),

    /// Print change events for a remote path
    #[command(name = "watch")]
    Watch(WatchArgs),
}

/// Initialize tracing subscriber for logging
pub fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

/// Run the parsed command to completion
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, cli.config).await,
        Commands::Mount(args) => commands::mount::execute(args, cli.config).await,
        Commands::Probe(args) => commands::probe::execute(args).await,
        Commands::Watch(args) => commands::watch::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "fsdriver",
            "--log-level",
            "debug",
            "serve",
            "--share",
            "/srv/export",
            "--addr",
            "0.0.0.0:6000",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.share, Some(PathBuf::from("/srv/export")));
                assert_eq!(args.addr.as_deref(), Some("0.0.0.0:6000"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_mount_with_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fsdriver",
            "mount",
            "--share",
            "data",
            "--mountpoint",
            "/mnt/data",
            "--config",
            "mount.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("mount.yaml")));
        match cli.command {
            Commands::Mount(args) => {
                assert_eq!(args.share.as_deref(), Some("data"));
                assert_eq!(args.mountpoint, Some(PathBuf::from("/mnt/data")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_watch_requires_path() {
        assert!(Cli::try_parse_from(["fsdriver", "watch"]).is_err());
        let cli = Cli::try_parse_from(["fsdriver", "watch", "--path", "docs", "--recursive"]).unwrap();
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.path, "docs");
                assert!(args.recursive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["fsdriver"]).is_err());
    }
}
