// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fsdriver probe`
//!
//! Connectivity check: stat a path on the server and list the first entries
//! when it is a directory.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use colored::Colorize;
use std::time::Duration;

use fsdriver_core::domain::config::DEFAULT_ADDR;
use fsdriver_core::domain::file_info::FileInfo;
use fsdriver_sdk::FsDriverClient;

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Server address, host:port or URI
    #[arg(long, env = "FSDRIVER_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Share-relative path to inspect
    #[arg(long, default_value = "")]
    pub path: String,

    /// Maximum entries to list
    #[arg(long, default_value_t = 20)]
    pub limit: i32,

    /// Connect and per-call timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

pub async fn execute(args: ProbeArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let client = FsDriverClient::connect(&args.addr, timeout, timeout)
        .await
        .with_context(|| format!("Failed to connect to {}", args.addr))?;
    client
        .test_connection()
        .await
        .context("Share root check failed")?;
    println!("{}", format!("✓ Connected to {}", args.addr).green());

    let info = client
        .stat(&args.path)
        .await
        .with_context(|| format!("Failed to stat '{}'", args.path))?;
    println!("{}", format_entry(&info).bold());

    if info.is_dir {
        let page = client
            .read_dir(&args.path, 0, args.limit)
            .await
            .with_context(|| format!("Failed to list '{}'", args.path))?;
        for entry in &page.entries {
            println!("  {}", format_entry(entry));
        }
        if page.has_more {
            println!("  {}", "...".dimmed());
        }
    }
    Ok(())
}

/// `ls -l`-style line for one entry
pub fn format_entry(info: &FileInfo) -> String {
    let kind = if info.is_dir {
        'd'
    } else if info.is_symlink {
        'l'
    } else {
        '-'
    };
    let modified = DateTime::from_timestamp(info.mod_time, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let name = if info.name.is_empty() { "." } else { info.name.as_str() };
    format!("{}{:04o} {:>10} {} {}", kind, info.mode & 0o7777, info.size, modified, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry() {
        let info = FileInfo {
            name: "a.txt".into(),
            size: 5,
            mod_time: 0,
            mode: 0o644,
            ..Default::default()
        };
        assert_eq!(format_entry(&info), "-0644          5 1970-01-01 00:00 a.txt");

        let root = FileInfo {
            is_dir: true,
            mode: 0o755,
            ..Default::default()
        };
        assert!(format_entry(&root).starts_with("d0755"));
        assert!(format_entry(&root).ends_with(" ."));
    }
}
