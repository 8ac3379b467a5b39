// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `fsdriver watch`

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use colored::Colorize;
use futures::StreamExt;
use std::time::Duration;
use tracing::warn;

use fsdriver_core::domain::config::DEFAULT_ADDR;
use fsdriver_core::domain::watch::{WatchEvent, WatchEventKind, WatchSubscription};
use fsdriver_sdk::FsDriverClient;

use crate::signal::shutdown_signal;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Server address, host:port or URI
    #[arg(long, env = "FSDRIVER_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Share-relative directory to watch
    #[arg(long)]
    pub path: String,

    /// Include subdirectories, present and future
    #[arg(long)]
    pub recursive: bool,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let client = FsDriverClient::connect(&args.addr, timeout, timeout)
        .await
        .with_context(|| format!("Failed to connect to {}", args.addr))?;

    let subscription = WatchSubscription::new(args.path.clone(), args.recursive);
    let mut events = client
        .watch(futures::stream::iter([subscription]))
        .await
        .context("Failed to open watch stream")?;
    println!(
        "Watching '{}'{} on {} (Ctrl+C to stop)",
        args.path,
        if args.recursive { " recursively" } else { "" },
        args.addr
    );

    let signal = shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            _ = &mut signal => break,
            next = events.next() => match next {
                Some(Ok(event)) if event.is_error() => {
                    println!("{}", format_event(&event).red());
                }
                Some(Ok(event)) => println!("{}", format_event(&event)),
                Some(Err(e)) => return Err(e).context("Watch stream failed"),
                None => {
                    warn!("Server closed the watch stream");
                    break;
                }
            },
        }
    }
    Ok(())
}

pub fn format_event(event: &WatchEvent) -> String {
    let when = DateTime::from_timestamp(event.timestamp, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    if event.kind == WatchEventKind::Rename && !event.old_path.is_empty() {
        format!("{} {:<6} {} -> {}", when, event.kind, event.old_path, event.path)
    } else if event.is_error() {
        format!("{} {:<6} {} ({})", when, event.kind, event.path, event.old_path)
    } else {
        format!("{} {:<6} {}", when, event.kind, event.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_event() {
        let mut event = WatchEvent::new(WatchEventKind::Create, "docs/a.txt");
        event.timestamp = 3_661;
        assert_eq!(format_event(&event), "01:01:01 CREATE docs/a.txt");

        let mut renamed = WatchEvent::renamed("old.txt", "new.txt");
        renamed.timestamp = 0;
        assert_eq!(format_event(&renamed), "00:00:00 RENAME old.txt -> new.txt");

        let mut failed = WatchEvent::subscription_error("../x", "path escapes share root");
        failed.timestamp = 0;
        assert_eq!(
            format_event(&failed),
            "00:00:00 ATTRIB ../x (error: path escapes share root)"
        );
    }
}
