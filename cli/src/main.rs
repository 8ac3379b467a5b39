// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # fsdriver CLI
//!
//! ## Commands
//!
//! - `fsdriver serve` - export a directory over gRPC
//! - `fsdriver mount` - mount a remote share through FUSE
//! - `fsdriver probe` - connectivity check and directory listing
//! - `fsdriver watch` - stream change events for a remote path
//!
//! Exit status is 0 on clean shutdown, 2 for configuration errors and 1 for
//! any other failure.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use fsdriver::commands::exit_code;
use fsdriver::{init_logging, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}
