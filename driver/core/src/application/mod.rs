// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Server engines driven by the gRPC presentation layer.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for application

pub mod fs_engine;
pub mod watch_engine;

pub use fs_engine::FileSystemEngine;
pub use watch_engine::{WatchEngine, WatchError, WatchSession};
