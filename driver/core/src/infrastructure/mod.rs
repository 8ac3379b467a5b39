// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Adapters to the host OS (open-file table, native change events, FUSE) and
//! the generated wire types.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for infrastructure

pub mod handle_table;
pub mod proto;
pub mod watcher;

#[cfg(unix)]
pub mod fuse;
