// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fsdriver Rust SDK
//!
//! Typed client for an fsdriver server. In-band filesystem errors come back as
//! [`ClientError::Remote`]; everything else is a transport-level failure.

pub mod client;
pub mod types;

pub use client::FsDriverClient;
pub use types::*;
