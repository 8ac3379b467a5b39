// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fsdriver core
//!
//! Server engines, wire contract and client-side FUSE translation layer for
//! exposing one directory tree over gRPC and mounting it remotely.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root; re-exports the domain vocabulary

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
