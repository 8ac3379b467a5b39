// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides mod functionality for the system.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Implements mod

pub mod server;

pub use server::{serve_with_listener, start_grpc_server, FileSystemGrpcService, GrpcServerError};
