// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presentation
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Network-facing surface of the server

pub mod grpc;
