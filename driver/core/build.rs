// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Build Script for fsdriver-core
//!
//! Compiles `../../proto/fsdriver.proto` into the gRPC server and client stubs
//! used by `src/infrastructure/proto.rs`. The generated code is placed in
//! `OUT_DIR` and included via `tonic::include_proto!`.
//!
//! # Dependencies
//!
//! - **protoc**: Protocol buffer compiler (vendored via `protoc-bin-vendored`)
//! - **tonic-prost-build**: Code generator for Rust gRPC stubs
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Generates the wire contract shared by server and client

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point PROTOC at the vendored binary so builds do not need a system protoc
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().expect("vendored protoc binary"));

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/fsdriver.proto"], &["../../proto"])?;

    println!("cargo:rerun-if-changed=../../proto/fsdriver.proto");

    Ok(())
}
