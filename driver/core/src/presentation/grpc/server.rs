// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! gRPC Server Implementation for the remote filesystem
//! Exposes Stat, ReadDir, Open, Read, Close and the bidirectional Watch stream.
//!
//! Filesystem failures are returned inside the response payload; a `Status`
//! error only means the call itself could not be served.

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use crate::application::fs_engine::FileSystemEngine;
use crate::application::watch_engine::WatchEngine;
use crate::domain::watch::WatchSubscription;
use crate::infrastructure::proto::fsdriver_v1::*;
use crate::infrastructure::proto::{FileSystemService, FileSystemServiceServer};

/// Events buffered per watch stream when not configured otherwise
pub const DEFAULT_WATCH_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum GrpcServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Implementation of the FileSystemService gRPC service
pub struct FileSystemGrpcService {
    engine: Arc<FileSystemEngine>,
    watch_engine: WatchEngine,
    shutdown: CancellationToken,
    watch_channel_capacity: usize,
}

impl FileSystemGrpcService {
    /// Watch sessions are cancelled when `shutdown` fires.
    pub fn new(engine: Arc<FileSystemEngine>, watch_engine: WatchEngine, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            watch_engine,
            shutdown,
            watch_channel_capacity: DEFAULT_WATCH_CHANNEL_CAPACITY,
        }
    }

    pub fn with_watch_channel_capacity(mut self, capacity: usize) -> Self {
        self.watch_channel_capacity = capacity.max(1);
        self
    }

    /// Create a gRPC server instance
    pub fn into_server(self) -> FileSystemServiceServer<Self> {
        FileSystemServiceServer::new(self)
    }
}

fn client_addr<T>(request: &Request<T>) -> String {
    request
        .remote_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[tonic::async_trait]
impl FileSystemService for FileSystemGrpcService {
    type WatchStream = Pin<Box<dyn Stream<Item = Result<WatchEvent, Status>> + Send + 'static>>;

    async fn stat(&self, request: Request<StatRequest>) -> Result<Response<StatResponse>, Status> {
        let client_addr = client_addr(&request);
        let req = request.into_inner();
        debug!(client_addr = %client_addr, path = %req.path, "Stat");

        let result = match self.engine.stat(&req.path).await {
            Ok(info) => stat_response::Result::Info(info.into()),
            Err(e) => {
                debug!(client_addr = %client_addr, path = %req.path, error = %e, "Stat failed");
                stat_response::Result::Error(e.into())
            }
        };

        Ok(Response::new(StatResponse { result: Some(result) }))
    }

    async fn read_dir(&self, request: Request<ReadDirRequest>) -> Result<Response<ReadDirResponse>, Status> {
        let client_addr = client_addr(&request);
        let req = request.into_inner();
        debug!(
            client_addr = %client_addr,
            path = %req.path,
            offset = req.offset,
            limit = req.limit,
            "ReadDir"
        );

        let response = match self.engine.read_dir(&req.path, req.offset, req.limit).await {
            Ok(page) => ReadDirResponse {
                entries: page.entries.into_iter().map(Into::into).collect(),
                has_more: page.has_more,
                error: None,
            },
            Err(e) => {
                debug!(client_addr = %client_addr, path = %req.path, error = %e, "ReadDir failed");
                ReadDirResponse {
                    entries: Vec::new(),
                    has_more: false,
                    error: Some(e.into()),
                }
            }
        };

        Ok(Response::new(response))
    }

    async fn open(&self, request: Request<OpenRequest>) -> Result<Response<OpenResponse>, Status> {
        let client_addr = client_addr(&request);
        let req = request.into_inner();
        debug!(client_addr = %client_addr, path = %req.path, flags = req.flags, "Open");

        let result = match self.engine.open(&req.path, req.flags).await {
            Ok(handle) => open_response::Result::Handle(handle),
            Err(e) => {
                debug!(client_addr = %client_addr, path = %req.path, error = %e, "Open failed");
                open_response::Result::Error(e.into())
            }
        };

        Ok(Response::new(OpenResponse { result: Some(result) }))
    }

    async fn read(&self, request: Request<ReadRequest>) -> Result<Response<ReadResponse>, Status> {
        let client_addr = client_addr(&request);
        let req = request.into_inner();
        debug!(
            client_addr = %client_addr,
            handle = req.handle,
            offset = req.offset,
            size = req.size,
            "Read"
        );

        let result = match self.engine.read(req.handle, req.offset, req.size).await {
            Ok(data) => read_response::Result::Data(data),
            Err(e) => {
                debug!(client_addr = %client_addr, handle = req.handle, error = %e, "Read failed");
                read_response::Result::Error(e.into())
            }
        };

        Ok(Response::new(ReadResponse { result: Some(result) }))
    }

    async fn close(&self, request: Request<CloseRequest>) -> Result<Response<CloseResponse>, Status> {
        let client_addr = client_addr(&request);
        let req = request.into_inner();
        debug!(client_addr = %client_addr, handle = req.handle, "Close");

        let error = match self.engine.close(req.handle).await {
            Ok(()) => None,
            Err(e) => {
                warn!(client_addr = %client_addr, handle = req.handle, error = %e, "Close failed");
                Some(e.into())
            }
        };

        Ok(Response::new(CloseResponse { error }))
    }

    /// One long-lived session per call; subscriptions may arrive at any time.
    async fn watch(
        &self,
        request: Request<Streaming<WatchRequest>>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let client_addr = client_addr(&request);

        let session = self.watch_engine.open_session().map_err(|e| {
            warn!(client_addr = %client_addr, error = %e, "Failed to start watch session");
            Status::internal(format!("failed to start watcher: {}", e))
        })?;

        let requests = request.into_inner().map(|r| r.map(WatchSubscription::from));
        let (tx, rx) = mpsc::channel(self.watch_channel_capacity);
        let cancel = self.shutdown.child_token();

        info!(client_addr = %client_addr, "Watch session started");
        tokio::spawn(async move {
            match session.run(requests, tx, cancel).await {
                Ok(()) => info!(client_addr = %client_addr, "Watch session closed"),
                Err(e) => warn!(client_addr = %client_addr, error = %e, "Watch session failed"),
            }
        });

        let stream = ReceiverStream::new(rx).map(|event| Ok(WatchEvent::from(event)));
        Ok(Response::new(Box::pin(stream) as Self::WatchStream))
    }
}

/// Serve on an already-bound listener until `shutdown` fires.
pub async fn serve_with_listener(
    listener: TcpListener,
    service: FileSystemGrpcService,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), GrpcServerError> {
    let incoming = TcpListenerStream::new(listener);

    tonic::transport::Server::builder()
        .timeout(request_timeout)
        .add_service(service.into_server())
        .serve_with_incoming_shutdown(incoming, async move { shutdown.cancelled().await })
        .await?;

    info!("gRPC server stopped");
    Ok(())
}

/// Bind `addr` and serve until `shutdown` fires.
pub async fn start_grpc_server(
    addr: SocketAddr,
    service: FileSystemGrpcService,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), GrpcServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GrpcServerError::Bind { addr, source })?;

    info!("Starting fsdriver gRPC server on {}", addr);
    serve_with_listener(listener, service, request_timeout, shutdown).await
}
