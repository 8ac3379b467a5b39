// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fsdriver gRPC client
//!
//! Thin proxy over the `FileSystemService` stub. Every unary call carries the
//! configured deadline; filesystem errors returned in the response payload are
//! surfaced as [`ClientError::Remote`] with their errno intact.

use crate::types::{ClientError, WatchEvents};
use async_trait::async_trait;
use fsdriver_core::domain::file_info::FileInfo;
use fsdriver_core::domain::fs_error::FsError;
use fsdriver_core::domain::remote::{DirectoryPage, RemoteError, RemoteFileSystem};
use fsdriver_core::domain::watch::{WatchEvent, WatchSubscription};
use fsdriver_core::infrastructure::proto::fsdriver_v1::{
    self, open_response, read_response, stat_response,
};
use fsdriver_core::infrastructure::proto::FileSystemServiceClient;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

/// Client for a remote fsdriver share
#[derive(Clone)]
pub struct FsDriverClient {
    client: FileSystemServiceClient<Channel>,
    call_timeout: Duration,
}

fn endpoint_uri(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

fn missing(what: &str) -> ClientError {
    ClientError::Protocol(format!("{} carried neither a result nor an error", what))
}

impl FsDriverClient {
    /// Connect to `addr` (`host:port` or a full URI)
    pub async fn connect(
        addr: &str,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let endpoint = Endpoint::from_shared(endpoint_uri(addr))
            .map_err(|e| ClientError::InvalidAddress {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(connect_timeout);

        let channel = tokio::time::timeout(connect_timeout, endpoint.connect())
            .await
            .map_err(|_| ClientError::Timeout(connect_timeout))?
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        info!("Connected to fsdriver server at {}", addr);
        Ok(Self::from_channel(channel, call_timeout))
    }

    /// Wrap an already established channel
    pub fn from_channel(channel: Channel, call_timeout: Duration) -> Self {
        Self {
            client: FileSystemServiceClient::new(channel),
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(ClientError::Transport(status)),
            Err(_) => Err(ClientError::Timeout(self.call_timeout)),
        }
    }

    pub async fn stat(&self, path: &str) -> Result<FileInfo, ClientError> {
        let mut client = self.client.clone();
        let response = self
            .call(client.stat(fsdriver_v1::StatRequest {
                path: path.to_string(),
            }))
            .await?;

        match response.result {
            Some(stat_response::Result::Info(info)) => Ok(info.into()),
            Some(stat_response::Result::Error(err)) => Err(FsError::from(err).into()),
            None => Err(missing("StatResponse")),
        }
    }

    /// One page of a directory listing. `limit <= 0` returns everything from
    /// `offset` onwards.
    pub async fn read_dir(
        &self,
        path: &str,
        offset: i32,
        limit: i32,
    ) -> Result<DirectoryPage, ClientError> {
        let mut client = self.client.clone();
        let response = self
            .call(client.read_dir(fsdriver_v1::ReadDirRequest {
                path: path.to_string(),
                offset,
                limit,
            }))
            .await?;

        if let Some(err) = response.error {
            return Err(FsError::from(err).into());
        }
        Ok(DirectoryPage {
            entries: response.entries.into_iter().map(FileInfo::from).collect(),
            has_more: response.has_more,
        })
    }

    /// Full listing, following `has_more` across pages
    pub async fn read_dir_all(&self, path: &str, page_size: i32) -> Result<Vec<FileInfo>, ClientError> {
        let mut entries = Vec::new();
        loop {
            let offset = i32::try_from(entries.len())
                .map_err(|_| ClientError::Protocol("directory listing too large".into()))?;
            let page = self.read_dir(path, offset, page_size).await?;
            let got = page.entries.len();
            entries.extend(page.entries);
            if !page.has_more || got == 0 {
                return Ok(entries);
            }
        }
    }

    pub async fn open(&self, path: &str, flags: i32) -> Result<u64, ClientError> {
        let mut client = self.client.clone();
        let response = self
            .call(client.open(fsdriver_v1::OpenRequest {
                path: path.to_string(),
                flags,
            }))
            .await?;

        match response.result {
            Some(open_response::Result::Handle(handle)) => {
                debug!("Opened remote handle {} for {}", handle, path);
                Ok(handle)
            }
            Some(open_response::Result::Error(err)) => Err(FsError::from(err).into()),
            None => Err(missing("OpenResponse")),
        }
    }

    pub async fn read(&self, handle: u64, offset: i64, size: i32) -> Result<Vec<u8>, ClientError> {
        let mut client = self.client.clone();
        let response = self
            .call(client.read(fsdriver_v1::ReadRequest {
                handle,
                offset,
                size,
            }))
            .await?;

        match response.result {
            Some(read_response::Result::Data(data)) => Ok(data),
            Some(read_response::Result::Error(err)) => Err(FsError::from(err).into()),
            // An empty payload is indistinguishable from no payload on the wire
            None => Ok(Vec::new()),
        }
    }

    pub async fn close(&self, handle: u64) -> Result<(), ClientError> {
        let mut client = self.client.clone();
        let response = self
            .call(client.close(fsdriver_v1::CloseRequest { handle }))
            .await?;

        match response.error {
            Some(err) => Err(FsError::from(err).into()),
            None => {
                debug!("Closed remote handle {}", handle);
                Ok(())
            }
        }
    }

    /// Stat the share root and require a directory
    pub async fn test_connection(&self) -> Result<FileInfo, ClientError> {
        let info = self.stat("").await?;
        if !info.is_dir {
            return Err(ClientError::Protocol("share root is not a directory".into()));
        }
        Ok(info)
    }

    /// Open a watch session. Subscriptions are sent as `subscriptions` yields
    /// them; the returned stream ends when the server closes the session.
    pub async fn watch<S>(&self, subscriptions: S) -> Result<WatchEvents, ClientError>
    where
        S: Stream<Item = WatchSubscription> + Send + 'static,
    {
        let mut client = self.client.clone();
        let requests = subscriptions.map(fsdriver_v1::WatchRequest::from);
        let stream = self.call(client.watch(requests)).await?;

        let events = stream.map(|item| match item {
            Ok(event) => WatchEvent::try_from(event).map_err(|e| ClientError::Protocol(e.to_string())),
            Err(status) => Err(ClientError::Transport(status)),
        });
        Ok(Box::pin(events))
    }
}

#[async_trait]
impl RemoteFileSystem for FsDriverClient {
    async fn stat(&self, path: &str) -> Result<FileInfo, RemoteError> {
        Ok(FsDriverClient::stat(self, path).await?)
    }

    async fn read_dir(&self, path: &str, offset: i32, limit: i32) -> Result<DirectoryPage, RemoteError> {
        Ok(FsDriverClient::read_dir(self, path, offset, limit).await?)
    }

    async fn open(&self, path: &str, flags: i32) -> Result<u64, RemoteError> {
        Ok(FsDriverClient::open(self, path, flags).await?)
    }

    async fn read(&self, handle: u64, offset: i64, size: i32) -> Result<Vec<u8>, RemoteError> {
        Ok(FsDriverClient::read(self, handle, offset, size).await?)
    }

    async fn close(&self, handle: u64) -> Result<(), RemoteError> {
        Ok(FsDriverClient::close(self, handle).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uri() {
        assert_eq!(endpoint_uri("127.0.0.1:50051"), "http://127.0.0.1:50051");
        assert_eq!(endpoint_uri("https://fs.example:443"), "https://fs.example:443");
    }

    #[tokio::test]
    async fn test_connect_rejects_garbage_address() {
        let err = FsDriverClient::connect("not a uri\n", Duration::from_secs(1), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = FsDriverClient::connect(
            &format!("127.0.0.1:{}", port),
            Duration::from_secs(2),
            Duration::from_secs(1),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ClientError::Connect { .. } | ClientError::Timeout(_)));
    }
}
