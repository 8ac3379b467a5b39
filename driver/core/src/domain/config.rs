// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Configuration
//!
//! Server and mount settings. Loaded from an optional YAML file, then
//! environment overrides, then command-line flags (applied by the CLI).
//!
//! ```yaml
//! # serve.yaml
//! share: /srv/export
//! addr: 0.0.0.0:50051
//! max_read_bytes: 1048576
//! request_timeout: 30s
//! ```
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Typed, validated configuration for both binaries' roles

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default listen / connect address
pub const DEFAULT_ADDR: &str = "127.0.0.1:50051";

/// Configuration errors. The CLI reports these with exit code 2.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_addr() -> String {
    DEFAULT_ADDR.to_string()
}

fn default_max_read_bytes() -> usize {
    1024 * 1024
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_path_len() -> usize {
    crate::domain::path_confinement::DEFAULT_MAX_PATH_LEN
}

fn default_watch_channel_capacity() -> usize {
    256
}

fn default_read_only() -> bool {
    true
}

fn default_ttl() -> Duration {
    Duration::from_secs(1)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn env_override<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(val) = std::env::var(name) {
        match val.parse::<T>() {
            Ok(parsed) => {
                tracing::info!("Environment override: {}={}", name, val);
                *target = parsed;
            }
            Err(_) => {
                tracing::warn!("Invalid value for {}: '{}'. Ignoring.", name, val);
            }
        }
    }
}

fn require_directory(label: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(format!("{label} is required")));
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::Invalid(format!(
            "{label} {} is not a directory",
            path.display()
        ))),
        Err(e) => Err(ConfigError::Invalid(format!(
            "{label} {} is not accessible: {e}",
            path.display()
        ))),
    }
}

/// Server (`fsdriver serve`) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory to export
    #[serde(default)]
    pub share: PathBuf,

    /// gRPC listen address
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Upper bound on bytes returned by one Read call
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,

    /// Per-call timeout applied by the gRPC server (not to Watch streams' lifetime)
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Buffered events per watch session before the producer waits
    #[serde(default = "default_watch_channel_capacity")]
    pub watch_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            share: PathBuf::new(),
            addr: default_addr(),
            max_read_bytes: default_max_read_bytes(),
            request_timeout: default_request_timeout(),
            max_path_len: default_max_path_len(),
            watch_channel_capacity: default_watch_channel_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path.as_ref())
    }

    /// Load from `path` when given, otherwise start from defaults; then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading server configuration from {:?}", path);
                Self::from_yaml_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        env_override("FSDRIVER_MAX_READ_BYTES", &mut self.max_read_bytes);
        env_override("FSDRIVER_MAX_PATH_LEN", &mut self.max_path_len);
        env_override(
            "FSDRIVER_WATCH_CHANNEL_CAPACITY",
            &mut self.watch_channel_capacity,
        );
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("addr '{}': {e}", self.addr)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_directory("share", &self.share)?;
        self.socket_addr()?;
        if self.max_read_bytes == 0 {
            return Err(ConfigError::Invalid("max_read_bytes must be > 0".into()));
        }
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid("max_path_len must be > 0".into()));
        }
        if self.watch_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "watch_channel_capacity must be > 0".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Client mount (`fsdriver mount`) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Share name, used as the FUSE filesystem name
    #[serde(default)]
    pub share: String,

    #[serde(default)]
    pub mountpoint: PathBuf,

    /// Server address, `host:port` or a full URI
    #[serde(default = "default_addr")]
    pub addr: String,

    #[serde(default = "default_read_only")]
    pub read_only: bool,

    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub attr_ttl: Duration,

    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub entry_ttl: Duration,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Bound on every remote call issued on behalf of a kernel request
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            share: String::new(),
            mountpoint: PathBuf::new(),
            addr: default_addr(),
            read_only: default_read_only(),
            attr_ttl: default_ttl(),
            entry_ttl: default_ttl(),
            connect_timeout: default_connect_timeout(),
            call_timeout: default_call_timeout(),
        }
    }
}

impl MountConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path.as_ref())
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading mount configuration from {:?}", path);
                Self::from_yaml_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        let mut call_timeout_secs = self.call_timeout.as_secs();
        env_override("FSDRIVER_CALL_TIMEOUT_SECS", &mut call_timeout_secs);
        self.call_timeout = Duration::from_secs(call_timeout_secs);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.share.is_empty() {
            return Err(ConfigError::Invalid("share is required".into()));
        }
        require_directory("mountpoint", &self.mountpoint)?;
        if self.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("addr is required".into()));
        }
        if self.connect_timeout.is_zero() || self.call_timeout.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be > 0".into()));
        }
        Ok(())
    }
}
