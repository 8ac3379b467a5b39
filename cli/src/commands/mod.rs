// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the fsdriver CLI

pub mod mount;
pub mod probe;
pub mod serve;
pub mod watch;

pub use self::mount::MountArgs;
pub use self::probe::ProbeArgs;
pub use self::serve::ServeArgs;
pub use self::watch::WatchArgs;

use fsdriver_core::domain::config::ConfigError;

/// Process exit status for a failed command: 2 when any error in the chain is
/// a configuration error, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.chain().any(|cause| cause.downcast_ref::<ConfigError>().is_some()) {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = anyhow::Error::from(ConfigError::Invalid("share is required".into()));
        assert_eq!(exit_code(&err), 2);

        let wrapped = Err::<(), _>(ConfigError::Invalid("x".into()))
            .context("Failed to load configuration")
            .unwrap_err();
        assert_eq!(exit_code(&wrapped), 2);
    }

    #[test]
    fn test_runtime_errors_exit_with_one() {
        let err = anyhow::anyhow!("connection refused");
        assert_eq!(exit_code(&err), 1);
    }
}
