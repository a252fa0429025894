//! Process-wide container engine connection.

use crate::runtime::ports::RuntimeError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Result of checking the container engine once at startup.
///
/// A failed check is kept as a value so status queries can report
/// `Unknown` and lifecycle operations can fail fast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeConnection {
    /// The engine answered `version`.
    Available {
        /// Engine server version.
        version: String,
    },
    /// The engine could not be reached.
    Unavailable {
        /// Why the engine could not be reached.
        reason: String,
    },
}

impl RuntimeConnection {
    /// Connects to the engine by running `<binary> version`.
    pub async fn connect(docker_binary: &str, timeout: Duration) -> Self {
        let mut command = Command::new(docker_binary);
        command
            .args(["version", "--format", "{{.Server.Version}}"])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let connection = match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => Self::Unavailable {
                reason: format!("engine version check timed out after {timeout:?}"),
            },
            Ok(Err(err)) => Self::Unavailable {
                reason: format!("cannot execute {docker_binary}: {err}"),
            },
            Ok(Ok(output)) if output.status.success() => Self::Available {
                version: String::from_utf8_lossy(&output.stdout).trim().to_owned(),
            },
            Ok(Ok(output)) => Self::Unavailable {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            },
        };

        match &connection {
            Self::Available { version } => info!(%version, "connected to container engine"),
            Self::Unavailable { reason } => warn!(%reason, "container engine unavailable"),
        }
        connection
    }

    /// Returns whether the engine answered at startup.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Fails with [`RuntimeError::Unavailable`] when the engine was unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Unavailable`] carrying the connection failure.
    pub fn ensure_available(&self) -> Result<(), RuntimeError> {
        match self {
            Self::Available { .. } => Ok(()),
            Self::Unavailable { reason } => Err(RuntimeError::Unavailable(reason.clone())),
        }
    }
}
