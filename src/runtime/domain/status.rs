//! Observed runtime status of a bot container.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a bot's container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RuntimeStatus {
    /// The runtime connection is unavailable.
    Unknown,
    /// The container is running.
    Running,
    /// The container is absent or not running.
    Stopped {
        /// Engine state such as `exited`; `None` when no container exists.
        reason: Option<String>,
    },
    /// The runtime answered with an unexpected failure.
    Error {
        /// Diagnostic text.
        detail: String,
    },
}

impl RuntimeStatus {
    /// Returns whether the container is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Maps an engine state string to a status.
    #[must_use]
    pub fn from_engine_state(state: &str) -> Self {
        match state.trim() {
            "running" => Self::Running,
            other => Self::Stopped {
                reason: Some(other.to_owned()),
            },
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => formatter.write_str("Unknown"),
            Self::Running => formatter.write_str("Running"),
            Self::Stopped { reason: None } => formatter.write_str("Stopped"),
            Self::Stopped {
                reason: Some(reason),
            } => write!(formatter, "Stopped ({reason})"),
            Self::Error { detail } => write!(formatter, "Error: {detail}"),
        }
    }
}
