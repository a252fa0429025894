//! Error types for bot registry domain validation and parsing.

use super::{BotId, DeploymentId, DeploymentStatus};
use thiserror::Error;

/// Errors returned while constructing registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryDomainError {
    /// The bot name is empty after trimming.
    #[error("bot name must not be empty")]
    EmptyBotName,

    /// The bot name contains characters outside `[a-z0-9_-]` or starts with
    /// a separator.
    #[error(
        "bot name '{0}' is invalid (lowercase alphanumeric, '-' and '_' only, starting with a letter or digit)"
    )]
    InvalidBotName(String),

    /// The bot name exceeds the 100-character storage limit.
    #[error("bot name exceeds 100 character limit: {0}")]
    BotNameTooLong(String),

    /// The source remote is empty after trimming.
    #[error("source remote URL must not be empty")]
    EmptyRemoteUrl,

    /// The source remote uses an unsupported scheme or contains whitespace.
    #[error("source remote '{0}' is not a supported git remote")]
    InvalidRemoteUrl(String),

    /// The runtime tag is not one of the supported runtimes.
    #[error("unsupported bot runtime: {0}")]
    UnsupportedRuntime(String),

    /// An environment variable key is empty after trimming.
    #[error("environment variable key must not be empty")]
    EmptyEnvironmentKey,

    /// An environment variable key contains `=`, whitespace or NUL.
    #[error("environment variable key '{0}' contains forbidden characters")]
    InvalidEnvironmentKey(String),

    /// An environment variable value contains a line break or NUL.
    #[error("value of environment variable '{0}' must be a single line")]
    InvalidEnvironmentValue(String),

    /// The same key appears twice in one environment set.
    #[error("duplicate environment variable key: {0}")]
    DuplicateEnvironmentKey(String),

    /// A terminal deployment record cannot change again.
    #[error("deployment {deployment_id} of bot {bot_id} is already {status}")]
    DeploymentAlreadyFinalized {
        /// Bot owning the record.
        bot_id: BotId,
        /// Record identifier.
        deployment_id: DeploymentId,
        /// Frozen status.
        status: DeploymentStatus,
    },

    /// Finalizing requires a terminal target status.
    #[error("deployment cannot be finalized as {0}")]
    NonTerminalStatus(DeploymentStatus),
}

/// Error returned while parsing deployment status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown deployment status: {0}")]
pub struct ParseDeploymentStatusError(pub String);
