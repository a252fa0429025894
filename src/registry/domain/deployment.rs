//! Deployment record aggregate and its write-once status.

use super::{BotId, DeploymentId, ParseDeploymentStatusError, RegistryDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// The attempt is still running.
    Pending,
    /// The bot was rebuilt and relaunched.
    Success,
    /// A step failed; the transcript says which.
    Failed,
}

impl DeploymentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns whether the status is frozen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DeploymentStatus {
    type Error = ParseDeploymentStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseDeploymentStatusError(value.to_owned())),
        }
    }
}

/// Auditable record of one deployment attempt.
///
/// The transcript is append-only while the record is pending. Once a
/// terminal status is set, neither status nor transcript change again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    id: DeploymentId,
    bot_id: BotId,
    status: DeploymentStatus,
    transcript: Vec<String>,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted deployment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDeploymentData {
    /// Persisted record identifier.
    pub id: DeploymentId,
    /// Persisted owning bot.
    pub bot_id: BotId,
    /// Persisted status.
    pub status: DeploymentStatus,
    /// Persisted transcript chunks.
    pub transcript: Vec<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted finalization timestamp.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl DeploymentRecord {
    /// Creates a pending record with an empty transcript.
    ///
    /// Identifiers are allocated by the registry, so records are created by
    /// registry adapters rather than by callers.
    #[must_use]
    pub const fn pending(id: DeploymentId, bot_id: BotId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            bot_id,
            status: DeploymentStatus::Pending,
            transcript: Vec::new(),
            created_at,
            finalized_at: None,
        }
    }

    /// Reconstructs a record from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedDeploymentData) -> Self {
        Self {
            id: data.id,
            bot_id: data.bot_id,
            status: data.status,
            transcript: data.transcript,
            created_at: data.created_at,
            finalized_at: data.finalized_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> DeploymentId {
        self.id
    }

    /// Returns the owning bot.
    #[must_use]
    pub const fn bot_id(&self) -> BotId {
        self.bot_id
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> DeploymentStatus {
        self.status
    }

    /// Returns the transcript chunks in append order.
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Returns the transcript joined into one text block.
    #[must_use]
    pub fn transcript_text(&self) -> String {
        self.transcript.join("\n")
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the finalization timestamp, if finalized.
    #[must_use]
    pub const fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    /// Appends one chunk to a pending transcript.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::DeploymentAlreadyFinalized`] when the
    /// record is terminal.
    pub fn append(&mut self, chunk: impl Into<String>) -> Result<(), RegistryDomainError> {
        self.ensure_pending()?;
        self.transcript.push(chunk.into());
        Ok(())
    }

    /// Sets the terminal status and the full transcript in one step.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::NonTerminalStatus`] when `status` is
    /// `pending`, or [`RegistryDomainError::DeploymentAlreadyFinalized`] when
    /// the record is already terminal.
    pub fn finalize(
        &mut self,
        status: DeploymentStatus,
        transcript: Vec<String>,
        clock: &impl Clock,
    ) -> Result<(), RegistryDomainError> {
        if !status.is_terminal() {
            return Err(RegistryDomainError::NonTerminalStatus(status));
        }
        self.ensure_pending()?;
        self.status = status;
        self.transcript = transcript;
        self.finalized_at = Some(clock.utc());
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), RegistryDomainError> {
        if self.status.is_terminal() {
            return Err(RegistryDomainError::DeploymentAlreadyFinalized {
                bot_id: self.bot_id,
                deployment_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
