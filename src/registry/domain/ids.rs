//! Identifier and validated-name types for registered bots.

use super::RegistryDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for a bot name, matching `VARCHAR(100)`.
const MAX_BOT_NAME_LENGTH: usize = 100;

/// Unique identifier for a registered bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotId(Uuid);

impl BotId {
    /// Creates a new random bot identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a bot identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for BotId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Registry-assigned deployment record identifier.
///
/// Identifiers increase monotonically in creation order across all bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(u64);

impl DeploymentId {
    /// Wraps a raw identifier value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated bot name.
///
/// The name doubles as the bot's code directory name, so it must be a safe
/// single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotName(String);

impl BotName {
    /// Creates a validated bot name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_-]`
    /// are accepted and the first character must be alphanumeric.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, RegistryDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(RegistryDomainError::EmptyBotName);
        }

        let starts_alphanumeric = normalized
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_alphanumeric());
        let is_valid = starts_alphanumeric
            && normalized.chars().all(|character| {
                character.is_ascii_lowercase()
                    || character.is_ascii_digit()
                    || character == '_'
                    || character == '-'
            });
        if !is_valid {
            return Err(RegistryDomainError::InvalidBotName(normalized));
        }

        if normalized.len() > MAX_BOT_NAME_LENGTH {
            return Err(RegistryDomainError::BotNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the bot name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BotName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BotName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
