//! Bot definition aggregate root and its configuration value objects.

use super::{BotId, BotName, RegistryDomainError};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version-control remote a bot's source is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteUrl(String);

impl RemoteUrl {
    const SUPPORTED_PREFIXES: [&'static str; 5] =
        ["https://", "http://", "ssh://", "git@", "file://"];

    /// Creates a validated remote URL.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::EmptyRemoteUrl`] for blank input and
    /// [`RegistryDomainError::InvalidRemoteUrl`] when the scheme is not
    /// supported or the value contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, RegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(RegistryDomainError::EmptyRemoteUrl);
        }

        let has_supported_prefix = Self::SUPPORTED_PREFIXES
            .iter()
            .any(|prefix| normalized.starts_with(prefix));
        if !has_supported_prefix || normalized.chars().any(char::is_whitespace) {
            return Err(RegistryDomainError::InvalidRemoteUrl(normalized));
        }

        Ok(Self(normalized))
    }

    /// Parses an optional form value, treating blank input as "no remote".
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`RemoteUrl::new`] for non-blank input.
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, RegistryDomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Self::new(raw).map(Some),
        }
    }

    /// Returns the remote as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Execution runtime a bot image is based on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotRuntime {
    /// CPython bots.
    #[default]
    Python,
    /// Node.js bots.
    Node,
}

impl BotRuntime {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Node => "node",
        }
    }

    /// Returns the base image used by synthesized build descriptors.
    #[must_use]
    pub const fn base_image(self) -> &'static str {
        match self {
            Self::Python => "python:3.11-slim",
            Self::Node => "node:20-slim",
        }
    }

    /// Returns the entry point used when a bot has no start command.
    #[must_use]
    pub const fn default_command(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["python", "bot.py"],
            Self::Node => &["node", "index.js"],
        }
    }
}

impl fmt::Display for BotRuntime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BotRuntime {
    type Error = RegistryDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "node" => Ok(Self::Node),
            _ => Err(RegistryDomainError::UnsupportedRuntime(value.to_owned())),
        }
    }
}

/// Whitespace-separated command line a bot container is started with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StartCommand(String);

impl StartCommand {
    /// Creates a start command. Blank input selects the runtime default.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_owned())
    }

    /// Returns the raw command line.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the runtime default entry point applies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits the command into argv form, falling back to the runtime
    /// default when empty.
    #[must_use]
    pub fn argv(&self, runtime: BotRuntime) -> Vec<String> {
        if self.is_empty() {
            return runtime
                .default_command()
                .iter()
                .map(|part| (*part).to_owned())
                .collect();
        }
        self.0.split_whitespace().map(str::to_owned).collect()
    }
}

impl fmt::Display for StartCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// User-editable bot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    /// Optional version-control remote.
    pub repo_url: Option<RemoteUrl>,
    /// Execution runtime.
    pub runtime: BotRuntime,
    /// Container start command.
    pub start_command: StartCommand,
}

impl BotSettings {
    /// Creates settings for the given runtime with its default entry point.
    #[must_use]
    pub fn new(runtime: BotRuntime) -> Self {
        Self {
            repo_url: None,
            runtime,
            start_command: StartCommand::default(),
        }
    }

    /// Sets the source remote.
    #[must_use]
    pub fn with_repo_url(mut self, repo_url: RemoteUrl) -> Self {
        self.repo_url = Some(repo_url);
        self
    }

    /// Sets the start command.
    #[must_use]
    pub fn with_start_command(mut self, start_command: StartCommand) -> Self {
        self.start_command = start_command;
        self
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self::new(BotRuntime::default())
    }
}

/// Bot definition aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotDefinition {
    id: BotId,
    name: BotName,
    code_path: Utf8PathBuf,
    settings: BotSettings,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted bot definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBotData {
    /// Persisted bot identifier.
    pub id: BotId,
    /// Persisted unique name.
    pub name: BotName,
    /// Persisted code directory.
    pub code_path: Utf8PathBuf,
    /// Persisted editable settings.
    pub settings: BotSettings,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BotDefinition {
    /// Creates a new bot definition whose code directory is
    /// `code_root/<name>`.
    #[must_use]
    pub fn new(
        name: BotName,
        settings: BotSettings,
        code_root: &Utf8Path,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: BotId::new(),
            code_path: code_root.join(name.as_str()),
            name,
            settings,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a definition from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedBotData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            code_path: data.code_path,
            settings: data.settings,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the bot identifier.
    #[must_use]
    pub const fn id(&self) -> BotId {
        self.id
    }

    /// Returns the unique bot name.
    #[must_use]
    pub const fn name(&self) -> &BotName {
        &self.name
    }

    /// Returns the bot's code directory.
    #[must_use]
    pub fn code_path(&self) -> &Utf8Path {
        &self.code_path
    }

    /// Returns the editable settings.
    #[must_use]
    pub const fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Returns the configured source remote, if any.
    #[must_use]
    pub const fn repo_url(&self) -> Option<&RemoteUrl> {
        self.settings.repo_url.as_ref()
    }

    /// Returns the execution runtime.
    #[must_use]
    pub const fn runtime(&self) -> BotRuntime {
        self.settings.runtime
    }

    /// Returns the start command.
    #[must_use]
    pub const fn start_command(&self) -> &StartCommand {
        &self.settings.start_command
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the editable settings. Name and code path never change.
    pub fn update_settings(&mut self, settings: BotSettings, clock: &impl Clock) {
        self.settings = settings;
        self.updated_at = clock.utc();
    }
}
