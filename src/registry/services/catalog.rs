//! Service layer for bot catalogue management.

use crate::registry::{
    domain::{
        BotDefinition, BotId, BotName, BotRuntime, BotSettings, EnvironmentSet,
        RegistryDomainError, RemoteUrl, StartCommand,
    },
    ports::{BotRegistry, BotRegistryError},
};
use camino::Utf8PathBuf;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Request payload for registering a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBotRequest {
    /// Unique bot name.
    pub name: String,
    /// Optional git remote; blank means upload-only.
    pub repo_url: Option<String>,
    /// Runtime tag.
    pub runtime: String,
    /// Start command; blank selects the runtime default.
    pub start_command: String,
}

impl CreateBotRequest {
    /// Creates a request for a Python bot with no remote.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_url: None,
            runtime: BotRuntime::default().as_str().to_owned(),
            start_command: String::new(),
        }
    }

    /// Sets the git remote.
    #[must_use]
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = Some(repo_url.into());
        self
    }

    /// Sets the runtime tag.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Sets the start command.
    #[must_use]
    pub fn with_start_command(mut self, start_command: impl Into<String>) -> Self {
        self.start_command = start_command.into();
        self
    }
}

/// Request payload for editing a bot's settings.
///
/// Every field replaces the stored value; the name and code path are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBotRequest {
    /// New git remote; blank clears it.
    pub repo_url: Option<String>,
    /// New runtime tag.
    pub runtime: String,
    /// New start command.
    pub start_command: String,
}

fn parse_settings(
    repo_url: Option<&str>,
    runtime: &str,
    start_command: &str,
) -> Result<BotSettings, RegistryDomainError> {
    Ok(BotSettings {
        repo_url: RemoteUrl::parse_optional(repo_url)?,
        runtime: BotRuntime::try_from(runtime)?,
        start_command: StartCommand::new(start_command),
    })
}

/// Service-level errors for bot catalogue operations.
#[derive(Debug, Error)]
pub enum BotCatalogServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] RegistryDomainError),
    /// Registry operation failed.
    #[error(transparent)]
    Registry(#[from] BotRegistryError),
    /// No bot exists with the given identifier.
    #[error("bot {0} not found")]
    NotFound(BotId),
    /// The bot's source directory could not be created.
    #[error("failed to create code directory {path}: {source}")]
    CodeDirectory {
        /// Directory that was being created.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for catalogue service operations.
pub type BotCatalogServiceResult<T> = Result<T, BotCatalogServiceError>;

/// Bot catalogue service: creation, editing, environment, and deletion.
#[derive(Clone)]
pub struct BotCatalogService<R, C>
where
    R: BotRegistry,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    clock: Arc<C>,
    code_root: Utf8PathBuf,
}

impl<R, C> BotCatalogService<R, C>
where
    R: BotRegistry,
    C: Clock + Send + Sync,
{
    /// Creates a catalogue service rooted at `code_root`.
    #[must_use]
    pub const fn new(registry: Arc<R>, clock: Arc<C>, code_root: Utf8PathBuf) -> Self {
        Self {
            registry,
            clock,
            code_root,
        }
    }

    async fn find_bot_or_error(&self, bot_id: BotId) -> BotCatalogServiceResult<BotDefinition> {
        self.registry
            .find_bot(bot_id)
            .await?
            .ok_or(BotCatalogServiceError::NotFound(bot_id))
    }

    /// Registers a new bot and creates its source directory.
    ///
    /// An existing directory is kept as is.
    ///
    /// # Errors
    ///
    /// Returns [`BotCatalogServiceError::Domain`] when the name, runtime, or
    /// remote is invalid, [`BotCatalogServiceError::CodeDirectory`] when the
    /// directory cannot be created, and registry errors such as
    /// [`BotRegistryError::DuplicateBotName`].
    #[instrument(skip(self, request), fields(bot_name = %request.name))]
    pub async fn create_bot(
        &self,
        request: CreateBotRequest,
    ) -> BotCatalogServiceResult<BotDefinition> {
        let name = BotName::new(request.name)?;
        let settings = parse_settings(
            request.repo_url.as_deref(),
            &request.runtime,
            &request.start_command,
        )?;
        let bot = BotDefinition::new(name, settings, &self.code_root, &*self.clock);
        tokio::fs::create_dir_all(bot.code_path())
            .await
            .map_err(|source| BotCatalogServiceError::CodeDirectory {
                path: bot.code_path().to_path_buf(),
                source,
            })?;
        self.registry.create_bot(&bot).await?;
        info!(bot_id = %bot.id(), code_path = %bot.code_path(), "bot registered");
        Ok(bot)
    }

    /// Replaces a bot's editable settings.
    ///
    /// # Errors
    ///
    /// Returns [`BotCatalogServiceError::NotFound`] for unknown bots and
    /// validation or registry errors otherwise.
    pub async fn update_bot(
        &self,
        bot_id: BotId,
        request: UpdateBotRequest,
    ) -> BotCatalogServiceResult<BotDefinition> {
        let mut bot = self.find_bot_or_error(bot_id).await?;
        let settings = parse_settings(
            request.repo_url.as_deref(),
            &request.runtime,
            &request.start_command,
        )?;
        bot.update_settings(settings, &*self.clock);
        self.registry.update_bot(&bot).await?;
        Ok(bot)
    }

    /// Replaces a bot's environment wholesale.
    ///
    /// Entries with blank keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BotCatalogServiceError::NotFound`] for unknown bots,
    /// [`RegistryDomainError::DuplicateEnvironmentKey`] for repeated keys,
    /// and registry errors.
    pub async fn replace_environment<K, V>(
        &self,
        bot_id: BotId,
        entries: impl IntoIterator<Item = (K, V)> + Send,
    ) -> BotCatalogServiceResult<EnvironmentSet>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let environment = EnvironmentSet::from_pairs(entries)?;
        self.find_bot_or_error(bot_id).await?;
        self.registry
            .replace_environment(bot_id, &environment)
            .await?;
        Ok(environment)
    }

    /// Returns a bot's environment.
    ///
    /// # Errors
    ///
    /// Returns registry errors, including
    /// [`BotRegistryError::BotNotFound`].
    pub async fn environment(&self, bot_id: BotId) -> BotCatalogServiceResult<EnvironmentSet> {
        Ok(self.registry.load_environment(bot_id).await?)
    }

    /// Deletes a bot with its environment and deployment history.
    ///
    /// The bot's container and code directory are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`BotCatalogServiceError::NotFound`] for unknown bots.
    #[instrument(skip(self))]
    pub async fn delete_bot(&self, bot_id: BotId) -> BotCatalogServiceResult<()> {
        self.registry
            .delete_bot(bot_id)
            .await
            .map_err(|err| match err {
                BotRegistryError::BotNotFound(id) => BotCatalogServiceError::NotFound(id),
                other => BotCatalogServiceError::Registry(other),
            })?;
        info!("bot deleted");
        Ok(())
    }

    /// Looks up a bot by name.
    ///
    /// # Errors
    ///
    /// Returns [`BotCatalogServiceError::Domain`] for invalid names and
    /// registry errors.
    pub async fn find_by_name(&self, name: &str) -> BotCatalogServiceResult<Option<BotDefinition>> {
        let parsed = BotName::new(name)?;
        Ok(self.registry.find_bot_by_name(&parsed).await?)
    }

    /// Lists all bots ordered by name.
    ///
    /// # Errors
    ///
    /// Returns registry errors.
    pub async fn list_bots(&self) -> BotCatalogServiceResult<Vec<BotDefinition>> {
        Ok(self.registry.list_bots().await?)
    }
}
