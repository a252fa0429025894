//! Repository port for bot definitions, environments, and deployment history.

use crate::registry::domain::{
    BotDefinition, BotId, BotName, DeploymentId, DeploymentRecord, EnvironmentSet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for bot registry operations.
pub type BotRegistryResult<T> = Result<T, BotRegistryError>;

/// Persistence contract consumed by the deployment orchestrator and the bot
/// catalogue.
///
/// Implementations hold no orchestration logic; they provide field-level
/// access and enforce the write-once rule for deployment records.
#[async_trait]
pub trait BotRegistry: Send + Sync {
    /// Stores a new bot definition with an empty environment.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::DuplicateBot`] when the ID already exists
    /// or [`BotRegistryError::DuplicateBotName`] when the name is taken.
    async fn create_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()>;

    /// Persists changed settings of an existing bot.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::BotNotFound`] when the bot does not exist.
    async fn update_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()>;

    /// Deletes a bot together with its environment and deployment records.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::BotNotFound`] when the bot does not exist.
    async fn delete_bot(&self, bot_id: BotId) -> BotRegistryResult<()>;

    /// Loads a bot by identifier.
    async fn find_bot(&self, bot_id: BotId) -> BotRegistryResult<Option<BotDefinition>>;

    /// Loads a bot by its unique name.
    async fn find_bot_by_name(&self, name: &BotName) -> BotRegistryResult<Option<BotDefinition>>;

    /// Returns all bots ordered by name.
    async fn list_bots(&self) -> BotRegistryResult<Vec<BotDefinition>>;

    /// Loads the environment of a bot.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::BotNotFound`] when the bot does not exist.
    async fn load_environment(&self, bot_id: BotId) -> BotRegistryResult<EnvironmentSet>;

    /// Replaces the environment of a bot wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::BotNotFound`] when the bot does not exist.
    async fn replace_environment(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
    ) -> BotRegistryResult<()>;

    /// Allocates the next deployment identifier and stores a pending record.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::BotNotFound`] when the bot does not exist.
    async fn create_deployment(
        &self,
        bot_id: BotId,
        created_at: DateTime<Utc>,
    ) -> BotRegistryResult<DeploymentRecord>;

    /// Appends one transcript chunk to a pending record.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::DeploymentNotFound`] for unknown records
    /// and [`BotRegistryError::DeploymentAlreadyFinalized`] for terminal ones.
    async fn append_deployment_log(
        &self,
        deployment_id: DeploymentId,
        chunk: &str,
    ) -> BotRegistryResult<()>;

    /// Writes the terminal status and full transcript of a record.
    ///
    /// The stored record must still be pending; the write is rejected
    /// otherwise so a finalized record never changes.
    ///
    /// # Errors
    ///
    /// Returns [`BotRegistryError::DeploymentNotFound`] for unknown records,
    /// [`BotRegistryError::DeploymentAlreadyFinalized`] when the stored record
    /// is terminal, and [`BotRegistryError::DeploymentNotTerminal`] when the
    /// supplied record is still pending.
    async fn finalize_deployment(&self, record: &DeploymentRecord) -> BotRegistryResult<()>;

    /// Loads a deployment record by identifier.
    async fn find_deployment(
        &self,
        deployment_id: DeploymentId,
    ) -> BotRegistryResult<Option<DeploymentRecord>>;

    /// Lists deployment records of a bot, newest first, optionally limited.
    async fn list_deployments(
        &self,
        bot_id: BotId,
        limit: Option<usize>,
    ) -> BotRegistryResult<Vec<DeploymentRecord>>;
}

/// Errors returned by bot registry implementations.
#[derive(Debug, Clone, Error)]
pub enum BotRegistryError {
    /// A bot with the same identifier already exists.
    #[error("duplicate bot identifier: {0}")]
    DuplicateBot(BotId),

    /// A bot with the same name already exists.
    #[error("bot with name '{0}' already exists")]
    DuplicateBotName(BotName),

    /// The bot was not found.
    #[error("bot not found: {0}")]
    BotNotFound(BotId),

    /// The deployment record was not found.
    #[error("deployment not found: {0}")]
    DeploymentNotFound(DeploymentId),

    /// The deployment record is already terminal.
    #[error("deployment {0} is already finalized")]
    DeploymentAlreadyFinalized(DeploymentId),

    /// A finalize write carried a pending status.
    #[error("deployment {0} cannot be finalized with a pending status")]
    DeploymentNotTerminal(DeploymentId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted registry data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BotRegistryError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
