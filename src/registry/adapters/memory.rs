//! In-memory bot registry for tests and single-process deployments.

use crate::registry::{
    domain::{
        BotDefinition, BotId, BotName, DeploymentId, DeploymentRecord, DeploymentStatus,
        EnvironmentSet, PersistedDeploymentData,
    },
    ports::{BotRegistry, BotRegistryError, BotRegistryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory bot registry.
///
/// A poisoned lock is recovered rather than reported, as in the other
/// in-memory adapters; every mutation completes before it can panic.
/// Failures can be injected to exercise orchestration error paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBotRegistry {
    state: Arc<RwLock<InMemoryRegistryState>>,
}

#[derive(Debug, Default)]
struct InMemoryRegistryState {
    bots: HashMap<BotId, BotDefinition>,
    name_index: HashMap<BotName, BotId>,
    environments: HashMap<BotId, EnvironmentSet>,
    deployments: BTreeMap<DeploymentId, DeploymentRecord>,
    last_deployment_id: u64,
    append_failure: Option<BotRegistryError>,
    environment_failure: Option<BotRegistryError>,
}

impl InMemoryBotRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, InMemoryRegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, InMemoryRegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every transcript append fail with `error` until cleared.
    pub fn fail_appends(&self, error: BotRegistryError) {
        self.write_state().append_failure = Some(error);
    }

    /// Makes every environment load fail with `error` until cleared.
    pub fn fail_environment_loads(&self, error: BotRegistryError) {
        self.write_state().environment_failure = Some(error);
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.write_state();
        state.append_failure = None;
        state.environment_failure = None;
    }
}

impl InMemoryRegistryState {
    fn ensure_bot(&self, bot_id: BotId) -> BotRegistryResult<()> {
        if self.bots.contains_key(&bot_id) {
            Ok(())
        } else {
            Err(BotRegistryError::BotNotFound(bot_id))
        }
    }

    fn pending_deployment_mut(
        &mut self,
        deployment_id: DeploymentId,
    ) -> BotRegistryResult<&mut DeploymentRecord> {
        let record = self
            .deployments
            .get_mut(&deployment_id)
            .ok_or(BotRegistryError::DeploymentNotFound(deployment_id))?;
        if record.status().is_terminal() {
            return Err(BotRegistryError::DeploymentAlreadyFinalized(deployment_id));
        }
        Ok(record)
    }
}

#[async_trait]
impl BotRegistry for InMemoryBotRegistry {
    async fn create_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()> {
        let mut state = self.write_state();

        if state.bots.contains_key(&bot.id()) {
            return Err(BotRegistryError::DuplicateBot(bot.id()));
        }
        if state.name_index.contains_key(bot.name()) {
            return Err(BotRegistryError::DuplicateBotName(bot.name().clone()));
        }

        state.name_index.insert(bot.name().clone(), bot.id());
        state.environments.insert(bot.id(), EnvironmentSet::empty());
        state.bots.insert(bot.id(), bot.clone());
        Ok(())
    }

    async fn update_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()> {
        let mut state = self.write_state();
        state.ensure_bot(bot.id())?;
        state.bots.insert(bot.id(), bot.clone());
        Ok(())
    }

    async fn delete_bot(&self, bot_id: BotId) -> BotRegistryResult<()> {
        let mut state = self.write_state();
        let removed = state
            .bots
            .remove(&bot_id)
            .ok_or(BotRegistryError::BotNotFound(bot_id))?;
        state.name_index.remove(removed.name());
        state.environments.remove(&bot_id);
        state
            .deployments
            .retain(|_, record| record.bot_id() != bot_id);
        Ok(())
    }

    async fn find_bot(&self, bot_id: BotId) -> BotRegistryResult<Option<BotDefinition>> {
        let state = self.read_state();
        Ok(state.bots.get(&bot_id).cloned())
    }

    async fn find_bot_by_name(&self, name: &BotName) -> BotRegistryResult<Option<BotDefinition>> {
        let state = self.read_state();
        let bot = state
            .name_index
            .get(name)
            .and_then(|id| state.bots.get(id))
            .cloned();
        Ok(bot)
    }

    async fn list_bots(&self) -> BotRegistryResult<Vec<BotDefinition>> {
        let state = self.read_state();
        let mut bots: Vec<BotDefinition> = state.bots.values().cloned().collect();
        bots.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(bots)
    }

    async fn load_environment(&self, bot_id: BotId) -> BotRegistryResult<EnvironmentSet> {
        let state = self.read_state();
        if let Some(error) = &state.environment_failure {
            return Err(error.clone());
        }
        state.ensure_bot(bot_id)?;
        Ok(state.environments.get(&bot_id).cloned().unwrap_or_default())
    }

    async fn replace_environment(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
    ) -> BotRegistryResult<()> {
        let mut state = self.write_state();
        state.ensure_bot(bot_id)?;
        state.environments.insert(bot_id, environment.clone());
        Ok(())
    }

    async fn create_deployment(
        &self,
        bot_id: BotId,
        created_at: DateTime<Utc>,
    ) -> BotRegistryResult<DeploymentRecord> {
        let mut state = self.write_state();
        state.ensure_bot(bot_id)?;
        state.last_deployment_id += 1;
        let id = DeploymentId::new(state.last_deployment_id);
        let record = DeploymentRecord::pending(id, bot_id, created_at);
        state.deployments.insert(id, record.clone());
        Ok(record)
    }

    async fn append_deployment_log(
        &self,
        deployment_id: DeploymentId,
        chunk: &str,
    ) -> BotRegistryResult<()> {
        let mut state = self.write_state();
        if let Some(error) = &state.append_failure {
            return Err(error.clone());
        }
        let record = state.pending_deployment_mut(deployment_id)?;
        record
            .append(chunk)
            .map_err(|_| BotRegistryError::DeploymentAlreadyFinalized(deployment_id))
    }

    async fn finalize_deployment(&self, record: &DeploymentRecord) -> BotRegistryResult<()> {
        if record.status() == DeploymentStatus::Pending {
            return Err(BotRegistryError::DeploymentNotTerminal(record.id()));
        }

        let mut state = self.write_state();
        let stored = state.pending_deployment_mut(record.id())?;
        *stored = DeploymentRecord::from_persisted(PersistedDeploymentData {
            id: stored.id(),
            bot_id: stored.bot_id(),
            status: record.status(),
            transcript: record.transcript().to_vec(),
            created_at: stored.created_at(),
            finalized_at: record.finalized_at(),
        });
        Ok(())
    }

    async fn find_deployment(
        &self,
        deployment_id: DeploymentId,
    ) -> BotRegistryResult<Option<DeploymentRecord>> {
        let state = self.read_state();
        Ok(state.deployments.get(&deployment_id).cloned())
    }

    async fn list_deployments(
        &self,
        bot_id: BotId,
        limit: Option<usize>,
    ) -> BotRegistryResult<Vec<DeploymentRecord>> {
        let state = self.read_state();
        let records = state
            .deployments
            .values()
            .rev()
            .filter(|record| record.bot_id() == bot_id)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(records)
    }
}
