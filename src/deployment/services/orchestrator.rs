//! Deployment orchestration: fetch, build, relaunch, finalize.

use crate::deployment::domain::{
    DeploymentStep, InFlightDeployments, InFlightGuard, TranscriptBuilder,
};
use crate::registry::{
    domain::{
        BotDefinition, BotId, DeploymentRecord, DeploymentStatus, EnvironmentSet,
        RegistryDomainError,
    },
    ports::{BotRegistry, BotRegistryError},
};
use crate::runtime::{
    domain::{BuildContext, RunInfo, RuntimeStatus},
    ports::{ContainerRuntime, RuntimeError},
};
use crate::source::{adapters::ZipArchiveExpander, domain::ArchiveError, ports::SourceFetcher};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Errors surfaced to callers of the orchestrator.
///
/// Failures inside a running deployment are not reported here; they are
/// captured in the record's transcript and terminal status.
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// No bot exists with the given identifier.
    #[error("bot {0} not found")]
    NotFound(BotId),

    /// Another deployment or lifecycle call for the bot is in progress.
    #[error("a deployment for bot {0} is already in progress")]
    Conflict(BotId),

    /// The container runtime connection is unavailable.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A deployment record rejected a transition.
    #[error(transparent)]
    Domain(#[from] RegistryDomainError),

    /// Registry read or write failed.
    #[error(transparent)]
    Registry(#[from] BotRegistryError),

    /// A direct lifecycle call failed.
    #[error(transparent)]
    Runtime(RuntimeError),
}

impl DeploymentError {
    /// Returns whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::RuntimeUnavailable(_))
    }
}

impl From<RuntimeError> for DeploymentError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(reason) => Self::RuntimeUnavailable(reason),
            other => Self::Runtime(other),
        }
    }
}

/// Result type for orchestrator operations.
pub type DeploymentResult<T> = Result<T, DeploymentError>;

struct Attempt {
    bot: BotDefinition,
    environment: EnvironmentSet,
    record: DeploymentRecord,
    transcript: TranscriptBuilder,
    _guard: InFlightGuard,
}

/// Sequences deployments and direct lifecycle calls for bots.
#[derive(Clone)]
pub struct DeploymentOrchestrator<R, T, F, C>
where
    R: BotRegistry,
    T: ContainerRuntime,
    F: SourceFetcher,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    runtime: Arc<T>,
    fetcher: Arc<F>,
    clock: Arc<C>,
    expander: ZipArchiveExpander,
    in_flight: InFlightDeployments,
}

impl<R, T, F, C> DeploymentOrchestrator<R, T, F, C>
where
    R: BotRegistry,
    T: ContainerRuntime,
    F: SourceFetcher,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(registry: Arc<R>, runtime: Arc<T>, fetcher: Arc<F>, clock: Arc<C>) -> Self {
        Self {
            registry,
            runtime,
            fetcher,
            clock,
            expander: ZipArchiveExpander::new(),
            in_flight: InFlightDeployments::new(),
        }
    }

    /// Returns whether a deployment or lifecycle call for `bot_id` is running.
    #[must_use]
    pub fn is_in_flight(&self, bot_id: BotId) -> bool {
        self.in_flight.contains(bot_id)
    }

    async fn find_bot_or_error(&self, bot_id: BotId) -> DeploymentResult<BotDefinition> {
        self.registry
            .find_bot(bot_id)
            .await?
            .ok_or(DeploymentError::NotFound(bot_id))
    }

    fn ensure_runtime_available(&self) -> DeploymentResult<()> {
        if self.runtime.is_available() {
            Ok(())
        } else {
            Err(DeploymentError::RuntimeUnavailable(String::from(
                "no connection to the container engine",
            )))
        }
    }

    fn claim(&self, bot_id: BotId) -> DeploymentResult<InFlightGuard> {
        self.in_flight
            .try_acquire(bot_id)
            .ok_or(DeploymentError::Conflict(bot_id))
    }

    // Every fallible read happens before the record exists, so a created
    // record always reaches a terminal status.
    async fn begin(&self, bot_id: BotId) -> DeploymentResult<Attempt> {
        let bot = self.find_bot_or_error(bot_id).await?;
        self.ensure_runtime_available()?;
        let guard = self.claim(bot_id)?;
        let environment = self.registry.load_environment(bot_id).await?;
        let record = self
            .registry
            .create_deployment(bot_id, self.clock.utc())
            .await?;
        info!(deployment_id = %record.id(), "deployment started");
        Ok(Attempt {
            bot,
            environment,
            record,
            transcript: TranscriptBuilder::new(),
            _guard: guard,
        })
    }

    /// Stores a chunk on the pending record. The builder keeps every chunk,
    /// so a lost append is repaired by the finalize write.
    async fn append_chunk(&self, attempt: &Attempt, step: DeploymentStep, chunk: &str) {
        if let Err(err) = self
            .registry
            .append_deployment_log(attempt.record.id(), chunk)
            .await
        {
            warn!(
                deployment_id = %attempt.record.id(),
                %step,
                error = %err,
                "failed to append transcript chunk"
            );
        }
    }

    async fn record_success(&self, attempt: &mut Attempt, step: DeploymentStep, detail: &str) {
        let chunk = attempt.transcript.succeeded(step, detail).to_owned();
        self.append_chunk(attempt, step, &chunk).await;
        info!(%step, "deployment step completed");
    }

    async fn fail(
        &self,
        mut attempt: Attempt,
        step: DeploymentStep,
        error: &(dyn std::fmt::Display + Sync),
    ) -> DeploymentResult<DeploymentRecord> {
        let chunk = attempt.transcript.failed(step, error).to_owned();
        self.append_chunk(&attempt, step, &chunk).await;
        warn!(%step, error = %error, "deployment step failed");
        self.finish(attempt, DeploymentStatus::Failed).await
    }

    async fn finish(
        &self,
        attempt: Attempt,
        status: DeploymentStatus,
    ) -> DeploymentResult<DeploymentRecord> {
        let Attempt {
            mut record,
            transcript,
            ..
        } = attempt;
        record.finalize(status, transcript.into_chunks(), self.clock.as_ref())?;
        self.registry.finalize_deployment(&record).await?;
        info!(deployment_id = %record.id(), %status, "deployment finalized");
        Ok(record)
    }

    /// Fetches, builds, and relaunches a bot from its remote.
    ///
    /// Bots without a remote skip the fetch and rebuild whatever is on disk.
    /// Step failures are returned as a `failed` record, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`] for unknown bots,
    /// [`DeploymentError::RuntimeUnavailable`] when the engine is down,
    /// [`DeploymentError::Conflict`] while another deployment for the bot
    /// runs, and registry errors when the environment cannot be loaded or
    /// the record cannot be created or finalized. A failed transcript
    /// append is logged and repaired by the finalize write.
    #[instrument(skip(self), fields(bot_id = %bot_id))]
    pub async fn trigger_deploy(&self, bot_id: BotId) -> DeploymentResult<DeploymentRecord> {
        let mut attempt = self.begin(bot_id).await?;

        if let Some(remote) = attempt.bot.repo_url().cloned() {
            let fetched = self.fetcher.fetch(&remote, attempt.bot.code_path()).await;
            match fetched {
                Ok(log) => {
                    self.record_success(&mut attempt, DeploymentStep::Fetch, &log.summary())
                        .await;
                }
                Err(err) => return self.fail(attempt, DeploymentStep::Fetch, &err).await,
            }
        }

        self.build_and_relaunch(attempt).await
    }

    /// Replaces a bot's sources with a ZIP archive, then builds and
    /// relaunches it.
    ///
    /// # Errors
    ///
    /// Same pre-check errors as [`Self::trigger_deploy`]. Unreadable or
    /// unsafe archives produce a `failed` record.
    #[instrument(skip(self, archive), fields(bot_id = %bot_id, size_bytes = archive.len()))]
    pub async fn trigger_upload_deploy(
        &self,
        bot_id: BotId,
        archive: Vec<u8>,
    ) -> DeploymentResult<DeploymentRecord> {
        let mut attempt = self.begin(bot_id).await?;

        let expander = self.expander;
        let code_path = attempt.bot.code_path().to_path_buf();
        let expanded = tokio::task::spawn_blocking(move || expander.expand(&archive, &code_path))
            .await
            .unwrap_or_else(|err| Err(ArchiveError::Io(err.to_string())));
        match expanded {
            Ok(summary) => {
                self.record_success(&mut attempt, DeploymentStep::Upload, &summary.summary())
                    .await;
            }
            Err(err) => return self.fail(attempt, DeploymentStep::Upload, &err).await,
        }

        self.build_and_relaunch(attempt).await
    }

    async fn build_and_relaunch(
        &self,
        mut attempt: Attempt,
    ) -> DeploymentResult<DeploymentRecord> {
        let bot_id = attempt.bot.id();
        let context = BuildContext::new(bot_id, attempt.bot.code_path(), attempt.bot.runtime());
        match self.runtime.build_image(&context).await {
            Ok(log) => {
                self.record_success(&mut attempt, DeploymentStep::Build, &log.summary())
                    .await;
            }
            Err(err) => return self.fail(attempt, DeploymentStep::Build, &err).await,
        }

        let command = attempt.bot.start_command().argv(attempt.bot.runtime());
        match self
            .runtime
            .run_container(bot_id, &attempt.environment, &command)
            .await
        {
            Ok(info) => {
                self.record_success(&mut attempt, DeploymentStep::Relaunch, &info.summary())
                    .await;
            }
            Err(err) => return self.fail(attempt, DeploymentStep::Relaunch, &err).await,
        }

        self.finish(attempt, DeploymentStatus::Success).await
    }

    /// Reports the runtime status of a bot's container.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`] for unknown bots. An unavailable
    /// engine is reported as [`RuntimeStatus::Unknown`], not as an error.
    pub async fn query_status(&self, bot_id: BotId) -> DeploymentResult<RuntimeStatus> {
        self.find_bot_or_error(bot_id).await?;
        Ok(self.runtime.status(bot_id).await)
    }

    /// Returns the last `tail` lines of a bot's container log.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`] for unknown bots and
    /// [`DeploymentError::Runtime`] when the container never existed.
    pub async fn fetch_logs(&self, bot_id: BotId, tail: usize) -> DeploymentResult<String> {
        self.find_bot_or_error(bot_id).await?;
        Ok(self.runtime.fetch_logs(bot_id, tail).await?)
    }

    /// Lists a bot's deployment records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`] for unknown bots.
    pub async fn list_deployments(
        &self,
        bot_id: BotId,
        limit: Option<usize>,
    ) -> DeploymentResult<Vec<DeploymentRecord>> {
        self.find_bot_or_error(bot_id).await?;
        Ok(self.registry.list_deployments(bot_id, limit).await?)
    }

    async fn launch(&self, bot: &BotDefinition) -> DeploymentResult<RunInfo> {
        let environment = self.registry.load_environment(bot.id()).await?;
        let command = bot.start_command().argv(bot.runtime());
        Ok(self
            .runtime
            .run_container(bot.id(), &environment, &command)
            .await?)
    }

    /// Starts a bot's container from its current image without rebuilding.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`], [`DeploymentError::Conflict`],
    /// [`DeploymentError::RuntimeUnavailable`], or
    /// [`DeploymentError::Runtime`] when no image exists.
    #[instrument(skip(self), fields(bot_id = %bot_id))]
    pub async fn start_bot(&self, bot_id: BotId) -> DeploymentResult<RunInfo> {
        let bot = self.find_bot_or_error(bot_id).await?;
        let _guard = self.claim(bot_id)?;
        let info = self.launch(&bot).await?;
        info!(container_id = %info.container_id, "bot started");
        Ok(info)
    }

    /// Stops and removes a bot's container. A missing container is success.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::NotFound`], [`DeploymentError::Conflict`],
    /// [`DeploymentError::RuntimeUnavailable`], or
    /// [`DeploymentError::Runtime`].
    #[instrument(skip(self), fields(bot_id = %bot_id))]
    pub async fn stop_bot(&self, bot_id: BotId) -> DeploymentResult<()> {
        self.find_bot_or_error(bot_id).await?;
        let _guard = self.claim(bot_id)?;
        self.runtime.stop_container(bot_id).await?;
        info!("bot stopped");
        Ok(())
    }

    /// Stops a bot's container, then starts a new one from the current image.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_bot`].
    #[instrument(skip(self), fields(bot_id = %bot_id))]
    pub async fn restart_bot(&self, bot_id: BotId) -> DeploymentResult<RunInfo> {
        let bot = self.find_bot_or_error(bot_id).await?;
        let _guard = self.claim(bot_id)?;
        self.runtime.stop_container(bot_id).await?;
        let info = self.launch(&bot).await?;
        info!(container_id = %info.container_id, "bot restarted");
        Ok(info)
    }
}
