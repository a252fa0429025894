//! In-memory container runtime for tests and dry runs.

use super::descriptor::ensure_descriptor;
use crate::registry::domain::{BotId, EnvironmentSet};
use crate::runtime::{
    domain::{BuildContext, BuildLog, RunInfo, RuntimeStatus, container_name, image_name},
    ports::{BuildError, ContainerRuntime, LogError, RunError, RuntimeError, RuntimeResult},
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Snapshot of a simulated container, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedContainer {
    /// Engine-style short identifier.
    pub container_id: String,
    /// Whether the container is running.
    pub running: bool,
    /// Environment the container was started with.
    pub environment: EnvironmentSet,
    /// Command the container was started with.
    pub command: Vec<String>,
    /// Image build generation the container runs.
    pub image_generation: u64,
}

/// In-memory container runtime.
///
/// Images and containers are simulated, but descriptor preparation runs
/// against the real source directory exactly as the Docker adapter does.
/// Failures can be injected to exercise orchestration error paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContainerRuntime {
    state: Arc<RwLock<InMemoryRuntimeState>>,
}

#[derive(Debug, Default)]
struct InMemoryRuntimeState {
    unavailable_reason: Option<String>,
    images: HashMap<BotId, u64>,
    containers: HashMap<BotId, SimulatedContainer>,
    logs: HashMap<BotId, Vec<String>>,
    next_build_failure: Option<BuildError>,
    next_run_failure: Option<RunError>,
    build_count: u64,
    run_count: u64,
}

impl InMemoryContainerRuntime {
    /// Creates an available runtime with no images or containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime whose engine connection failed.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let runtime = Self::new();
        runtime.set_unavailable(reason);
        runtime
    }

    fn read_state(&self) -> RwLockReadGuard<'_, InMemoryRuntimeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, InMemoryRuntimeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates a lost engine connection.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        self.write_state().unavailable_reason = Some(reason.into());
    }

    /// Restores the engine connection.
    pub fn set_available(&self) {
        self.write_state().unavailable_reason = None;
    }

    /// Makes the next image build fail with `error`.
    pub fn fail_next_build(&self, error: BuildError) {
        self.write_state().next_build_failure = Some(error);
    }

    /// Makes the next container launch fail with `error`.
    pub fn fail_next_run(&self, error: RunError) {
        self.write_state().next_run_failure = Some(error);
    }

    /// Marks a bot's container as exited while keeping it in place.
    pub fn mark_exited(&self, bot_id: BotId) {
        if let Some(container) = self.write_state().containers.get_mut(&bot_id) {
            container.running = false;
        }
    }

    /// Appends a line to a bot's container log.
    pub fn push_log_line(&self, bot_id: BotId, line: impl AsRef<str>) {
        let mut state = self.write_state();
        if state.containers.contains_key(&bot_id) {
            state
                .logs
                .entry(bot_id)
                .or_default()
                .push(timestamped(line.as_ref()));
        }
    }

    /// Returns the image build generation tagged for a bot.
    #[must_use]
    pub fn image_generation(&self, bot_id: BotId) -> Option<u64> {
        self.read_state().images.get(&bot_id).copied()
    }

    /// Returns the current container of a bot.
    #[must_use]
    pub fn container(&self, bot_id: BotId) -> Option<SimulatedContainer> {
        self.read_state().containers.get(&bot_id).cloned()
    }

    fn ensure_available(&self) -> RuntimeResult<()> {
        match &self.read_state().unavailable_reason {
            Some(reason) => Err(RuntimeError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn timestamped(line: &str) -> String {
    format!(
        "{} {line}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

#[async_trait]
impl ContainerRuntime for InMemoryContainerRuntime {
    fn is_available(&self) -> bool {
        self.read_state().unavailable_reason.is_none()
    }

    async fn status(&self, bot_id: BotId) -> RuntimeStatus {
        let state = self.read_state();
        if state.unavailable_reason.is_some() {
            return RuntimeStatus::Unknown;
        }
        match state.containers.get(&bot_id) {
            Some(container) if container.running => RuntimeStatus::Running,
            Some(_) => RuntimeStatus::Stopped {
                reason: Some(String::from("exited")),
            },
            None => RuntimeStatus::Stopped { reason: None },
        }
    }

    async fn build_image(&self, context: &BuildContext) -> RuntimeResult<BuildLog> {
        self.ensure_available()?;
        let descriptor_synthesized = ensure_descriptor(&context.source_path, context.runtime)?;

        let mut state = self.write_state();
        if let Some(error) = state.next_build_failure.take() {
            return Err(error.into());
        }
        state.build_count += 1;
        let generation = state.build_count;
        state.images.insert(context.bot_id, generation);

        Ok(BuildLog {
            image_name: image_name(context.bot_id),
            descriptor_synthesized,
            output: format!("Successfully built generation {generation}"),
        })
    }

    async fn run_container(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
        command: &[String],
    ) -> RuntimeResult<RunInfo> {
        self.ensure_available()?;
        let mut state = self.write_state();
        if let Some(error) = state.next_run_failure.take() {
            return Err(error.into());
        }
        let Some(&image_generation) = state.images.get(&bot_id) else {
            return Err(RunError::ImageMissing(image_name(bot_id)).into());
        };

        state.run_count += 1;
        let container_id = format!("{:012x}", state.run_count);
        state.containers.insert(
            bot_id,
            SimulatedContainer {
                container_id: container_id.clone(),
                running: true,
                environment: environment.clone(),
                command: command.to_vec(),
                image_generation,
            },
        );
        state
            .logs
            .insert(bot_id, vec![timestamped(&format!("started {}", command.join(" ")))]);

        Ok(RunInfo {
            container_name: container_name(bot_id),
            container_id,
        })
    }

    async fn stop_container(&self, bot_id: BotId) -> RuntimeResult<()> {
        self.ensure_available()?;
        let mut state = self.write_state();
        state.containers.remove(&bot_id);
        state.logs.remove(&bot_id);
        Ok(())
    }

    async fn fetch_logs(&self, bot_id: BotId, tail: usize) -> RuntimeResult<String> {
        self.ensure_available()?;
        let state = self.read_state();
        let lines = state
            .logs
            .get(&bot_id)
            .ok_or_else(|| LogError::ContainerNotFound(container_name(bot_id)))?;
        let skip = lines.len().saturating_sub(tail);
        Ok(lines
            .iter()
            .skip(skip)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
