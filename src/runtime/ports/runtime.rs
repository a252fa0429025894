//! Container runtime port for building, launching, and inspecting bots.

use crate::registry::domain::{BotId, EnvironmentSet};
use crate::runtime::domain::{BuildContext, BuildLog, DescriptorError, RunInfo, RuntimeStatus};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for container runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Control contract for the container engine hosting bots.
///
/// Every operation addresses the container and image through names derived
/// from the bot identifier; adapters keep no per-bot state of their own.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns whether the engine connection was established.
    fn is_available(&self) -> bool;

    /// Reports the container status.
    ///
    /// Returns [`RuntimeStatus::Unknown`] only when the engine is
    /// unavailable. A missing container is reported as stopped.
    async fn status(&self, bot_id: BotId) -> RuntimeStatus;

    /// Builds and tags the bot image from its source directory,
    /// synthesizing a default descriptor when none exists.
    ///
    /// A failed build leaves the previously tagged image in place.
    async fn build_image(&self, context: &BuildContext) -> RuntimeResult<BuildLog>;

    /// Replaces any existing container and starts a new one from the
    /// latest image.
    async fn run_container(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
        command: &[String],
    ) -> RuntimeResult<RunInfo>;

    /// Stops and removes the container. A missing container is success.
    async fn stop_container(&self, bot_id: BotId) -> RuntimeResult<()>;

    /// Returns the last `tail` log lines with timestamps.
    async fn fetch_logs(&self, bot_id: BotId, tail: usize) -> RuntimeResult<String>;
}

/// Image build failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The descriptor is malformed; no engine call was made.
    #[error("invalid Dockerfile: {0}")]
    DescriptorInvalid(String),

    /// A build step failed or the source directory is unusable.
    #[error("build step failed: {0}")]
    BuildStepFailed(String),

    /// The build exceeded its deadline.
    #[error("build timed out after {0:?}")]
    Timeout(Duration),
}

impl From<DescriptorError> for BuildError {
    fn from(err: DescriptorError) -> Self {
        Self::DescriptorInvalid(err.to_string())
    }
}

/// Container launch failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    /// No image has been built for the bot.
    #[error("image not found: {0}")]
    ImageMissing(String),

    /// A port or other host resource is already taken.
    #[error("port or resource conflict: {0}")]
    PortOrResourceConflict(String),

    /// The engine refused to start the container.
    #[error("runtime rejected container: {0}")]
    RuntimeRejected(String),
}

/// Container stop failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StopError {
    /// The engine refused to stop or remove the container.
    #[error("failed to stop container: {0}")]
    RuntimeRejected(String),
}

/// Log retrieval failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogError {
    /// The container never existed.
    #[error("container {0} not found")]
    ContainerNotFound(String),

    /// The engine failed to return logs.
    #[error("failed to get logs: {0}")]
    Failed(String),
}

/// Errors returned by container runtime adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The engine connection is unavailable.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    /// Image build failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Container launch failed.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Container stop failed.
    #[error(transparent)]
    Stop(#[from] StopError),

    /// Log retrieval failed.
    #[error(transparent)]
    Logs(#[from] LogError),
}
