//! Docker CLI adapter for the container runtime port.

use super::{RuntimeConnection, descriptor::ensure_descriptor};
use crate::registry::domain::{BotId, EnvironmentSet};
use crate::runtime::{
    domain::{
        BuildContext, BuildLog, RunInfo, RuntimeStatus, candidate_image_name, container_name,
        image_name,
    },
    ports::{
        BuildError, ContainerRuntime, LogError, RunError, RuntimeResult, StopError,
    },
};
use async_trait::async_trait;
use camino::Utf8Path;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const SHORT_ID_LENGTH: usize = 12;

/// Tunables for the Docker adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerRuntimeOptions {
    /// Path or name of the `docker` executable.
    pub docker_binary: String,
    /// Grace period given to a container before it is killed.
    pub stop_grace: Duration,
    /// Deadline for `docker build`.
    pub build_timeout: Duration,
    /// Deadline for every other engine command.
    pub command_timeout: Duration,
    /// Network mode for bot containers.
    pub network_mode: String,
    /// Restart policy for bot containers.
    pub restart_policy: String,
}

impl Default for DockerRuntimeOptions {
    fn default() -> Self {
        Self {
            docker_binary: String::from("docker"),
            stop_grace: Duration::from_secs(10),
            build_timeout: Duration::from_secs(600),
            command_timeout: Duration::from_secs(60),
            network_mode: String::from("bridge"),
            restart_policy: String::from("always"),
        }
    }
}

#[derive(Debug, Error)]
enum EngineCallError {
    #[error("cannot execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine command timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
struct EngineOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl EngineOutput {
    fn combined(&self) -> String {
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Container runtime backed by the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerContainerRuntime {
    connection: RuntimeConnection,
    options: DockerRuntimeOptions,
}

impl DockerContainerRuntime {
    /// Creates an adapter over an already established engine connection.
    #[must_use]
    pub const fn new(connection: RuntimeConnection, options: DockerRuntimeOptions) -> Self {
        Self {
            connection,
            options,
        }
    }

    async fn engine(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<EngineOutput, EngineCallError> {
        debug!(binary = %self.options.docker_binary, ?args, "running engine command");
        let mut command = Command::new(&self.options.docker_binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| EngineCallError::Timeout(timeout))?
            .map_err(|source| EngineCallError::Spawn {
                binary: self.options.docker_binary.clone(),
                source,
            })?;

        Ok(EngineOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn remove_container(&self, name: &str) -> Result<(), StopError> {
        let grace = self.options.stop_grace.as_secs().to_string();
        let stop_timeout = self.options.stop_grace + self.options.command_timeout;
        let stopped = self
            .engine(&["stop", "-t", &grace, name], stop_timeout)
            .await
            .map_err(|err| StopError::RuntimeRejected(err.to_string()))?;
        if !stopped.success && !is_missing_object(&stopped.stderr) {
            return Err(StopError::RuntimeRejected(stopped.stderr.trim().to_owned()));
        }

        let removed = self
            .engine(
                &["rm", "-f", name],
                self.options.command_timeout,
            )
            .await
            .map_err(|err| StopError::RuntimeRejected(err.to_string()))?;
        if !removed.success && !is_missing_object(&removed.stderr) {
            return Err(StopError::RuntimeRejected(removed.stderr.trim().to_owned()));
        }
        Ok(())
    }

    async fn discard_image(&self, image: &str) {
        let result = self
            .engine(
                &["rmi", image],
                self.options.command_timeout,
            )
            .await;
        match result {
            Ok(output) if output.success || is_missing_object(&output.stderr) => {}
            Ok(output) => warn!(%image, stderr = %output.stderr.trim(), "failed to remove candidate image"),
            Err(err) => warn!(%image, error = %err, "failed to remove candidate image"),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerContainerRuntime {
    fn is_available(&self) -> bool {
        self.connection.is_available()
    }

    async fn status(&self, bot_id: BotId) -> RuntimeStatus {
        if !self.connection.is_available() {
            return RuntimeStatus::Unknown;
        }

        let name = container_name(bot_id);
        let result = self
            .engine(
                &["inspect", "--format", "{{.State.Status}}", &name],
                self.options.command_timeout,
            )
            .await;
        match result {
            Ok(output) if output.success => RuntimeStatus::from_engine_state(&output.stdout),
            Ok(output) if is_missing_object(&output.stderr) => {
                RuntimeStatus::Stopped { reason: None }
            }
            Ok(output) => RuntimeStatus::Error {
                detail: output.stderr.trim().to_owned(),
            },
            Err(err) => RuntimeStatus::Error {
                detail: err.to_string(),
            },
        }
    }

    #[instrument(skip(self, context), fields(bot_id = %context.bot_id, source_path = %context.source_path))]
    async fn build_image(&self, context: &BuildContext) -> RuntimeResult<BuildLog> {
        self.connection.ensure_available()?;
        let descriptor_synthesized = ensure_descriptor(&context.source_path, context.runtime)?;

        let nonce = Uuid::new_v4().simple().to_string();
        let candidate = candidate_image_name(context.bot_id, &nonce);
        let target = image_name(context.bot_id);

        let built = self
            .engine(
                &[
                    "build",
                    "--rm",
                    "--force-rm",
                    "-t",
                    &candidate,
                    context.source_path.as_str(),
                ],
                self.options.build_timeout,
            )
            .await
            .map_err(|err| match err {
                EngineCallError::Timeout(deadline) => BuildError::Timeout(deadline),
                EngineCallError::Spawn { .. } => BuildError::BuildStepFailed(err.to_string()),
            })?;
        if !built.success {
            self.discard_image(&candidate).await;
            return Err(BuildError::BuildStepFailed(built.combined()).into());
        }

        let tagged = self
            .engine(
                &["tag", &candidate, &target],
                self.options.command_timeout,
            )
            .await
            .map_err(|err| BuildError::BuildStepFailed(err.to_string()))?;
        self.discard_image(&candidate).await;
        if !tagged.success {
            return Err(BuildError::BuildStepFailed(tagged.stderr.trim().to_owned()).into());
        }

        info!(image = %target, descriptor_synthesized, "image built");
        Ok(BuildLog {
            image_name: target,
            descriptor_synthesized,
            output: built.combined(),
        })
    }

    #[instrument(skip(self, environment, command), fields(bot_id = %bot_id))]
    async fn run_container(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
        command: &[String],
    ) -> RuntimeResult<RunInfo> {
        self.connection.ensure_available()?;
        let name = container_name(bot_id);
        let image = image_name(bot_id);

        let env_file = stage_env_file(environment).await?;
        let env_file_path = env_file
            .as_ref()
            .map(|file| {
                Utf8Path::from_path(file.path()).ok_or_else(|| {
                    RunError::RuntimeRejected(format!(
                        "env file path {} is not UTF-8",
                        file.path().display()
                    ))
                })
            })
            .transpose()?;

        self.remove_container(&name)
            .await
            .map_err(|err| RunError::RuntimeRejected(err.to_string()))?;

        let mut args: Vec<&str> = vec![
            "run",
            "-d",
            "--name",
            &name,
            "--restart",
            &self.options.restart_policy,
            "--network",
            &self.options.network_mode,
        ];
        if let Some(path) = env_file_path {
            args.push("--env-file");
            args.push(path.as_str());
        }
        args.push(&image);
        args.extend(command.iter().map(String::as_str));

        let output = self
            .engine(&args, self.options.command_timeout)
            .await
            .map_err(|err| RunError::RuntimeRejected(err.to_string()))?;
        if !output.success {
            return Err(classify_run_failure(&output.stderr).into());
        }

        let container_id: String = output.stdout.trim().chars().take(SHORT_ID_LENGTH).collect();
        info!(container = %name, %container_id, "container started");
        Ok(RunInfo {
            container_name: name,
            container_id,
        })
    }

    #[instrument(skip(self), fields(bot_id = %bot_id))]
    async fn stop_container(&self, bot_id: BotId) -> RuntimeResult<()> {
        self.connection.ensure_available()?;
        self.remove_container(&container_name(bot_id)).await?;
        Ok(())
    }

    async fn fetch_logs(&self, bot_id: BotId, tail: usize) -> RuntimeResult<String> {
        self.connection.ensure_available()?;
        let name = container_name(bot_id);
        let tail_lines = tail.to_string();

        let output = self
            .engine(
                &["logs", "--tail", &tail_lines, "--timestamps", &name],
                self.options.command_timeout,
            )
            .await
            .map_err(|err| LogError::Failed(err.to_string()))?;
        if output.success {
            return Ok(output.combined());
        }
        if is_missing_object(&output.stderr) {
            return Err(LogError::ContainerNotFound(name).into());
        }
        Err(LogError::Failed(output.stderr.trim().to_owned()).into())
    }
}

/// Writes `environment` as `KEY=VALUE` lines to a file only its owner can
/// read.
///
/// Values travel to the engine through this file so that neither argv nor
/// the client's own environment carries them.
pub(crate) fn write_env_file(environment: &EnvironmentSet) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("botyard-env-").tempfile()?;
    for variable in environment.variables() {
        writeln!(file, "{}={}", variable.key(), variable.value())?;
    }
    file.flush()?;
    Ok(file)
}

async fn stage_env_file(environment: &EnvironmentSet) -> Result<Option<NamedTempFile>, RunError> {
    if environment.is_empty() {
        return Ok(None);
    }
    let owned = environment.clone();
    let file = tokio::task::spawn_blocking(move || write_env_file(&owned))
        .await
        .map_err(|err| RunError::RuntimeRejected(format!("env file task failed: {err}")))?
        .map_err(|err| RunError::RuntimeRejected(format!("cannot write env file: {err}")))?;
    Ok(Some(file))
}

/// Returns whether engine diagnostics report a missing container or image.
pub(crate) fn is_missing_object(stderr: &str) -> bool {
    stderr.contains("No such container")
        || stderr.contains("No such object")
        || stderr.contains("No such image")
}

/// Maps `docker run` diagnostics to a typed launch failure.
pub(crate) fn classify_run_failure(stderr: &str) -> RunError {
    let detail = stderr.trim().to_owned();
    if detail.contains("No such image") || detail.contains("Unable to find image") {
        RunError::ImageMissing(detail)
    } else if detail.contains("port is already allocated") || detail.contains("already in use") {
        RunError::PortOrResourceConflict(detail)
    } else {
        RunError::RuntimeRejected(detail)
    }
}
