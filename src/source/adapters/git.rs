//! Git command-line adapter for the source fetcher port.

use crate::registry::domain::RemoteUrl;
use crate::source::{
    domain::{FetchError, FetchKind, FetchLog},
    ports::{SourceFetcher, SourceFetcherResult},
};
use async_trait::async_trait;
use camino::Utf8Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Tunables for the git adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFetchOptions {
    /// Path or name of the `git` executable.
    pub git_binary: String,
    /// Deadline for a fresh clone.
    pub clone_timeout: Duration,
    /// Deadline for a fast-forward pull.
    pub update_timeout: Duration,
}

impl Default for GitFetchOptions {
    fn default() -> Self {
        Self {
            git_binary: String::from("git"),
            clone_timeout: Duration::from_secs(120),
            update_timeout: Duration::from_secs(60),
        }
    }
}

/// Source fetcher backed by the `git` command-line client.
#[derive(Debug, Clone, Default)]
pub struct GitSourceFetcher {
    options: GitFetchOptions,
}

impl GitSourceFetcher {
    /// Creates a fetcher with the given options.
    #[must_use]
    pub const fn new(options: GitFetchOptions) -> Self {
        Self { options }
    }

    async fn run_git(
        &self,
        kind: FetchKind,
        args: &[&str],
        timeout: Duration,
    ) -> SourceFetcherResult<String> {
        let mut command = Command::new(&self.options.git_binary);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?command, "running git");

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| FetchError::Timeout { kind, timeout })?
            .map_err(|err| {
                FetchError::Io(format!("cannot execute {}: {err}", self.options.git_binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::from_git_stderr(kind, &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok([stdout.trim(), stderr.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl SourceFetcher for GitSourceFetcher {
    #[instrument(skip(self, remote), fields(local_path = %local_path))]
    async fn fetch(
        &self,
        remote: &RemoteUrl,
        local_path: &Utf8Path,
    ) -> SourceFetcherResult<FetchLog> {
        let has_working_copy = tokio::fs::try_exists(local_path.join(".git"))
            .await
            .map_err(|err| FetchError::Io(err.to_string()))?;

        if has_working_copy {
            let output = self
                .run_git(
                    FetchKind::Update,
                    &["-C", local_path.as_str(), "pull", "--ff-only"],
                    self.options.update_timeout,
                )
                .await?;
            info!("working copy updated");
            return Ok(FetchLog {
                kind: FetchKind::Update,
                output,
            });
        }

        if let Some(parent) = local_path.parent().filter(|parent| !parent.as_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| FetchError::Io(format!("cannot create {parent}: {err}")))?;
        }

        let output = self
            .run_git(
                FetchKind::Clone,
                &["clone", remote.as_str(), local_path.as_str()],
                self.options.clone_timeout,
            )
            .await?;
        info!("repository cloned");
        Ok(FetchLog {
            kind: FetchKind::Clone,
            output,
        })
    }
}
