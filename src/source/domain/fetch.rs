//! Outcome and failure types for source fetches.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which git operation a fetch performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// A fresh clone into an empty location.
    Clone,
    /// A fast-forward update of an existing working copy.
    Update,
}

impl FetchKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLog {
    /// Operation performed.
    pub kind: FetchKind,
    /// Tool output.
    pub output: String,
}

impl FetchLog {
    /// Renders the log as one transcript chunk.
    #[must_use]
    pub fn summary(&self) -> String {
        let headline = match self.kind {
            FetchKind::Clone => "Successfully cloned repository",
            FetchKind::Update => "Successfully pulled latest changes",
        };
        let output = self.output.trim();
        if output.is_empty() {
            headline.to_owned()
        } else {
            format!("{headline}:\n{output}")
        }
    }
}

/// Source fetch failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The git command exceeded its deadline.
    #[error("git {kind} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out.
        kind: FetchKind,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The remote rejected the credentials.
    #[error("git authentication failed: {0}")]
    AuthFailure(String),

    /// The remote could not be reached.
    #[error("git network failure: {0}")]
    NetworkFailure(String),

    /// The remote or the working copy is not a git repository.
    #[error("not a git repository: {0}")]
    NotARepo(String),

    /// Git failed for another reason, such as a non-fast-forward update.
    #[error("git {kind} failed: {detail}")]
    CommandFailed {
        /// Operation that failed.
        kind: FetchKind,
        /// Git diagnostics.
        detail: String,
    },

    /// A local filesystem operation failed.
    #[error("source directory error: {0}")]
    Io(String),
}

impl FetchError {
    /// Classifies git diagnostics into a fetch failure.
    #[must_use]
    pub fn from_git_stderr(kind: FetchKind, stderr: &str) -> Self {
        let detail = stderr.trim().to_owned();
        let lowered = detail.to_ascii_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

        if mentions(&[
            "authentication failed",
            "could not read username",
            "could not read password",
            "permission denied (publickey",
            "terminal prompts disabled",
            "host key verification failed",
        ]) {
            Self::AuthFailure(detail)
        } else if mentions(&[
            "could not resolve host",
            "connection refused",
            "connection timed out",
            "network is unreachable",
            "failed to connect",
            "unable to access",
        ]) {
            Self::NetworkFailure(detail)
        } else if mentions(&[
            "not a git repository",
            "does not appear to be a git repository",
            "repository not found",
            "does not exist",
        ]) {
            Self::NotARepo(detail)
        } else {
            Self::CommandFailed { kind, detail }
        }
    }
}
