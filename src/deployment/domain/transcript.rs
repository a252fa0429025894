//! Append-only transcript of one deployment attempt.

use std::fmt;

/// Stage of the deployment sequence that produced a transcript chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentStep {
    /// Clone or update from the bot's remote.
    Fetch,
    /// Replace the code directory with an uploaded archive.
    Upload,
    /// Build and tag the bot image.
    Build,
    /// Replace the running container.
    Relaunch,
}

impl DeploymentStep {
    /// Returns the transcript label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fetch => "FETCH",
            Self::Upload => "UPLOAD",
            Self::Build => "BUILD",
            Self::Relaunch => "RELAUNCH",
        }
    }

    const fn failure_headline(self) -> &'static str {
        match self {
            Self::Fetch => "Git operation failed",
            Self::Upload => "Upload extraction failed",
            Self::Build => "Build failed",
            Self::Relaunch => "Container start failed",
        }
    }
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Ordered transcript chunks held by the orchestrator for one attempt.
///
/// Every chunk is prefixed with the label of the step that produced it, so a
/// finalized transcript reads top to bottom in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuilder {
    chunks: Vec<String>,
}

impl TranscriptBuilder {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Records a completed step and returns the chunk.
    pub fn succeeded(&mut self, step: DeploymentStep, detail: &str) -> &str {
        self.push(format!("[{step}] {}", detail.trim()))
    }

    /// Records a failed step and returns the chunk.
    pub fn failed(&mut self, step: DeploymentStep, error: &dyn fmt::Display) -> &str {
        self.push(format!("[{step}] {}: {error}", step.failure_headline()))
    }

    fn push(&mut self, chunk: String) -> &str {
        self.chunks.push(chunk);
        self.chunks.last().map_or("", String::as_str)
    }

    /// Returns the chunks recorded so far.
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Returns whether any chunk was recorded for `step`.
    #[must_use]
    pub fn mentions(&self, step: DeploymentStep) -> bool {
        let prefix = format!("[{step}]");
        self.chunks.iter().any(|chunk| chunk.starts_with(&prefix))
    }

    /// Consumes the builder, yielding the chunks.
    #[must_use]
    pub fn into_chunks(self) -> Vec<String> {
        self.chunks
    }
}
