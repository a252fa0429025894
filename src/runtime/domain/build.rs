//! Inputs and outputs of image builds and container launches.

use crate::registry::domain::{BotId, BotRuntime};
use camino::Utf8PathBuf;

/// Everything a runtime needs to build a bot image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Bot whose image is built.
    pub bot_id: BotId,
    /// Directory holding the bot sources and descriptor.
    pub source_path: Utf8PathBuf,
    /// Runtime used when a descriptor has to be synthesized.
    pub runtime: BotRuntime,
}

impl BuildContext {
    /// Creates a build context.
    #[must_use]
    pub fn new(bot_id: BotId, source_path: impl Into<Utf8PathBuf>, runtime: BotRuntime) -> Self {
        Self {
            bot_id,
            source_path: source_path.into(),
            runtime,
        }
    }
}

/// Outcome of a successful image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLog {
    /// Deployable image name.
    pub image_name: String,
    /// Whether the build descriptor was generated for this build.
    pub descriptor_synthesized: bool,
    /// Engine build output.
    pub output: String,
}

impl BuildLog {
    /// Renders the log as one transcript chunk.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!("Image built successfully: {}", self.image_name);
        if self.descriptor_synthesized {
            summary.push_str("\nGenerated default Dockerfile");
        }
        let output = self.output.trim();
        if !output.is_empty() {
            summary.push('\n');
            summary.push_str(output);
        }
        summary
    }
}

/// Outcome of a successful container launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    /// Container name.
    pub container_name: String,
    /// Engine-assigned container identifier, shortened.
    pub container_id: String,
}

impl RunInfo {
    /// Renders the launch as one transcript chunk.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Container {} started successfully (ID: {})",
            self.container_name, self.container_id
        )
    }
}
