//! Deterministic container and image names derived from bot identifiers.
//!
//! Containers and images are never stored; every operation recomputes the
//! names from the bot identifier, so distinct bots never share a name.

use crate::registry::domain::BotId;

const NAME_PREFIX: &str = "bot_";
const LATEST_TAG: &str = "latest";

/// Returns the container name for a bot (`bot_<id>`).
#[must_use]
pub fn container_name(bot_id: BotId) -> String {
    format!("{NAME_PREFIX}{bot_id}")
}

/// Returns the image repository for a bot, without a tag.
#[must_use]
pub fn image_repository(bot_id: BotId) -> String {
    format!("{NAME_PREFIX}{bot_id}")
}

/// Returns the deployable image name for a bot (`bot_<id>:latest`).
#[must_use]
pub fn image_name(bot_id: BotId) -> String {
    format!("{}:{LATEST_TAG}", image_repository(bot_id))
}

/// Returns a build-candidate image name that is retagged to
/// [`image_name`] only after a successful build.
#[must_use]
pub fn candidate_image_name(bot_id: BotId, nonce: &str) -> String {
    format!("{}:candidate-{nonce}", image_repository(bot_id))
}

/// Runtime-facing names of one bot, recomputed on every use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    container_name: String,
    image_name: String,
}

impl ContainerHandle {
    /// Derives the handle for a bot.
    #[must_use]
    pub fn for_bot(bot_id: BotId) -> Self {
        Self {
            container_name: container_name(bot_id),
            image_name: image_name(bot_id),
        }
    }

    /// Returns the container name.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Returns the deployable image name.
    #[must_use]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }
}
