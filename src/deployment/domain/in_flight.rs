//! Per-bot exclusion for deployments and lifecycle calls.

use crate::registry::domain::BotId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of bots with an operation in progress.
///
/// A bot's code directory, container name, and image tag are shared
/// resources; at most one guard per bot exists at a time.
#[derive(Debug, Clone, Default)]
pub struct InFlightDeployments {
    bots: Arc<Mutex<HashSet<BotId>>>,
}

impl InFlightDeployments {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<BotId>> {
        self.bots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `bot_id`, or returns `None` when it is already claimed.
    #[must_use]
    pub fn try_acquire(&self, bot_id: BotId) -> Option<InFlightGuard> {
        self.lock().insert(bot_id).then(|| InFlightGuard {
            bots: Arc::clone(&self.bots),
            bot_id,
        })
    }

    /// Returns whether `bot_id` is currently claimed.
    #[must_use]
    pub fn contains(&self, bot_id: BotId) -> bool {
        self.lock().contains(&bot_id)
    }
}

/// Claim on one bot, released on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    bots: Arc<Mutex<HashSet<BotId>>>,
    bot_id: BotId,
}

impl InFlightGuard {
    /// Returns the claimed bot.
    #[must_use]
    pub const fn bot_id(&self) -> BotId {
        self.bot_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.bots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.bot_id);
    }
}
