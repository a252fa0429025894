//! Port contracts for bot registry persistence.

mod repository;

pub use repository::{BotRegistry, BotRegistryError, BotRegistryResult};
