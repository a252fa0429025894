//! Domain model for bot definitions, environments, and deployment history.
//!
//! The registry domain owns bot identity and configuration plus the audit
//! trail of deployment attempts. Persistence and runtime concerns remain
//! outside this boundary.

mod bot;
mod deployment;
mod environment;
mod error;
mod ids;

pub use bot::{BotDefinition, BotRuntime, BotSettings, PersistedBotData, RemoteUrl, StartCommand};
pub use deployment::{DeploymentRecord, DeploymentStatus, PersistedDeploymentData};
pub use environment::{EnvironmentSet, EnvironmentVariable};
pub use error::{ParseDeploymentStatusError, RegistryDomainError};
pub use ids::{BotId, BotName, DeploymentId};
