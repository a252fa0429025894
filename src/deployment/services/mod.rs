//! Deployment orchestration services.

mod orchestrator;

pub use orchestrator::{DeploymentError, DeploymentOrchestrator, DeploymentResult};
