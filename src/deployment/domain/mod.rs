//! Domain types for deployment sequencing.

mod in_flight;
mod transcript;

pub use in_flight::{InFlightDeployments, InFlightGuard};
pub use transcript::{DeploymentStep, TranscriptBuilder};
