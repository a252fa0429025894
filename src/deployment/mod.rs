//! Deployment orchestration for bots.
//!
//! The orchestrator ties the registry, the source fetcher, and the container
//! runtime together:
//!
//! - Transcript and per-bot exclusion types in [`domain`]
//! - The orchestrator service in [`services`]
//!
//! Each attempt runs `fetch` (or archive expansion), `build`, and `relaunch`
//! in order and always ends in one terminal record write.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
