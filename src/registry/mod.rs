//! Bot definitions, environments, and deployment history.
//!
//! The registry is the system of record for what a bot is and what happened
//! to it. It follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The persistence port in [`ports`]
//! - In-memory and `PostgreSQL` adapters in [`adapters`]
//! - The catalogue service in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
