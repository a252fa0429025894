//! Container runtime integration for bot images and containers.
//!
//! Bots are addressed by names derived from their identifiers; nothing about
//! a container is stored. The engine connection is checked once and injected
//! into the Docker adapter, so an unreachable engine is a value rather than
//! a recurring failure.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
