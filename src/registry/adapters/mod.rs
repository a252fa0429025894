//! Adapter implementations for the bot registry port.

pub mod memory;
pub mod postgres;
