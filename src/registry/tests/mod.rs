//! Unit tests for the bot registry.
