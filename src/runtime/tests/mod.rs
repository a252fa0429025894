//! Unit tests for the container runtime.
