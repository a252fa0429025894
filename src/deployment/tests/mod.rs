//! Unit tests for deployment orchestration.
