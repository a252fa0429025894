//! Unit tests for source fetching and archive expansion.
