//! Adapter implementations for source fetching and archive expansion.

mod archive;
pub mod git;
pub mod memory;

pub use archive::ZipArchiveExpander;
pub use git::{GitFetchOptions, GitSourceFetcher};
pub use memory::{InMemorySourceFetcher, RecordedFetch};
