//! Domain types for source fetches and archive uploads.

mod archive;
mod fetch;

pub use archive::{ArchiveError, ArchiveSummary};
pub use fetch::{FetchError, FetchKind, FetchLog};
