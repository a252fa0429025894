//! Port contracts for bringing bot sources onto the host.

mod fetcher;

pub use fetcher::{SourceFetcher, SourceFetcherResult};
