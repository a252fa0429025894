//! Source fetcher port.

use crate::registry::domain::RemoteUrl;
use crate::source::domain::{FetchError, FetchLog};
use async_trait::async_trait;
use camino::Utf8Path;

/// Result type for source fetches.
pub type SourceFetcherResult<T> = Result<T, FetchError>;

/// Brings a bot's working copy up to date with its remote.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Clones `remote` into `local_path`, or fast-forwards the existing
    /// working copy when `local_path/.git` exists.
    ///
    /// The working tree is the only side effect.
    async fn fetch(&self, remote: &RemoteUrl, local_path: &Utf8Path)
    -> SourceFetcherResult<FetchLog>;
}
