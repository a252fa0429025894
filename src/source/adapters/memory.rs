//! In-memory source fetcher for tests.

use crate::registry::domain::RemoteUrl;
use crate::source::{
    domain::{FetchError, FetchKind, FetchLog},
    ports::{SourceFetcher, SourceFetcherResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    /// Remote that was fetched.
    pub remote: RemoteUrl,
    /// Working copy location.
    pub local_path: Utf8PathBuf,
    /// Operation performed.
    pub kind: FetchKind,
}

/// Source fetcher that materializes configured files instead of running git.
///
/// Each fetch writes the file set registered for the remote into the working
/// copy and marks it with a `.git` directory, so a second fetch of the same
/// location is reported as an update.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceFetcher {
    state: Arc<RwLock<InMemoryFetcherState>>,
}

#[derive(Debug, Default)]
struct InMemoryFetcherState {
    repositories: HashMap<String, Vec<(Utf8PathBuf, String)>>,
    calls: Vec<RecordedFetch>,
    next_failure: Option<FetchError>,
}

impl InMemorySourceFetcher {
    /// Creates a fetcher with no repositories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the files served for a remote, replacing earlier contents.
    pub fn set_repository<P, C>(&self, remote: &RemoteUrl, files: impl IntoIterator<Item = (P, C)>)
    where
        P: Into<Utf8PathBuf>,
        C: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(path, contents)| (path.into(), contents.into()))
            .collect();
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .repositories
            .insert(remote.as_str().to_owned(), files);
    }

    /// Makes the next fetch fail with `error`.
    pub fn fail_next_fetch(&self, error: FetchError) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .next_failure = Some(error);
    }

    /// Returns the fetches performed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedFetch> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .clone()
    }
}

fn materialize(local_path: &Utf8Path, files: &[(Utf8PathBuf, String)]) -> std::io::Result<()> {
    Dir::create_ambient_dir_all(local_path, ambient_authority())?;
    let dir = Dir::open_ambient_dir(local_path, ambient_authority())?;
    dir.create_dir_all(".git")?;
    for (path, contents) in files {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            dir.create_dir_all(parent)?;
        }
        dir.write(path, contents)?;
    }
    Ok(())
}

#[async_trait]
impl SourceFetcher for InMemorySourceFetcher {
    async fn fetch(
        &self,
        remote: &RemoteUrl,
        local_path: &Utf8Path,
    ) -> SourceFetcherResult<FetchLog> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(error) = state.next_failure.take() {
            return Err(error);
        }

        let kind = if local_path.join(".git").exists() {
            FetchKind::Update
        } else {
            FetchKind::Clone
        };
        let files = state
            .repositories
            .get(remote.as_str())
            .cloned()
            .ok_or_else(|| {
                FetchError::NotARepo(format!("repository '{remote}' not found"))
            })?;
        materialize(local_path, &files).map_err(|err| FetchError::Io(err.to_string()))?;

        state.calls.push(RecordedFetch {
            remote: remote.clone(),
            local_path: local_path.to_path_buf(),
            kind,
        });
        Ok(FetchLog {
            kind,
            output: format!("{} files from {remote}", files.len()),
        })
    }
}
