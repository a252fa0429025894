//! Shared test helpers for in-memory deployment integration tests.

use std::io::Write;
use std::sync::Arc;

use botyard::deployment::services::DeploymentOrchestrator;
use botyard::registry::{
    adapters::memory::InMemoryBotRegistry,
    domain::{BotDefinition, RemoteUrl},
    services::{BotCatalogService, CreateBotRequest},
};
use botyard::runtime::adapters::InMemoryContainerRuntime;
use botyard::source::{adapters::InMemorySourceFetcher, ports::SourceFetcher};
use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use rstest::fixture;
use tempfile::TempDir;
use zip::{ZipWriter, write::SimpleFileOptions};

/// Remote used by the `alpha` bot.
pub const ALPHA_REMOTE: &str = "https://example.com/alpha.git";

/// Catalogue service type used by the helpers.
pub type TestCatalog = BotCatalogService<InMemoryBotRegistry, DefaultClock>;

/// Orchestrator type over in-memory adapters and a chosen fetcher.
pub type TestOrchestrator<F> =
    DeploymentOrchestrator<InMemoryBotRegistry, InMemoryContainerRuntime, F, DefaultClock>;

/// In-memory platform rooted in a temporary code directory.
pub struct Platform<F: SourceFetcher> {
    _temp: TempDir,
    pub code_root: Utf8PathBuf,
    pub registry: Arc<InMemoryBotRegistry>,
    pub runtime: Arc<InMemoryContainerRuntime>,
    pub fetcher: Arc<F>,
    pub catalog: TestCatalog,
    pub orchestrator: Arc<TestOrchestrator<F>>,
}

impl<F: SourceFetcher> Platform<F> {
    /// Builds a platform around `fetcher`.
    ///
    /// # Panics
    ///
    /// Panics when the temporary code root cannot be created.
    #[must_use]
    pub fn with_fetcher(fetcher: F) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let code_root = Utf8Path::from_path(temp.path())
            .expect("utf-8 temp path")
            .join("code");
        let registry = Arc::new(InMemoryBotRegistry::new());
        let runtime = Arc::new(InMemoryContainerRuntime::new());
        let fetcher = Arc::new(fetcher);
        let clock = Arc::new(DefaultClock);
        let catalog = BotCatalogService::new(
            Arc::clone(&registry),
            Arc::clone(&clock),
            code_root.clone(),
        );
        let orchestrator = Arc::new(DeploymentOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&runtime),
            Arc::clone(&fetcher),
            clock,
        ));
        Self {
            _temp: temp,
            code_root,
            registry,
            runtime,
            fetcher,
            catalog,
            orchestrator,
        }
    }

    /// Registers a bot with a remote.
    ///
    /// # Panics
    ///
    /// Panics when the catalogue rejects the bot.
    pub async fn bot_with_remote(&self, name: &str, remote: &str) -> BotDefinition {
        self.catalog
            .create_bot(
                CreateBotRequest::new(name)
                    .with_repo_url(remote)
                    .with_start_command("python bot.py"),
            )
            .await
            .expect("bot created")
    }

    /// Registers an upload-only bot.
    ///
    /// # Panics
    ///
    /// Panics when the catalogue rejects the bot.
    pub async fn upload_bot(&self, name: &str) -> BotDefinition {
        self.catalog
            .create_bot(CreateBotRequest::new(name))
            .await
            .expect("bot created")
    }
}

/// Provides a platform whose fetcher serves `alpha` and `gamma`.
#[fixture]
pub fn platform() -> Platform<InMemorySourceFetcher> {
    let fetcher = InMemorySourceFetcher::new();
    for (remote, body) in [
        (ALPHA_REMOTE, "print('alpha')\n"),
        ("https://example.com/gamma.git", "print('gamma')\n"),
    ] {
        let remote = RemoteUrl::new(remote).expect("valid remote");
        fetcher.set_repository(&remote, [("bot.py", body)]);
    }
    Platform::with_fetcher(fetcher)
}

/// Builds a ZIP archive in memory.
///
/// # Panics
///
/// Panics when the archive cannot be written.
#[must_use]
pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(contents.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Returns the step labels of a transcript, in order.
#[must_use]
pub fn step_labels(transcript: &[String]) -> Vec<&str> {
    transcript
        .iter()
        .filter_map(|chunk| {
            chunk
                .strip_prefix('[')
                .and_then(|rest| rest.split_once(']'))
                .map(|(label, _)| label)
        })
        .collect()
}
