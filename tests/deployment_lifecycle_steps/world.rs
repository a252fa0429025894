//! Shared world state for deployment lifecycle BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use botyard::deployment::services::{DeploymentError, DeploymentOrchestrator};
use botyard::registry::{
    adapters::memory::InMemoryBotRegistry,
    domain::{BotDefinition, DeploymentRecord},
    services::BotCatalogService,
};
use botyard::runtime::adapters::InMemoryContainerRuntime;
use botyard::source::adapters::InMemorySourceFetcher;
use camino::Utf8Path;
use mockable::DefaultClock;
use rstest::fixture;
use tempfile::TempDir;

/// Orchestrator type used by the BDD world.
pub type TestOrchestrator = DeploymentOrchestrator<
    InMemoryBotRegistry,
    InMemoryContainerRuntime,
    InMemorySourceFetcher,
    DefaultClock,
>;

/// Scenario world for deployment lifecycle behaviour tests.
pub struct DeploymentWorld {
    _temp: TempDir,
    pub runtime: Arc<InMemoryContainerRuntime>,
    pub fetcher: Arc<InMemorySourceFetcher>,
    pub catalog: BotCatalogService<InMemoryBotRegistry, DefaultClock>,
    pub orchestrator: TestOrchestrator,
    pub bots: HashMap<String, BotDefinition>,
    pub last_deploy: Option<Result<DeploymentRecord, DeploymentError>>,
}

impl DeploymentWorld {
    /// Creates a world over fresh in-memory adapters.
    ///
    /// # Panics
    ///
    /// Panics when the temporary code root cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let code_root = Utf8Path::from_path(temp.path())
            .expect("utf-8 temp path")
            .join("code");
        let registry = Arc::new(InMemoryBotRegistry::new());
        let runtime = Arc::new(InMemoryContainerRuntime::new());
        let fetcher = Arc::new(InMemorySourceFetcher::new());
        let clock = Arc::new(DefaultClock);
        let catalog = BotCatalogService::new(
            Arc::clone(&registry),
            Arc::clone(&clock),
            code_root,
        );
        let orchestrator = DeploymentOrchestrator::new(
            registry,
            Arc::clone(&runtime),
            Arc::clone(&fetcher),
            clock,
        );

        Self {
            _temp: temp,
            runtime,
            fetcher,
            catalog,
            orchestrator,
            bots: HashMap::new(),
            last_deploy: None,
        }
    }

    /// Looks up a bot registered earlier in the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no bot with `name` was registered.
    pub fn bot(&self, name: &str) -> Result<&BotDefinition, eyre::Report> {
        self.bots
            .get(name)
            .ok_or_else(|| eyre::eyre!("bot '{name}' was not registered in this scenario"))
    }
}

impl Default for DeploymentWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DeploymentWorld {
    DeploymentWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
