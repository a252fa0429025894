//! Shared helpers for `PostgreSQL` registry tests.

use botyard::registry::{
    adapters::postgres::{BotRegistryPgPool, PostgresBotRegistry},
    domain::{BotDefinition, BotName, BotSettings},
};
use camino::Utf8Path;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;

/// Boxed error type used by the setup helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema applied to the template database.
const CREATE_REGISTRY_SQL: &str =
    include_str!("../../migrations/2026-10-19-000000_create_bot_registry/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "botyard_test_template";

/// Creates a tokio runtime for driving the async registry from sync tests.
///
/// # Panics
///
/// Panics when the runtime cannot be built.
#[must_use]
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the registry schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_REGISTRY_SQL)
                .map_err(|e| eyre::eyre!("registry schema: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Drops a per-test database when it goes out of scope.
///
/// Declare the guard before the registry so the pool closes first.
pub struct CleanupGuard {
    cluster: &'static TestCluster,
    db_name: String,
}

impl CleanupGuard {
    /// Clones the template into a fresh database named after `label`.
    ///
    /// # Errors
    ///
    /// Returns an error when the template cannot be prepared or cloned.
    pub fn create(cluster: &'static TestCluster, label: &str) -> Result<Self, BoxError> {
        ensure_template(cluster)?;
        let db_name = format!("{label}_{}", uuid::Uuid::new_v4().simple());
        cluster
            .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
            .map_err(|e| Box::new(e) as BoxError)?;
        Ok(Self { cluster, db_name })
    }

    /// Opens a registry on the guarded database.
    ///
    /// # Errors
    ///
    /// Returns an error when the pool cannot be built.
    pub fn registry(&self) -> Result<PostgresBotRegistry, BoxError> {
        let url = self.cluster.connection().database_url(&self.db_name);
        let manager = ConnectionManager::<PgConnection>::new(url);
        // A single connection keeps statement ordering deterministic.
        let pool: BotRegistryPgPool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| Box::new(e) as BoxError)?;
        Ok(PostgresBotRegistry::new(pool))
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(err) = self.cluster.drop_database(self.db_name.as_str()) {
            tracing::warn!(database = %self.db_name, error = %err, "failed to drop test database");
        }
    }
}

/// Builds a bot definition rooted under `/srv/bots`.
///
/// # Panics
///
/// Panics when `name` is not a valid bot name.
#[must_use]
pub fn bot(name: &str) -> BotDefinition {
    BotDefinition::new(
        BotName::new(name).expect("valid name"),
        BotSettings::default(),
        Utf8Path::new("/srv/bots"),
        &DefaultClock,
    )
}
