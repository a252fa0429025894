//! Runs one deployment or lifecycle operation against a registered bot.
//!
//! Usage:
//!
//! ```text
//! botyard <operation> <config-path> <bot-name> [archive-or-tail]
//! ```
//!
//! The `operation` must be `deploy`, `upload`, `status`, `logs`, `start`,
//! `stop`, `restart`, or `history`. `upload` takes the path of a ZIP archive
//! and `logs` an optional line count. The JSON file at `config-path` is a
//! `PlatformConfig`; every field is optional and `BOTYARD_*` environment
//! variables override it, with `__` between nested keys (for example
//! `BOTYARD_DATABASE__URL`):
//!
//! ```json
//! {
//!   "code_root": "/srv/bots",
//!   "database": { "url": "postgres://localhost/botyard" },
//!   "runtime": { "build_timeout_secs": 600 },
//!   "logging": { "filter": "botyard=info", "json": false }
//! }
//! ```

use botyard::config::{ConfigError, PlatformConfig};
use botyard::deployment::services::{DeploymentError, DeploymentOrchestrator};
use botyard::registry::{
    adapters::postgres::PostgresBotRegistry,
    domain::{DeploymentId, DeploymentRecord, DeploymentStatus},
    services::{BotCatalogService, BotCatalogServiceError},
};
use botyard::runtime::adapters::{DockerContainerRuntime, RuntimeConnection};
use botyard::source::adapters::GitSourceFetcher;
use botyard::telemetry::{TelemetryError, init_tracing};
use camino::Utf8PathBuf;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use mockable::DefaultClock;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::warn;

const DEFAULT_LOG_TAIL: usize = 200;
const HISTORY_LIMIT: usize = 20;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to create database pool: {0}")]
    Pool(#[from] PoolError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] io::Error),
    #[error("bot '{0}' not found")]
    UnknownBot(String),
    #[error(transparent)]
    Catalog(#[from] BotCatalogServiceError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error("deployment {0} failed")]
    DeploymentFailed(DeploymentId),
    #[error("failed to read archive {path}: {source}")]
    ArchiveRead {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

#[derive(Debug, PartialEq, Eq)]
enum Operation {
    Deploy,
    Upload { archive: Utf8PathBuf },
    Status,
    Logs { tail: usize },
    Start,
    Stop,
    Restart,
    History,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    operation: Operation,
    config_path: Utf8PathBuf,
    bot_name: String,
}

impl Invocation {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let usage = || {
            CliError::InvalidArgs(String::from(
                "usage: botyard <operation> <config-path> <bot-name> [archive-or-tail]",
            ))
        };
        let operation_name = args.next().ok_or_else(usage)?;
        let config_path = args.next().map(Utf8PathBuf::from).ok_or_else(usage)?;
        let bot_name = args.next().ok_or_else(usage)?;
        let extra = args.next();
        if args.next().is_some() {
            return Err(usage());
        }

        let operation = match (operation_name.as_str(), extra) {
            ("deploy", None) => Operation::Deploy,
            ("upload", Some(archive)) => Operation::Upload {
                archive: Utf8PathBuf::from(archive),
            },
            ("upload", None) => {
                return Err(CliError::InvalidArgs(String::from(
                    "upload requires an archive path",
                )));
            }
            ("status", None) => Operation::Status,
            ("logs", None) => Operation::Logs {
                tail: DEFAULT_LOG_TAIL,
            },
            ("logs", Some(tail)) => Operation::Logs {
                tail: tail.parse().map_err(|_| {
                    CliError::InvalidArgs(format!("invalid line count '{tail}'"))
                })?,
            },
            ("start", None) => Operation::Start,
            ("stop", None) => Operation::Stop,
            ("restart", None) => Operation::Restart,
            ("history", None) => Operation::History,
            (
                "deploy" | "status" | "start" | "stop" | "restart" | "history",
                Some(unexpected),
            ) => {
                return Err(CliError::InvalidArgs(format!(
                    "unexpected argument '{unexpected}' for {operation_name}"
                )));
            }
            (other, _) => {
                return Err(CliError::InvalidArgs(format!(
                    "unknown operation '{other}'; expected deploy, upload, status, logs, start, stop, restart, or history"
                )));
            }
        };

        Ok(Self {
            operation,
            config_path,
            bot_name,
        })
    }
}

fn main() -> Result<(), BoxError> {
    let invocation = Invocation::parse(env::args().skip(1))?;
    let config = PlatformConfig::load(Some(&invocation.config_path)).map_err(CliError::from)?;
    init_tracing(&config.logging).map_err(CliError::from)?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::RuntimeInit)?;
    let output = runtime.block_on(run(invocation, config))?;
    writeln!(io::stdout().lock(), "{output}").map_err(CliError::Output)?;
    Ok(())
}

async fn run(invocation: Invocation, config: PlatformConfig) -> Result<String, CliError> {
    let pool = Pool::builder()
        .max_size(config.database.max_connections)
        .build(ConnectionManager::<PgConnection>::new(&config.database.url))?;
    let registry = Arc::new(PostgresBotRegistry::new(pool));
    let clock = Arc::new(DefaultClock);

    let connection = RuntimeConnection::connect(
        &config.runtime.docker_binary,
        config.runtime.connect_timeout(),
    )
    .await;
    if let RuntimeConnection::Unavailable { reason } = &connection {
        warn!(%reason, "container runtime unavailable; lifecycle operations will fail");
    }
    let container_runtime = Arc::new(DockerContainerRuntime::new(
        connection,
        config.runtime.docker_options(),
    ));
    let fetcher = Arc::new(GitSourceFetcher::new(config.fetch.git_options()));

    let catalog = BotCatalogService::new(
        Arc::clone(&registry),
        Arc::clone(&clock),
        config.code_root.clone(),
    );
    let bot = catalog
        .find_by_name(&invocation.bot_name)
        .await?
        .ok_or_else(|| CliError::UnknownBot(invocation.bot_name.clone()))?;
    let orchestrator = DeploymentOrchestrator::new(registry, container_runtime, fetcher, clock);
    let bot_id = bot.id();

    match invocation.operation {
        Operation::Deploy => finished(orchestrator.trigger_deploy(bot_id).await?),
        Operation::Upload { archive } => {
            let bytes = tokio::fs::read(&archive)
                .await
                .map_err(|source| CliError::ArchiveRead {
                    path: archive.clone(),
                    source,
                })?;
            finished(orchestrator.trigger_upload_deploy(bot_id, bytes).await?)
        }
        Operation::Status => Ok(orchestrator.query_status(bot_id).await?.to_string()),
        Operation::Logs { tail } => Ok(orchestrator.fetch_logs(bot_id, tail).await?),
        Operation::Start => Ok(orchestrator.start_bot(bot_id).await?.summary()),
        Operation::Stop => {
            orchestrator.stop_bot(bot_id).await?;
            Ok(format!("Bot {} stopped", bot.name()))
        }
        Operation::Restart => Ok(orchestrator.restart_bot(bot_id).await?.summary()),
        Operation::History => {
            let records = orchestrator
                .list_deployments(bot_id, Some(HISTORY_LIMIT))
                .await?;
            Ok(records
                .iter()
                .map(|record| {
                    format!(
                        "#{} {} {}",
                        record.id(),
                        record.status(),
                        record.created_at().to_rfc3339()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

fn finished(record: DeploymentRecord) -> Result<String, CliError> {
    let report = format!(
        "Deployment #{} {}\n{}",
        record.id(),
        record.status(),
        record.transcript_text()
    );
    if record.status() == DeploymentStatus::Failed {
        warn!(deployment_id = %record.id(), "{report}");
        return Err(CliError::DeploymentFailed(record.id()));
    }
    Ok(report)
}
