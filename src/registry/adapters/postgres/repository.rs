//! `PostgreSQL` repository implementation for bots and deployment records.

use super::{
    models::{BotRow, DeploymentRow, EnvVarRow, NewBotRow, NewDeploymentRow},
    schema::{bot_env_vars, bots, deployments},
};
use crate::registry::{
    domain::{
        BotDefinition, BotId, BotName, BotRuntime, BotSettings, DeploymentId, DeploymentRecord,
        DeploymentStatus, EnvironmentSet, EnvironmentVariable, PersistedBotData,
        PersistedDeploymentData, RemoteUrl, StartCommand,
    },
    ports::{BotRegistry, BotRegistryError, BotRegistryResult},
};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::Value;

/// `PostgreSQL` connection pool type for bot registry adapters.
pub type BotRegistryPgPool = Pool<ConnectionManager<PgConnection>>;

const NAME_UNIQUE_CONSTRAINT: &str = "bots_name_unique";

impl From<DieselError> for BotRegistryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed bot registry.
#[derive(Debug, Clone)]
pub struct PostgresBotRegistry {
    pool: BotRegistryPgPool,
}

impl PostgresBotRegistry {
    /// Creates a new registry from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: BotRegistryPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> BotRegistryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> BotRegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(BotRegistryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(BotRegistryError::persistence)?
    }
}

#[async_trait]
impl BotRegistry for PostgresBotRegistry {
    async fn create_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()> {
        let bot_id = bot.id();
        let bot_name = bot.name().clone();
        let new_row = to_new_bot_row(bot);

        self.run_blocking(move |connection| {
            diesel::insert_into(bots::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_name_unique_violation(info.as_ref()) =>
                    {
                        BotRegistryError::DuplicateBotName(bot_name.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        BotRegistryError::DuplicateBot(bot_id)
                    }
                    _ => BotRegistryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_bot(&self, bot: &BotDefinition) -> BotRegistryResult<()> {
        let bot_id = bot.id();
        let row = to_new_bot_row(bot);

        self.run_blocking(move |connection| {
            let updated_count =
                diesel::update(bots::table.filter(bots::id.eq(bot_id.into_inner())))
                    .set((
                        bots::repo_url.eq(&row.repo_url),
                        bots::runtime.eq(&row.runtime),
                        bots::start_command.eq(&row.start_command),
                        bots::updated_at.eq(row.updated_at),
                    ))
                    .execute(connection)?;

            if updated_count == 0 {
                return Err(BotRegistryError::BotNotFound(bot_id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_bot(&self, bot_id: BotId) -> BotRegistryResult<()> {
        self.run_blocking(move |connection| {
            let deleted_count =
                diesel::delete(bots::table.filter(bots::id.eq(bot_id.into_inner())))
                    .execute(connection)?;
            if deleted_count == 0 {
                return Err(BotRegistryError::BotNotFound(bot_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_bot(&self, bot_id: BotId) -> BotRegistryResult<Option<BotDefinition>> {
        self.run_blocking(move |connection| {
            let row = bots::table
                .filter(bots::id.eq(bot_id.into_inner()))
                .select(BotRow::as_select())
                .first::<BotRow>(connection)
                .optional()?;
            row.map(row_to_bot).transpose()
        })
        .await
    }

    async fn find_bot_by_name(&self, name: &BotName) -> BotRegistryResult<Option<BotDefinition>> {
        let name = name.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = bots::table
                .filter(bots::name.eq(&name))
                .select(BotRow::as_select())
                .first::<BotRow>(connection)
                .optional()?;
            row.map(row_to_bot).transpose()
        })
        .await
    }

    async fn list_bots(&self) -> BotRegistryResult<Vec<BotDefinition>> {
        self.run_blocking(move |connection| {
            let rows = bots::table
                .order(bots::name.asc())
                .select(BotRow::as_select())
                .load::<BotRow>(connection)?;
            rows.into_iter().map(row_to_bot).collect()
        })
        .await
    }

    async fn load_environment(&self, bot_id: BotId) -> BotRegistryResult<EnvironmentSet> {
        self.run_blocking(move |connection| {
            ensure_bot_exists(connection, bot_id)?;
            let rows = bot_env_vars::table
                .filter(bot_env_vars::bot_id.eq(bot_id.into_inner()))
                .order(bot_env_vars::position.asc())
                .select(EnvVarRow::as_select())
                .load::<EnvVarRow>(connection)?;
            rows_to_environment(rows)
        })
        .await
    }

    async fn replace_environment(
        &self,
        bot_id: BotId,
        environment: &EnvironmentSet,
    ) -> BotRegistryResult<()> {
        let rows = to_env_rows(bot_id, environment)?;

        self.run_blocking(move |connection| {
            connection.transaction::<_, BotRegistryError, _>(|tx_conn| {
                ensure_bot_exists(tx_conn, bot_id)?;
                diesel::delete(
                    bot_env_vars::table.filter(bot_env_vars::bot_id.eq(bot_id.into_inner())),
                )
                .execute(tx_conn)?;
                if !rows.is_empty() {
                    diesel::insert_into(bot_env_vars::table)
                        .values(&rows)
                        .execute(tx_conn)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn create_deployment(
        &self,
        bot_id: BotId,
        created_at: DateTime<Utc>,
    ) -> BotRegistryResult<DeploymentRecord> {
        let new_row = NewDeploymentRow {
            bot_id: bot_id.into_inner(),
            status: DeploymentStatus::Pending.as_str().to_owned(),
            transcript: Value::Array(Vec::new()),
            created_at,
        };

        self.run_blocking(move |connection| {
            let row = diesel::insert_into(deployments::table)
                .values(&new_row)
                .returning(DeploymentRow::as_returning())
                .get_result::<DeploymentRow>(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        BotRegistryError::BotNotFound(bot_id)
                    }
                    _ => BotRegistryError::persistence(err),
                })?;
            row_to_deployment(row)
        })
        .await
    }

    async fn append_deployment_log(
        &self,
        deployment_id: DeploymentId,
        chunk: &str,
    ) -> BotRegistryResult<()> {
        let chunk = chunk.to_owned();

        self.run_blocking(move |connection| {
            connection.transaction::<_, BotRegistryError, _>(|tx_conn| {
                let row = lock_pending_deployment(tx_conn, deployment_id)?;
                let mut transcript = parse_transcript(row.transcript)?;
                transcript.push(chunk);
                diesel::update(deployments::table.filter(deployments::id.eq(row.id)))
                    .set(deployments::transcript.eq(transcript_to_value(&transcript)?))
                    .execute(tx_conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn finalize_deployment(&self, record: &DeploymentRecord) -> BotRegistryResult<()> {
        let deployment_id = record.id();
        if !record.status().is_terminal() {
            return Err(BotRegistryError::DeploymentNotTerminal(deployment_id));
        }
        let status = record.status().as_str().to_owned();
        let transcript = transcript_to_value(record.transcript())?;
        let finalized_at = record.finalized_at();

        self.run_blocking(move |connection| {
            connection.transaction::<_, BotRegistryError, _>(|tx_conn| {
                let row = lock_pending_deployment(tx_conn, deployment_id)?;
                diesel::update(deployments::table.filter(deployments::id.eq(row.id)))
                    .set((
                        deployments::status.eq(&status),
                        deployments::transcript.eq(&transcript),
                        deployments::finalized_at.eq(finalized_at),
                    ))
                    .execute(tx_conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn find_deployment(
        &self,
        deployment_id: DeploymentId,
    ) -> BotRegistryResult<Option<DeploymentRecord>> {
        let Ok(key) = i64::try_from(deployment_id.value()) else {
            return Ok(None);
        };

        self.run_blocking(move |connection| {
            let row = deployments::table
                .filter(deployments::id.eq(key))
                .select(DeploymentRow::as_select())
                .first::<DeploymentRow>(connection)
                .optional()?;
            row.map(row_to_deployment).transpose()
        })
        .await
    }

    async fn list_deployments(
        &self,
        bot_id: BotId,
        limit: Option<usize>,
    ) -> BotRegistryResult<Vec<DeploymentRecord>> {
        let row_limit = limit.map(|value| i64::try_from(value).unwrap_or(i64::MAX));

        self.run_blocking(move |connection| {
            let mut query = deployments::table
                .filter(deployments::bot_id.eq(bot_id.into_inner()))
                .order(deployments::id.desc())
                .select(DeploymentRow::as_select())
                .into_boxed();
            if let Some(value) = row_limit {
                query = query.limit(value);
            }
            let rows = query.load::<DeploymentRow>(connection)?;
            rows.into_iter().map(row_to_deployment).collect()
        })
        .await
    }
}

fn ensure_bot_exists(connection: &mut PgConnection, bot_id: BotId) -> BotRegistryResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(
        bots::table.filter(bots::id.eq(bot_id.into_inner())),
    ))
    .get_result(connection)?;
    if exists {
        Ok(())
    } else {
        Err(BotRegistryError::BotNotFound(bot_id))
    }
}

fn lock_pending_deployment(
    connection: &mut PgConnection,
    deployment_id: DeploymentId,
) -> BotRegistryResult<DeploymentRow> {
    let key = i64::try_from(deployment_id.value())
        .map_err(|_| BotRegistryError::DeploymentNotFound(deployment_id))?;
    let row = deployments::table
        .filter(deployments::id.eq(key))
        .select(DeploymentRow::as_select())
        .for_update()
        .first::<DeploymentRow>(connection)
        .optional()?
        .ok_or(BotRegistryError::DeploymentNotFound(deployment_id))?;

    let status = DeploymentStatus::try_from(row.status.as_str())
        .map_err(BotRegistryError::invalid_persisted_data)?;
    if status.is_terminal() {
        return Err(BotRegistryError::DeploymentAlreadyFinalized(deployment_id));
    }
    Ok(row)
}

pub(super) fn to_new_bot_row(bot: &BotDefinition) -> NewBotRow {
    NewBotRow {
        id: bot.id().into_inner(),
        name: bot.name().as_str().to_owned(),
        repo_url: bot.repo_url().map(|url| url.as_str().to_owned()),
        code_path: bot.code_path().as_str().to_owned(),
        runtime: bot.runtime().as_str().to_owned(),
        start_command: bot.start_command().as_str().to_owned(),
        created_at: bot.created_at(),
        updated_at: bot.updated_at(),
    }
}

pub(super) fn row_to_bot(row: BotRow) -> BotRegistryResult<BotDefinition> {
    let BotRow {
        id,
        name,
        repo_url,
        code_path,
        runtime,
        start_command,
        created_at,
        updated_at,
    } = row;

    let parsed_name = BotName::new(name).map_err(BotRegistryError::invalid_persisted_data)?;
    let parsed_repo_url = RemoteUrl::parse_optional(repo_url.as_deref())
        .map_err(BotRegistryError::invalid_persisted_data)?;
    let parsed_runtime =
        BotRuntime::try_from(runtime.as_str()).map_err(BotRegistryError::invalid_persisted_data)?;

    let data = PersistedBotData {
        id: BotId::from_uuid(id),
        name: parsed_name,
        code_path: Utf8PathBuf::from(code_path),
        settings: BotSettings {
            repo_url: parsed_repo_url,
            runtime: parsed_runtime,
            start_command: StartCommand::new(start_command),
        },
        created_at,
        updated_at,
    };

    Ok(BotDefinition::from_persisted(data))
}

pub(super) fn to_env_rows(
    bot_id: BotId,
    environment: &EnvironmentSet,
) -> BotRegistryResult<Vec<EnvVarRow>> {
    environment
        .variables()
        .iter()
        .enumerate()
        .map(|(index, variable)| {
            let position = i32::try_from(index).map_err(BotRegistryError::persistence)?;
            Ok(EnvVarRow {
                bot_id: bot_id.into_inner(),
                key: variable.key().to_owned(),
                value: variable.value().to_owned(),
                position,
            })
        })
        .collect()
}

pub(super) fn rows_to_environment(rows: Vec<EnvVarRow>) -> BotRegistryResult<EnvironmentSet> {
    let variables = rows
        .into_iter()
        .map(|row| {
            EnvironmentVariable::new(row.key, row.value)
                .map_err(BotRegistryError::invalid_persisted_data)
        })
        .collect::<BotRegistryResult<Vec<_>>>()?;
    EnvironmentSet::from_variables(variables).map_err(BotRegistryError::invalid_persisted_data)
}

pub(super) fn row_to_deployment(row: DeploymentRow) -> BotRegistryResult<DeploymentRecord> {
    let DeploymentRow {
        id,
        bot_id,
        status,
        transcript,
        created_at,
        finalized_at,
    } = row;

    let parsed_id = u64::try_from(id).map_err(BotRegistryError::invalid_persisted_data)?;
    let parsed_status = DeploymentStatus::try_from(status.as_str())
        .map_err(BotRegistryError::invalid_persisted_data)?;

    let data = PersistedDeploymentData {
        id: DeploymentId::new(parsed_id),
        bot_id: BotId::from_uuid(bot_id),
        status: parsed_status,
        transcript: parse_transcript(transcript)?,
        created_at,
        finalized_at,
    };

    Ok(DeploymentRecord::from_persisted(data))
}

fn parse_transcript(value: Value) -> BotRegistryResult<Vec<String>> {
    serde_json::from_value(value).map_err(BotRegistryError::invalid_persisted_data)
}

fn transcript_to_value(chunks: &[String]) -> BotRegistryResult<Value> {
    serde_json::to_value(chunks).map_err(BotRegistryError::persistence)
}

fn is_name_unique_violation(info: &dyn diesel::result::DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == NAME_UNIQUE_CONSTRAINT)
}
