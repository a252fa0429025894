//! Diesel row models for bot registry persistence.

use super::schema::{bot_env_vars, bots, deployments};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for bot definitions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BotRow {
    /// Internal bot identifier.
    pub id: uuid::Uuid,
    /// Unique bot name.
    pub name: String,
    /// Optional git remote.
    pub repo_url: Option<String>,
    /// Code directory.
    pub code_path: String,
    /// Runtime tag.
    pub runtime: String,
    /// Start command.
    pub start_command: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for bot definitions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bots)]
pub struct NewBotRow {
    /// Internal bot identifier.
    pub id: uuid::Uuid,
    /// Unique bot name.
    pub name: String,
    /// Optional git remote.
    pub repo_url: Option<String>,
    /// Code directory.
    pub code_path: String,
    /// Runtime tag.
    pub runtime: String,
    /// Start command.
    pub start_command: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query and insert model for environment variables.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = bot_env_vars)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EnvVarRow {
    /// Owning bot.
    pub bot_id: uuid::Uuid,
    /// Variable name.
    pub key: String,
    /// Variable value.
    pub value: String,
    /// Insertion order.
    pub position: i32,
}

/// Query result row for deployment records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = deployments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeploymentRow {
    /// Record identifier.
    pub id: i64,
    /// Owning bot.
    pub bot_id: uuid::Uuid,
    /// Status tag.
    pub status: String,
    /// Transcript chunks.
    pub transcript: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Finalization timestamp.
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Insert model for deployment records; the identifier is database-assigned.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deployments)]
pub struct NewDeploymentRow {
    /// Owning bot.
    pub bot_id: uuid::Uuid,
    /// Status tag.
    pub status: String,
    /// Transcript chunks.
    pub transcript: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
