//! `PostgreSQL` adapters for bot registry persistence.

mod models;
mod repository;
mod schema;


pub use repository::{BotRegistryPgPool, PostgresBotRegistry};
