//! Platform configuration.
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then `BOTYARD_*` environment variables. Nested fields are addressed with
//! a double underscore, so `BOTYARD_RUNTIME__BUILD_TIMEOUT_SECS=30` sets
//! `runtime.build_timeout_secs`.

use crate::runtime::adapters::DockerRuntimeOptions;
use crate::source::adapters::GitFetchOptions;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "BOTYARD_";

/// Separator between nested keys in environment variable names.
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The merged sources do not describe a valid configuration.
    #[error("invalid configuration: {0}")]
    Invalid(#[source] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level platform configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Directory holding one source directory per bot.
    #[serde(default = "default_code_root")]
    pub code_root: Utf8PathBuf,

    /// Registry database.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Container engine.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Source fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_code_root() -> Utf8PathBuf {
    Utf8PathBuf::from("/srv/bots")
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            code_root: default_code_root(),
            database: DatabaseConfig::default(),
            runtime: RuntimeConfig::default(),
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PlatformConfig {
    /// Returns the defaults layered under an optional JSON document.
    #[must_use]
    pub fn documented(contents: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(json) = contents {
            figment = figment.merge(Json::string(json));
        }
        figment
    }

    /// Returns the full layering: defaults, the JSON document, then
    /// `BOTYARD_*` environment variables.
    #[must_use]
    pub fn layered(contents: Option<&str>) -> Figment {
        Self::documented(contents).merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING_SEPARATOR))
    }

    /// Extracts configuration from any figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a source is malformed or a value
    /// has the wrong type.
    pub fn from_figment(figment: &Figment) -> ConfigResult<Self> {
        Ok(figment.extract()?)
    }

    /// Parses a JSON document over the defaults, without environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed documents.
    pub fn from_json_str(contents: &str) -> ConfigResult<Self> {
        Self::from_figment(&Self::documented(Some(contents)))
    }

    /// Loads the file when given, then applies process environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Invalid`] when the merged sources do not parse.
    pub fn load(path: Option<&Utf8Path>) -> ConfigResult<Self> {
        let contents = path
            .map(|file| {
                read_config_file(file).map_err(|source| ConfigError::Read {
                    path: file.to_path_buf(),
                    source,
                })
            })
            .transpose()?;
        Self::from_figment(&Self::layered(contents.as_deref()))
    }
}

fn read_config_file(path: &Utf8Path) -> io::Result<String> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("config path {path} has no file name"),
        )
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read_to_string(file_name)
}

/// Registry database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    String::from("postgres://localhost/botyard")
}

const fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Container engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path or name of the `docker` executable.
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Grace period before a stopped container is killed, in seconds.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,

    /// Image build deadline, in seconds.
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,

    /// Deadline for other engine commands, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Network mode for bot containers.
    #[serde(default = "default_network_mode")]
    pub network_mode: String,

    /// Restart policy for bot containers.
    #[serde(default = "default_restart_policy")]
    pub restart_policy: String,
}

fn default_docker_binary() -> String {
    String::from("docker")
}

const fn default_stop_grace_secs() -> u64 {
    10
}

const fn default_build_timeout_secs() -> u64 {
    600
}

const fn default_command_timeout_secs() -> u64 {
    60
}

fn default_network_mode() -> String {
    String::from("bridge")
}

fn default_restart_policy() -> String {
    String::from("always")
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            stop_grace_secs: default_stop_grace_secs(),
            build_timeout_secs: default_build_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            network_mode: default_network_mode(),
            restart_policy: default_restart_policy(),
        }
    }
}

impl RuntimeConfig {
    /// Deadline for the startup engine connection check.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Converts to Docker adapter options.
    #[must_use]
    pub fn docker_options(&self) -> DockerRuntimeOptions {
        DockerRuntimeOptions {
            docker_binary: self.docker_binary.clone(),
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            build_timeout: Duration::from_secs(self.build_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            network_mode: self.network_mode.clone(),
            restart_policy: self.restart_policy.clone(),
        }
    }
}

/// Source fetch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path or name of the `git` executable.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Clone deadline, in seconds.
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,

    /// Pull deadline, in seconds.
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,
}

fn default_git_binary() -> String {
    String::from("git")
}

const fn default_clone_timeout_secs() -> u64 {
    120
}

const fn default_update_timeout_secs() -> u64 {
    60
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            clone_timeout_secs: default_clone_timeout_secs(),
            update_timeout_secs: default_update_timeout_secs(),
        }
    }
}

impl FetchConfig {
    /// Converts to git adapter options.
    #[must_use]
    pub fn git_options(&self) -> GitFetchOptions {
        GitFetchOptions {
            git_binary: self.git_binary.clone(),
            clone_timeout: Duration::from_secs(self.clone_timeout_secs),
            update_timeout: Duration::from_secs(self.update_timeout_secs),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directives; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    String::from("botyard=info")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
