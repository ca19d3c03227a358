use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DATABASE_VAR: &str = "STAFFDESK_DATABASE";
pub const BUSY_TIMEOUT_VAR: &str = "STAFFDESK_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}

/// Where the employee database lives and how long to wait on a locked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Reads settings from the process environment, after loading `.env` if one exists.
    /// `database` replaces the configured path; the other settings still come
    /// from the environment.
    pub fn from_env(database: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup_with_database(|name| std::env::var(name).ok(), database)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup_with_database(lookup, None)
    }

    pub fn from_lookup_with_database(
        lookup: impl Fn(&str) -> Option<String>,
        database: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let database_path = match database {
            Some(path) => path,
            None => lookup(DATABASE_VAR)
                .filter(|value| !value.trim().is_empty())
                .map(|value| PathBuf::from(value.trim()))
                .ok_or(ConfigError::Missing(DATABASE_VAR))?,
        };

        let busy_timeout = match lookup(BUSY_TIMEOUT_VAR) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidTimeout {
                    name: BUSY_TIMEOUT_VAR,
                    value,
                })?,
            None => DEFAULT_BUSY_TIMEOUT,
        };

        Ok(Self {
            database_path,
            busy_timeout,
        })
    }
}
