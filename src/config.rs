//! Runtime configuration read from the environment (after `.env` is loaded).

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_MANAGER_ROLE: &str = "Менеджер";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string; without it the in-memory store is used.
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub media_root: PathBuf,
    pub manager_role: String,
    pub max_upload_bytes: usize,
    pub admin: Option<AdminBootstrap>,
}

/// Superuser created at startup when it does not exist yet.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("ADMIN_USERNAME and ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            nats_url: None,
            media_root: PathBuf::from("media"),
            manager_role: DEFAULT_MANAGER_ROLE.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            admin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };
        Ok(Self {
            port: parse_number(&lookup, "PORT")?.unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            media_root: lookup("MEDIA_ROOT").map(PathBuf::from).unwrap_or(defaults.media_root),
            manager_role: lookup("MANAGER_ROLE").unwrap_or(defaults.manager_role),
            max_upload_bytes: parse_number(&lookup, "MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            admin,
        })
    }
}

fn parse_number<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| value.parse().map_err(|_| ConfigError::InvalidNumber { name, value }))
        .transpose()
}
