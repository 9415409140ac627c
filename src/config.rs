//! Process configuration from environment variables and `.env`

use crate::store::UserId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "expenses.db";
const DEFAULT_CATALOG_DIR: &str = "catalog";
const DEFAULT_LOG_PATH: &str = "expense-bot.log";

/// Startup-fatal configuration problems, including unusable catalog files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("BOT_TOKEN is not set")]
    MissingToken,
    #[error("ADMIN_ID is not a numeric id: {0:?}")]
    InvalidAdminId(String),
    #[error("Cannot read catalog file {file}: {source}")]
    CatalogRead {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog file {file}: {source}")]
    CatalogParse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Catalog table {0} is empty")]
    CatalogEmpty(&'static str),
}

/// Resolved process configuration
pub struct Config {
    /// Credential for the platform channel adapter. Required at startup
    /// even when the adapter in use ignores it.
    pub bot_token: String,
    pub database_path: PathBuf,
    pub admin_id: Option<UserId>,
    pub catalog_dir: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration, reading `.env` first if one is present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let admin_id = match lookup("ADMIN_ID").filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => {
                let id = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidAdminId(raw.clone()))?;
                Some(UserId(id))
            }
            None => None,
        };

        Ok(Self {
            bot_token,
            database_path: path_or(lookup("DATABASE_PATH"), DEFAULT_DATABASE_PATH),
            admin_id,
            catalog_dir: path_or(lookup("CATALOG_DIR"), DEFAULT_CATALOG_DIR),
            log_path: path_or(lookup("LOG_PATH"), DEFAULT_LOG_PATH),
        })
    }
}

// Keep the token out of logs and error reports.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("database_path", &self.database_path)
            .field("admin_id", &self.admin_id)
            .field("catalog_dir", &self.catalog_dir)
            .field("log_path", &self.log_path)
            .finish()
    }
}

fn path_or(value: Option<String>, default: &str) -> PathBuf {
    value
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| PathBuf::from(default), PathBuf::from)
}
