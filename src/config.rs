//! Configuration management for the sales report job.
//!
//! Database and SMTP settings come from environment variables (optionally
//! seeded from a `.env` file). Every variable is required; presence and port
//! syntax are validated once, before any pipeline stage runs.

use crate::error::{ReportError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// Database connection variables.
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";

// SMTP session variables.
pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";

const REQUIRED_VARS: [&str; 9] = [
    DB_NAME,
    DB_USER,
    DB_PASSWORD,
    DB_HOST,
    DB_PORT,
    SMTP_HOST,
    SMTP_PORT,
    SMTP_USER,
    SMTP_PASSWORD,
];

/// Complete configuration for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
}

/// Database connection configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// SMTP session configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Config {
    /// Loads variables from a dotenv file into the process environment.
    ///
    /// With `Some(path)` the file must exist. With `None` a `.env` file is
    /// searched for in the current directory and its parents; not finding one
    /// is fine, and a malformed one is logged and skipped.
    pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => dotenvy::from_path(path).map(|_| ()).map_err(|e| {
                ReportError::config(format!("Failed to load {}: {e}", path.display()))
            }),
            None => {
                if let Some(message) = dotenv_search_warning(&dotenvy::dotenv()) {
                    warn!("{message}");
                }
                Ok(())
            }
        }
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// All missing variables are reported together. Empty values count as
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(ReportError::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let var = |key: &str| get(key).unwrap_or_default();

        Ok(Self {
            database: DatabaseConfig {
                host: var(DB_HOST),
                port: parse_port(DB_PORT, &var(DB_PORT))?,
                database: var(DB_NAME),
                user: var(DB_USER),
                password: var(DB_PASSWORD),
            },
            smtp: SmtpConfig {
                host: var(SMTP_HOST),
                port: parse_port(SMTP_PORT, &var(SMTP_PORT))?,
                user: var(SMTP_USER),
                password: var(SMTP_PASSWORD),
            },
        })
    }
}

/// Returns the warning to log for a `.env` search result, if any.
///
/// A missing file is silent; anything else (parse or read errors) is
/// reported so it is not mistaken for missing variables later.
fn dotenv_search_warning(result: &dotenvy::Result<PathBuf>) -> Option<String> {
    match result {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            None
        }
        Err(e) if e.not_found() => None,
        Err(e) => Some(format!("Ignoring unreadable .env file: {e}")),
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value.trim().parse().map_err(|_| {
        ReportError::config(format!(
            "{key} must be a port number between 0 and 65535, got '{value}'"
        ))
    })
}

impl DatabaseConfig {
    /// Returns a display-safe string (no password) for log output.
    pub fn display_string(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl SmtpConfig {
    /// Returns a display-safe string (no password) for log output.
    pub fn display_string(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
