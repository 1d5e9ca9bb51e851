//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the REST API listens on.
    pub port: u16,
    /// libSQL database file for progressive tracking.
    pub db_path: PathBuf,
    /// Spreadsheet web app that mirrors every progress row, if any.
    pub sheet_url: Option<SecretString>,
    /// JSON catalog replacing the built-in questions.
    pub catalog_path: Option<PathBuf>,
    /// Upper bound on a single webhook submission.
    pub submit_timeout: Duration,
    /// In-memory sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("./data/bill-relief.db"),
            sheet_url: None,
            catalog_path: None,
            submit_timeout: Duration::from_secs(10),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl ServerConfig {
    /// Read `BILL_RELIEF_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("BILL_RELIEF_PORT") {
            Some(raw) => parse_number(raw.trim(), "BILL_RELIEF_PORT")?,
            None => defaults.port,
        };
        let submit_timeout = match get("BILL_RELIEF_SUBMIT_TIMEOUT_SECS") {
            Some(raw) => parse_secs(raw.trim(), "BILL_RELIEF_SUBMIT_TIMEOUT_SECS")?,
            None => defaults.submit_timeout,
        };
        let session_idle_timeout = match get("BILL_RELIEF_SESSION_IDLE_SECS") {
            Some(raw) => parse_secs(raw.trim(), "BILL_RELIEF_SESSION_IDLE_SECS")?,
            None => defaults.session_idle_timeout,
        };

        Ok(Self {
            port,
            db_path: get("BILL_RELIEF_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            sheet_url: get("BILL_RELIEF_SHEET_URL").map(SecretString::from),
            catalog_path: get("BILL_RELIEF_CATALOG_PATH").map(PathBuf::from),
            submit_timeout,
            session_idle_timeout,
        })
    }
}

/// A whole number of seconds, at least one.
fn parse_secs(raw: &str, key: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_number(raw, key)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_number<T>(raw: &str, key: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
