//! Service configuration from the environment

use crate::whatsapp::NOT_CONFIGURED;
use chrono::Duration;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 2 * 60 * 60;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v20.0";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub token: String,
    pub phone_id: String,
    pub verify_token: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// JSON array of listings imported when the table is empty
    pub seed_path: Option<PathBuf>,
    /// Inactivity threshold after which a session is swept
    pub session_timeout: Duration,
    pub search_limit: usize,
    /// Free-form deployment label reported by the health check
    pub environment: String,
    pub whatsapp: WhatsAppConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let credential = |name: &str| get(name).unwrap_or_else(|| NOT_CONFIGURED.to_string());

        let port = match get("INSPEKTA_PORT") {
            Some(raw) => parse(&raw, "INSPEKTA_PORT", "a port number")?,
            None => DEFAULT_PORT,
        };

        let session_timeout = match get("INSPEKTA_SESSION_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS),
        };

        let search_limit = match get("INSPEKTA_SEARCH_LIMIT") {
            Some(raw) => {
                let expected = "a positive integer";
                let n = parse::<usize>(&raw, "INSPEKTA_SEARCH_LIMIT", expected)?;
                positive(n, &raw, "INSPEKTA_SEARCH_LIMIT", expected)?
            }
            None => DEFAULT_SEARCH_LIMIT,
        };

        let db_path = get("INSPEKTA_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".inspekta").join("listings.db")
            },
            PathBuf::from,
        );

        Ok(Self {
            port,
            db_path,
            seed_path: get("INSPEKTA_SEED_PATH").map(PathBuf::from),
            session_timeout,
            search_limit,
            environment: get("INSPEKTA_ENV").unwrap_or_else(|| "development".to_string()),
            whatsapp: WhatsAppConfig {
                token: credential("WHATSAPP_TOKEN"),
                phone_id: credential("WHATSAPP_PHONE_ID"),
                verify_token: credential("WHATSAPP_VERIFY_TOKEN"),
                api_base: get("WHATSAPP_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(
    raw: &str,
    name: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: raw.to_string(),
    })
}

/// Seconds in `(0, Duration::MAX]`
fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    const NAME: &str = "INSPEKTA_SESSION_TIMEOUT_SECS";
    const EXPECTED: &str = "a positive number of seconds";

    let secs = positive(parse::<i64>(raw, NAME, EXPECTED)?, raw, NAME, EXPECTED)?;
    Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
        name: NAME,
        expected: EXPECTED,
        value: raw.to_string(),
    })
}

fn positive<T: PartialOrd + Default>(
    value: T,
    raw: &str,
    name: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            expected,
            value: raw.to_string(),
        })
    }
}
