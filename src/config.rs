//! Process configuration loaded from environment variables.
//!
//! `dotenv` is applied by the binary before [`Config::from_env`] runs, so a
//! local `.env` file works the same as exported variables.

use crate::utils::error::{AppError, AppResult};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Bounds applied to every booking and cancellation attempt.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound on the work before commit, including lock waits
    pub transaction_timeout: Duration,
    /// Internal retries after a lost concurrent-update race
    pub conflict_retries: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            transaction_timeout: Duration::from_millis(5000),
            conflict_retries: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl Config {
    /// Load configuration, failing on missing or malformed variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over any key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            database: DatabaseConfig {
                url: required(&lookup, "DATABASE_URL")?,
                max_connections: parsed_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(parsed_or(
                    &lookup,
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    3,
                )?),
            },
            booking: BookingConfig {
                transaction_timeout: Duration::from_millis(parsed_or(
                    &lookup,
                    "BOOKING_TRANSACTION_TIMEOUT_MS",
                    5000,
                )?),
                conflict_retries: parsed_or(&lookup, "BOOKING_CONFLICT_RETRIES", 1)?,
            },
            auth: AuthConfig {
                access_secret: required(&lookup, "ACCESS_SECRET")?,
                refresh_secret: required(&lookup, "REFRESH_SECRET")?,
                access_token_ttl: chrono::Duration::minutes(parsed_or(
                    &lookup,
                    "ACCESS_TOKEN_TTL_MINUTES",
                    15,
                )?),
                refresh_token_ttl: chrono::Duration::minutes(parsed_or(
                    &lookup,
                    "REFRESH_TOKEN_TTL_MINUTES",
                    7 * 24 * 60,
                )?),
            },
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AppError::InvalidInput(format!("{} must be set", key)))
}

// Unset falls back to the default; set but unparsable is an error
fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::InvalidInput(format!("{} has an invalid value: {:?}", key, raw))
        }),
    }
}
