use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::todos::controller::SyncMode;

/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub sync_mode: SyncMode,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse("PORT", &required("PORT")?)?;
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let token_ttl_hours: i64 = match lookup("TOKEN_TTL_HOURS") {
            Some(v) => {
                let hours = parse("TOKEN_TTL_HOURS", &v)?;
                if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
                    return Err(ConfigError::Invalid { key: "TOKEN_TTL_HOURS", value: v });
                }
                hours
            }
            None => 24,
        };
        let sync_mode = match lookup("TODO_SYNC_MODE") {
            Some(v) => parse("TODO_SYNC_MODE", &v)?,
            None => SyncMode::default(),
        };
        let session_idle = match lookup("SESSION_IDLE_MINUTES") {
            Some(v) => {
                let minutes: u64 = parse("SESSION_IDLE_MINUTES", &v)?;
                let secs = minutes
                    .checked_mul(60)
                    .ok_or(ConfigError::Invalid { key: "SESSION_IDLE_MINUTES", value: v })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(60 * 60),
        };

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            token_ttl_hours,
            sync_mode,
            session_idle,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
