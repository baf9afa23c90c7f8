use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Runtime settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    /// Maximum age of a session token, in seconds.
    pub token_max_age_secs: i64,
    /// Lifetime of a password reset token, in seconds.
    pub reset_token_ttl_secs: i64,
    pub redis_url: String,
    /// Redis list that receives job messages.
    pub job_queue: String,
    pub db_max_connections: u32,
    pub db_timeout_secs: u64,
    pub queue_timeout_secs: u64,
    /// How often expired and revoked sessions are deleted, in seconds.
    pub session_purge_interval_secs: u64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            token_max_age_secs: parsed("TOKEN_MAX_AGE_SECS", 60 * 60 * 24)?,
            reset_token_ttl_secs: parsed("RESET_TOKEN_TTL_SECS", 60 * 60)?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            job_queue: env::var("JOB_QUEUE").unwrap_or_else(|_| "todo:jobs".to_string()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            db_timeout_secs: parsed("DB_TIMEOUT_SECS", 5)?,
            queue_timeout_secs: parsed("QUEUE_TIMEOUT_SECS", 3)?,
            session_purge_interval_secs: positive("SESSION_PURGE_INTERVAL_SECS", 15 * 60)?,
            bcrypt_cost: bcrypt_cost()?,
        })
    }

    /// Settings for in-process test runs: no external services and the cheapest bcrypt cost.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            server_port: 0,
            server_host: "127.0.0.1".to_string(),
            jwt_secret: "test-secret".to_string(),
            token_max_age_secs: 60 * 60,
            reset_token_ttl_secs: 60 * 60,
            redis_url: String::new(),
            job_queue: "todo:jobs:test".to_string(),
            db_max_connections: 1,
            db_timeout_secs: 1,
            queue_timeout_secs: 1,
            session_purge_interval_secs: 60,
            bcrypt_cost: 4,
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }

    pub fn session_purge_interval(&self) -> Duration {
        Duration::from_secs(self.session_purge_interval_secs)
    }
}

fn required(key: &str) -> AppResult<String> {
    env::var(key).map_err(|_| AppError::InternalServerError(format!("{} must be set", key)))
}

fn parsed<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", key))),
        Err(_) => Ok(default),
    }
}

fn positive(key: &str, default: u64) -> AppResult<u64> {
    match parsed(key, default)? {
        0 => Err(AppError::InternalServerError(format!("{} must be positive", key))),
        value => Ok(value),
    }
}

fn bcrypt_cost() -> AppResult<u32> {
    let cost = parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
    if !(4..=31).contains(&cost) {
        return Err(AppError::InternalServerError(format!(
            "BCRYPT_COST must be between 4 and 31, got {}",
            cost
        )));
    }
    Ok(cost)
}
