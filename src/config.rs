//! Settings
//!
//! Process settings read from the environment (and `.env`, when present).

use crate::error::{AdminError, Result};
use serde::Serialize;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::str::FromStr;

/// Connection and server settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_max_connections: u32,
    pub max_retry_attempts: u8,
    pub api_host: String,
    pub api_port: u16,
}

/// Connection details safe to show to a user
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password_set: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: "postgres".to_string(),
            db_max_connections: 5,
            max_retry_attempts: 3,
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
        }
    }
}

impl Settings {
    /// Load settings, reading `.env` first if one exists
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Build settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            db_host: lookup("DB_HOST").unwrap_or(defaults.db_host),
            db_port: parse_or("DB_PORT", lookup("DB_PORT"), defaults.db_port)?,
            db_user: lookup("DB_USER").unwrap_or(defaults.db_user),
            db_password: lookup("DB_PASSWORD").unwrap_or(defaults.db_password),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
                defaults.db_max_connections,
            )?,
            max_retry_attempts: parse_or(
                "MAX_RETRY_ATTEMPTS",
                lookup("MAX_RETRY_ATTEMPTS"),
                defaults.max_retry_attempts,
            )?,
            api_host: lookup("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_or("API_PORT", lookup("API_PORT"), defaults.api_port)?,
        })
    }

    /// Connect options for one database on the configured server
    pub fn connect_options(&self, db_name: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_password)
            .database(db_name)
    }

    pub fn connection_info(&self, db_name: &str) -> ConnectionInfo {
        ConnectionInfo {
            host: self.db_host.clone(),
            port: self.db_port,
            database: db_name.to_string(),
            user: self.db_user.clone(),
            password_set: !self.db_password.is_empty(),
        }
    }

    pub fn api_bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| {
            AdminError::Config(format!("{} has invalid value '{}'", key, value))
        }),
        None => Ok(default),
    }
}
