//! Configuration management for Catalog Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! # Example
//!
//! ```no_run
//! use catalog_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("listening on {}:{}", settings.server.host, settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub jwt: JwtSettings,
    pub images: ImageSettings,
    pub seed: SeedSettings,
}

impl Settings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build settings from any variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Settings {
            server: ServerSettings::from_vars(&var)?,
            jwt: JwtSettings::from_vars(&var)?,
            images: ImageSettings::from_vars(&var),
            seed: SeedSettings::from_vars(&var),
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

/// gRPC listener settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_vars<F: Fn(&str) -> Option<String>>(var: &F) -> Result<Self> {
        Ok(Self {
            host: var("CATALOG_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var, "CATALOG_PORT", 50051)?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT signing settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub token_duration_secs: i64,
}

impl JwtSettings {
    fn from_vars<F: Fn(&str) -> Option<String>>(var: &F) -> Result<Self> {
        let secret = var("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .context("JWT_SECRET must be set")?;

        let token_duration_secs = parse_or(var, "JWT_TOKEN_DURATION_SECS", 15 * 60)?;
        if token_duration_secs <= 0 {
            anyhow::bail!("JWT_TOKEN_DURATION_SECS must be positive");
        }

        Ok(Self {
            secret,
            token_duration_secs,
        })
    }

    pub fn token_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_duration_secs)
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("token_duration_secs", &self.token_duration_secs)
            .finish()
    }
}

/// Where uploaded images are written
#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub folder: String,
}

impl ImageSettings {
    fn from_vars<F: Fn(&str) -> Option<String>>(var: &F) -> Self {
        Self {
            folder: var("IMAGE_FOLDER").unwrap_or_else(|| "tmp".to_string()),
        }
    }
}

/// Passwords for the principals registered at startup
#[derive(Clone)]
pub struct SeedSettings {
    pub admin_password: String,
    pub user_password: String,
}

impl SeedSettings {
    fn from_vars<F: Fn(&str) -> Option<String>>(var: &F) -> Self {
        Self {
            admin_password: var("SEED_ADMIN_PASSWORD").unwrap_or_else(|| "secret".to_string()),
            user_password: var("SEED_USER_PASSWORD").unwrap_or_else(|| "secret".to_string()),
        }
    }
}

impl fmt::Debug for SeedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedSettings").finish_non_exhaustive()
    }
}

/// Settings for a catalog client session
#[derive(Clone)]
pub struct ClientSettings {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub refresh_interval: Duration,
    pub retry_backoff: Duration,
}

impl ClientSettings {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            username: username.into(),
            password: password.into(),
            refresh_interval: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
        }
    }

    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::new(
            var("CATALOG_SERVER_URL").unwrap_or_else(|| "http://127.0.0.1:50051".to_string()),
            var("CATALOG_USERNAME").unwrap_or_else(|| "admin".to_string()),
            var("CATALOG_PASSWORD").unwrap_or_else(|| "secret".to_string()),
        );
        settings.refresh_interval =
            Duration::from_secs(parse_or(&var, "TOKEN_REFRESH_INTERVAL_SECS", 30)?);
        settings.retry_backoff =
            Duration::from_millis(parse_or(&var, "TOKEN_RETRY_BACKOFF_MS", 1000)?);
        Ok(settings)
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("refresh_interval", &self.refresh_interval)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}
