//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the `KEYGATE`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use keygate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod issuance;
mod limits;
mod redis;
mod server;
mod sync;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use issuance::IssuanceConfig;
pub use limits::{LimitsConfig, ResourceLimit};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (shared counter store)
    pub redis: RedisConfig,

    /// Named rate limiter definitions
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Batch synchronization configuration
    pub sync: SyncConfig,

    /// Issuance and purchase-webhook configuration
    pub issuance: IssuanceConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `KEYGATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `KEYGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `KEYGATE__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("KEYGATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.limits.validate()?;
        self.sync.validate()?;
        self.issuance.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
