//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Structured values use the `NERIN` prefix with `__` as the
//! nesting separator; the deployment-level variables the storefront has always
//! used (`MP_ACCESS_TOKEN`, `WEBHOOK_SECRET`, `DIAG_SECRET`, ...) are layered on
//! top as overrides.
//!
//! # Example
//!
//! ```no_run
//! use nerin_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod ops;
mod payment;
mod server;
mod storage;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ops::OpsConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, LogFormat, ServerConfig};
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;
use std::env;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Order store selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// PostgreSQL connection, required when the postgres backend is selected
    pub database: Option<DatabaseConfig>,

    /// Mercado Pago credentials and webhook secret
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Diagnostic and health endpoint gating
    #[serde(default)]
    pub ops: OpsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `NERIN__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `NERIN__STORAGE__BACKEND=postgres` -> `storage.backend = postgres`
    /// - `MP_ACCESS_TOKEN=...` -> `payment.access_token`
    /// - `WEBHOOK_SECRET` (or `MP_WEBHOOK_SECRET`) -> `payment.webhook_secret`
    /// - `DIAG_SECRET`, `ADMIN_PROBE_TOKEN`, `ENABLE_MP_WEBHOOK_HEALTH` -> `ops.*`
    /// - `DATABASE_URL` -> `database.url`, `PORT` -> `server.port`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let webhook_secret = non_empty_var("WEBHOOK_SECRET").or_else(|| non_empty_var("MP_WEBHOOK_SECRET"));

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NERIN")
                    .separator("__"),
            )
            .set_override_option("payment.access_token", non_empty_var("MP_ACCESS_TOKEN"))?
            .set_override_option("payment.webhook_secret", webhook_secret)?
            .set_override_option("ops.diag_secret", non_empty_var("DIAG_SECRET"))?
            .set_override_option("ops.admin_probe_token", non_empty_var("ADMIN_PROBE_TOKEN"))?
            .set_override_option(
                "ops.enable_webhook_health",
                env_flag("ENABLE_MP_WEBHOOK_HEALTH"),
            )?
            .set_override_option("database.url", non_empty_var("DATABASE_URL"))?
            .set_override_option("server.port", non_empty_var("PORT"))?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.storage.validate()?;
        if self.storage.backend == StorageBackend::Postgres {
            self.database
                .as_ref()
                .ok_or(ValidationError::MissingRequired("DATABASE_URL"))?
                .validate()?;
        }
        self.payment.validate()?;
        self.ops.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a boolean flag: `1/true/yes` is on, `0/false/no/""` is off,
/// anything else leaves the configured default in place.
pub(crate) fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    parse_flag(&raw)
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}
