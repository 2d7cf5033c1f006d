use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 900; // 15 minutes
const DEFAULT_CHARGE_EXPIRATION_HOURS: i64 = 24;

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development" | "production")
    #[serde(default = "default_env")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to create missing tables on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins; unset allows any
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Base URL of the PIX payment provider API
    pub pix_api_base_url: String,

    /// Static bearer credential for the PIX payment provider
    pub pix_api_key: String,

    /// Outbound HTTP timeout (seconds) for provider calls
    #[serde(default = "default_http_timeout_secs")]
    pub pix_http_timeout_secs: u64,

    /// Seconds between charge status checks
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 1, message = "Poll interval must be at least 1 second"))]
    pub poll_interval_secs: u64,

    /// Maximum wall-clock seconds to watch a charge before giving up
    #[serde(default = "default_poll_timeout_secs")]
    #[validate(range(min = 1, message = "Poll timeout must be at least 1 second"))]
    pub poll_timeout_secs: u64,

    /// Hours until an issued charge expires at the provider
    #[serde(default = "default_charge_expiration_hours")]
    pub charge_expiration_hours: i64,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_env() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}
fn default_charge_expiration_hours() -> i64 {
    DEFAULT_CHARGE_EXPIRATION_HOURS
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn pix_http_timeout(&self) -> Duration {
        Duration::from_secs(self.pix_http_timeout_secs)
    }

    /// Interval must be shorter than the overall timeout, otherwise the
    /// poller would give up before its first status check.
    fn validate_poll_settings(&self) -> Result<(), ValidationErrors> {
        if self.poll_interval_secs >= self.poll_timeout_secs {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("range");
            err.message = Some("poll_interval_secs must be below poll_timeout_secs".into());
            errors.add("poll_interval_secs", err);
            return Err(errors);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Loads layered configuration: defaults, `config/{default,<env>}` files,
/// then `APP__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://checkout.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // pix_api_key has no default on purpose: a missing credential must
    // fail startup loudly instead of producing 401s per charge.
    if config.get_string("pix_api_key").is_err() {
        error!("PIX API key is not configured. Set APP__PIX_API_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "pix_api_key is required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;
    app_config.validate_poll_settings()?;

    Ok(app_config)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the
/// config-provided level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("pix_checkout_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            host: default_host(),
            port: default_port(),
            environment: default_env(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            pix_api_base_url: "https://provider.example/v1".into(),
            pix_api_key: "test-key".into(),
            pix_http_timeout_secs: default_http_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            charge_expiration_hours: default_charge_expiration_hours(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
        }
    }

    #[test]
    fn defaults_match_polling_contract() {
        let cfg = base_config();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.poll_timeout(), Duration::from_secs(900));
    }

    #[test]
    fn interval_longer_than_timeout_is_rejected() {
        let mut cfg = base_config();
        cfg.poll_interval_secs = 1000;
        assert!(cfg.validate_poll_settings().is_err());
    }
}
