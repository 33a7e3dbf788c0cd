use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::services::quantities::TotalPolicy;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://workorders.db?mode=rwc";
const DEFAULT_DISPLAY_ID_WIDTH: usize = 6;
const DEFAULT_CREATE_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 10;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 250;
const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 2.0;
const DEFAULT_PAGE_SIZE: u64 = 25;
const DEFAULT_MAX_PAGE_SIZE: u64 = 200;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Work order lifecycle settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WorkOrderConfig {
    /// Minimum width of generated display ids (zero-padded)
    #[serde(default = "default_display_id_width")]
    #[validate(range(min = 1, max = 18))]
    pub display_id_width: usize,

    /// How update recomputes the derived total
    #[serde(default)]
    pub total_policy: TotalPolicy,

    /// Attempts for create when a generated display id collides
    #[serde(default = "default_create_max_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub create_max_attempts: u32,

    /// Upper bound of the first randomized pause after a collision, in milliseconds
    #[serde(default = "default_retry_initial_delay_ms")]
    #[validate(range(max = 10000))]
    pub retry_initial_delay_ms: u64,

    /// Cap on the pause between create attempts, in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    #[validate(range(max = 60000))]
    pub retry_max_delay_ms: u64,

    /// Growth of the pause after every collision
    #[serde(default = "default_retry_backoff_factor")]
    #[validate(range(min = 1.0, max = 10.0))]
    pub retry_backoff_factor: f64,

    /// Page size used by list when the caller gives none
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound for any requested page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for WorkOrderConfig {
    fn default() -> Self {
        Self {
            display_id_width: default_display_id_width(),
            total_policy: TotalPolicy::default(),
            create_max_attempts: default_create_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl WorkOrderConfig {
    fn validate_page_sizes(&self) -> Result<(), ValidationError> {
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            let mut err = ValidationError::new("page_size");
            err.message = Some("default_page_size must be between 1 and max_page_size".into());
            return Err(err);
        }
        Ok(())
    }

    fn validate_retry_delays(&self) -> Result<(), ValidationError> {
        if self.retry_initial_delay_ms > self.retry_max_delay_ms {
            let mut err = ValidationError::new("retry_delay");
            err.message = Some("retry_initial_delay_ms cannot exceed retry_max_delay_ms".into());
            return Err(err);
        }
        Ok(())
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1, max = 100000))]
    pub event_channel_capacity: usize,

    /// Work order lifecycle settings
    #[serde(default)]
    #[validate]
    pub work_orders: WorkOrderConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the connection and environment
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            work_orders: WorkOrderConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    fn validate_additional_constraints(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = validator::ValidationErrors::new();
        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }
        if let Err(err) = self.work_orders.validate_page_sizes() {
            errors.add("work_orders", err);
        }
        if let Err(err) = self.work_orders.validate_retry_delays() {
            errors.add("work_orders", err);
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
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
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_display_id_width() -> usize {
    DEFAULT_DISPLAY_ID_WIDTH
}

fn default_create_max_attempts() -> u32 {
    DEFAULT_CREATE_MAX_ATTEMPTS
}

fn default_retry_initial_delay_ms() -> u64 {
    DEFAULT_RETRY_INITIAL_DELAY_MS
}

fn default_retry_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

fn default_retry_backoff_factor() -> f64 {
    DEFAULT_RETRY_BACKOFF_FACTOR
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_log_level");
            err.message = Some("log_level must be one of trace, debug, info, warn, error".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("workorder_ledger={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
