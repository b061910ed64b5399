use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "database";
const DEFAULT_WORKBOOK_API_BASE: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_WORKBOOK_TIMEOUT_SECS: u64 = 30;

/// Which persistence adapter backs the collaborator traits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Database,
    Workbook,
}

/// Spreadsheet workbook tables reached through the workbook REST API.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WorkbookConfig {
    /// API root, e.g. https://graph.microsoft.com/v1.0
    #[serde(default = "default_workbook_api_base")]
    #[validate(url)]
    pub api_base: String,

    #[serde(default)]
    pub site_id: Option<String>,

    /// Delegated bearer token used for every call
    #[serde(default)]
    pub access_token: Option<String>,

    /// Drive item id of the workbook holding the components table
    #[serde(default)]
    pub components_file_id: Option<String>,

    /// Drive item id of the workbook holding count history
    #[serde(default)]
    pub history_file_id: Option<String>,

    /// Drive item id of the workbook holding monthly cycle count sessions
    #[serde(default)]
    pub cycle_counts_file_id: Option<String>,

    /// Drive item id of the workbook holding weekly HSTD sessions
    #[serde(default)]
    pub weekly_counts_file_id: Option<String>,

    /// Drive item id of the workbook holding the curated high-volume SKU list
    #[serde(default)]
    pub high_volume_skus_file_id: Option<String>,

    #[serde(default = "default_workbook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            api_base: default_workbook_api_base(),
            site_id: None,
            access_token: None,
            components_file_id: None,
            history_file_id: None,
            cycle_counts_file_id: None,
            weekly_counts_file_id: None,
            high_volume_skus_file_id: None,
            timeout_secs: default_workbook_timeout_secs(),
        }
    }
}

impl WorkbookConfig {
    /// Names of required settings that are missing or blank.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let required = [
            ("site_id", &self.site_id),
            ("access_token", &self.access_token),
            ("components_file_id", &self.components_file_id),
            ("history_file_id", &self.history_file_id),
            ("cycle_counts_file_id", &self.cycle_counts_file_id),
            ("weekly_counts_file_id", &self.weekly_counts_file_id),
            ("high_volume_skus_file_id", &self.high_volume_skus_file_id),
        ];
        required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

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

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

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
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// "database" or "workbook"
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub store_backend: String,

    #[serde(default)]
    #[validate]
    pub workbook: WorkbookConfig,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            store_backend: default_store_backend(),
            workbook: WorkbookConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Selected store backend; unknown values fall back to the database.
    pub fn store_backend(&self) -> StoreBackend {
        if self.store_backend.eq_ignore_ascii_case("workbook") {
            StoreBackend::Workbook
        } else {
            StoreBackend::Database
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.store_backend() == StoreBackend::Workbook {
            let missing = self.workbook.missing_settings();
            if !missing.is_empty() {
                let mut err = ValidationError::new("workbook_settings_required");
                err.message = Some(
                    format!(
                        "store_backend = \"workbook\" requires APP__WORKBOOK__{{{}}}",
                        missing.join(",").to_ascii_uppercase()
                    )
                    .into(),
                );
                errors.add("workbook", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}

fn default_db_min_connections() -> u32 {
    2
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
    1024
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_workbook_api_base() -> String {
    DEFAULT_WORKBOOK_API_BASE.to_string()
}

fn default_workbook_timeout_secs() -> u64 {
    DEFAULT_WORKBOOK_TIMEOUT_SECS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_store_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "database" | "workbook" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_backend");
            err.message = Some("Must be one of: database, workbook".into());
            Err(err)
        }
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("cyclecount_api={},tower_http=debug", level);
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

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
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
        .set_default("database_url", "sqlite://cyclecount.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("store_backend", DEFAULT_STORE_BACKEND)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    from_config(config)
}

fn from_config(config: Config) -> Result<AppConfig, AppConfigError> {
    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(backend = %app_config.store_backend, "Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod cors_validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://counts.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }
}
