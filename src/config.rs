use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_COLLECTION_ROOT: &str = "Events";
const DEFAULT_OPEN_ORDER_STATUS: &str = "open";
const CONFIG_DIR: &str = "config";

/// Distribution mode selected for an event. `Grouped` is reserved: the
/// scheduler refuses to run it (see `scheduler::DistributionScheduler`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    Balanced,
    Grouped,
}

impl Default for DistributionMode {
    fn default() -> Self {
        DistributionMode::Balanced
    }
}

/// Application configuration for the order distribution and availability engine.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Root collection name under which all event-scoped documents live.
    /// Resolves the `Events/…` vs `PosEvents/…` ambiguity noted in the
    /// design notes: pick once, consistently, via configuration.
    #[serde(default = "default_collection_root")]
    #[validate(length(min = 1, message = "collection_root must not be empty"))]
    pub collection_root: String,

    /// HTTP server port for the RPC and trigger surface.
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Logging level passed to `tracing_subscriber::EnvFilter`.
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format when true, human-readable otherwise.
    #[serde(default)]
    pub log_json: bool,

    /// Default distribution mode for events that don't specify one.
    #[serde(default)]
    pub distribution_mode_default: DistributionMode,

    /// The literal `orderStatus` value that marks a distributed order "open".
    #[serde(default = "default_open_order_status")]
    #[validate(length(min = 1))]
    pub open_order_status: String,

    /// Title used for the sold-out refund notification.
    #[serde(default = "default_notification_title_soldout")]
    pub notification_title_soldout: String,

    /// Message body used for the sold-out refund notification.
    #[serde(default = "default_notification_message_soldout")]
    pub notification_message_soldout: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collection_root: default_collection_root(),
            server_port: default_port(),
            log_level: default_log_level(),
            log_json: false,
            distribution_mode_default: DistributionMode::default(),
            open_order_status: default_open_order_status(),
            notification_title_soldout: default_notification_title_soldout(),
            notification_message_soldout: default_notification_message_soldout(),
        }
    }
}

fn default_collection_root() -> String {
    DEFAULT_COLLECTION_ROOT.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_open_order_status() -> String {
    DEFAULT_OPEN_ORDER_STATUS.to_string()
}

fn default_notification_title_soldout() -> String {
    "Artikel ist/sind ausverkauft".to_string()
}

fn default_notification_message_soldout() -> String {
    "Unten stehenden Betrag erstatten und bestätigen".to_string()
}

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

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads configuration layered `default -> config/<env>.toml -> environment`.
///
/// Environment variables are read with the `APP__` prefix and `__` as the
/// nesting separator, e.g. `APP__SERVER_PORT=9090`.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_mode = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

    let builder = Config::builder()
        .set_default("collection_root", DEFAULT_COLLECTION_ROOT)?
        .set_default("server_port", DEFAULT_PORT as i64)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("open_order_status", DEFAULT_OPEN_ORDER_STATUS)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_mode)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    Ok(config)
}

/// Initializes `tracing` using the configured level and format.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("order_distribution_engine={},tower_http=debug", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
