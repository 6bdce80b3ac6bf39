use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use validator::{Validate, ValidationError};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub db_connect_timeout_secs: u64,

    /// `all_or_nothing` or `line_level`.
    #[serde(default = "default_approval_policy")]
    #[validate(custom = "validate_approval_policy")]
    pub approval_policy: String,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default = "default_true")]
    pub expiry_alerts_enabled: bool,

    #[serde(default = "default_expiry_scan_hours")]
    pub expiry_scan_interval_hours: u64,

    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,

    pub cors_allowed_origin: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_approval_policy() -> String {
    "all_or_nothing".to_string()
}

fn default_true() -> bool {
    true
}

fn default_expiry_scan_hours() -> u64 {
    24
}

fn default_event_capacity() -> usize {
    1024
}

fn validate_approval_policy(value: &str) -> Result<(), ValidationError> {
    match value {
        "all_or_nothing" | "line_level" => Ok(()),
        _ => Err(ValidationError::new("unknown approval policy")),
    }
}

impl AppConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads configuration from optional files and `APP_`-prefixed environment
/// variables, then validates it.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config: AppConfig = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP"))
        .build()?
        .try_deserialize()?;
    config
        .validate()
        .map_err(|e| ConfigError::Message(e.to_string()))?;
    Ok(config)
}

/// Installs the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pharmstock_api={level},tower_http=info")));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
