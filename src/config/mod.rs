//! Configuration management
//!
//! Configuration is loaded from `config.yml` and can be overridden through
//! `QUILLPRESS_*` environment variables. Every field has a default, so a
//! missing or empty file yields a runnable configuration.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Tenant resolution
    #[serde(default)]
    pub tenancy: TenancyConfig,
    /// Dashboard aggregation
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Scheduled publishing
    #[serde(default)]
    pub publishing: PublishingConfig,
    /// Reader engagement (comments, likes)
    #[serde(default)]
    pub engagement: EngagementConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin for the dashboard front-end
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/quillpress.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

impl DatabaseDriver {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "mysql" => Some(Self::Mysql),
            _ => None,
        }
    }
}

/// In-process cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Entry time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_ttl() -> u64 {
    60
}

/// Tenant resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Tenant slug used when a request carries no `X-Tenant` header
    #[serde(default = "default_tenant")]
    pub default_tenant: String,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_tenant: default_tenant(),
        }
    }
}

fn default_tenant() -> String {
    "default".to_string()
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Length of the current and previous windows compared for trends
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            trend_window_days: default_trend_window_days(),
        }
    }
}

fn default_trend_window_days() -> u32 {
    30
}

/// Longest accepted trend window, ten years
pub const MAX_TREND_WINDOW_DAYS: u32 = 3650;

/// Scheduled publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// How often due scheduled articles are published (0 disables the task)
    #[serde(default = "default_scheduler_interval")]
    pub scheduler_interval_secs: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_secs: default_scheduler_interval(),
        }
    }
}

fn default_scheduler_interval() -> u64 {
    60
}

/// Reader engagement configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// New comments start as `pending` when enabled
    #[serde(default)]
    pub comment_moderation: bool,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is reported
    /// with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply `QUILLPRESS_*` overrides
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tenancy.default_tenant.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tenancy.default_tenant cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_TREND_WINDOW_DAYS).contains(&self.dashboard.trend_window_days) {
            return Err(ConfigError::ValidationError(format!(
                "dashboard.trend_window_days must be between 1 and {}",
                MAX_TREND_WINDOW_DAYS
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QUILLPRESS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("QUILLPRESS_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(origin) = std::env::var("QUILLPRESS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        if let Some(driver) = std::env::var("QUILLPRESS_DATABASE_DRIVER")
            .ok()
            .and_then(|d| DatabaseDriver::parse(&d))
        {
            self.database.driver = driver;
        }
        if let Ok(url) = std::env::var("QUILLPRESS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("QUILLPRESS_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(capacity) = env_parse::<u64>("QUILLPRESS_CACHE_MAX_CAPACITY") {
            self.cache.max_capacity = capacity;
        }

        if let Ok(tenant) = std::env::var("QUILLPRESS_TENANCY_DEFAULT_TENANT") {
            if !tenant.trim().is_empty() {
                self.tenancy.default_tenant = tenant;
            }
        }

        if let Some(days) = env_parse::<u32>("QUILLPRESS_DASHBOARD_TREND_WINDOW_DAYS") {
            if days > 0 {
                self.dashboard.trend_window_days = days;
            }
        }

        if let Some(secs) = env_parse::<u64>("QUILLPRESS_PUBLISHING_SCHEDULER_INTERVAL_SECS") {
            self.publishing.scheduler_interval_secs = secs;
        }

        if let Some(moderation) = env_parse::<bool>("QUILLPRESS_ENGAGEMENT_COMMENT_MODERATION") {
            self.engagement.comment_moderation = moderation;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches the process environment.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "QUILLPRESS_SERVER_HOST",
    "QUILLPRESS_SERVER_PORT",
    "QUILLPRESS_SERVER_CORS_ORIGIN",
    "QUILLPRESS_DATABASE_DRIVER",
    "QUILLPRESS_DATABASE_URL",
    "QUILLPRESS_CACHE_TTL_SECONDS",
    "QUILLPRESS_CACHE_MAX_CAPACITY",
    "QUILLPRESS_TENANCY_DEFAULT_TENANT",
    "QUILLPRESS_DASHBOARD_TREND_WINDOW_DAYS",
    "QUILLPRESS_PUBLISHING_SCHEDULER_INTERVAL_SECS",
    "QUILLPRESS_ENGAGEMENT_COMMENT_MODERATION",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            1u64..=86_400,
            "[a-z][a-z0-9-]{0,15}",
            1u32..=365,
            prop::bool::ANY,
        )
            .prop_map(|(host, port, driver, ttl, tenant, window, moderation)| Config {
                server: ServerConfig {
                    host,
                    port,
                    cors_origin: default_cors_origin(),
                },
                database: DatabaseConfig {
                    driver,
                    url: default_database_url(),
                },
                cache: CacheConfig {
                    max_capacity: default_max_capacity(),
                    ttl_seconds: ttl,
                },
                tenancy: TenancyConfig {
                    default_tenant: tenant,
                },
                dashboard: DashboardConfig {
                    trend_window_days: window,
                },
                publishing: PublishingConfig::default(),
                engagement: EngagementConfig {
                    comment_moderation: moderation,
                },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_roundtrips_through_yaml(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.server.host, parsed.server.host);
            prop_assert_eq!(config.server.port, parsed.server.port);
            prop_assert_eq!(config.database.driver, parsed.database.driver);
            prop_assert_eq!(config.cache.ttl_seconds, parsed.cache.ttl_seconds);
            prop_assert_eq!(config.tenancy.default_tenant, parsed.tenancy.default_tenant);
            prop_assert_eq!(config.dashboard.trend_window_days, parsed.dashboard.trend_window_days);
            prop_assert_eq!(config.engagement.comment_moderation, parsed.engagement.comment_moderation);
        }

        #[test]
        fn wrong_types_are_rejected(yaml in prop_oneof![
            Just("server:\n  port: true"),
            Just("server:\n  port: [1, 2]"),
            Just("database:\n  driver: postgres"),
            Just("cache:\n  ttl_seconds: -5"),
            Just("dashboard: \"weekly\""),
            Just("engagement:\n  comment_moderation: sometimes"),
        ]) {
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");
            prop_assert!(Config::load(file.path()).is_err());
        }
    }
}
