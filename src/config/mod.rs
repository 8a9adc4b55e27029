//! Configuration layer: typed settings with layered precedence (file → env).

use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const ENV_PREFIX: &str = "FOLIO";

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SEARCH_INDEX: &str = "posts";
const DEFAULT_LISTING_TTL_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub search: SearchSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Load settings from an optional `config/default.*` file overlaid with
    /// `FOLIO_*` environment variables (`FOLIO_DATABASE__URL`, ...).
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Base URL of the search backend, e.g. `http://localhost:9200`.
    pub url: String,
    #[serde(default = "default_search_index")]
    pub index: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_listing_ttl_secs")]
    pub listing_ttl_secs: u64,
}

impl CacheSettings {
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            listing_ttl_secs: default_listing_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level", deserialize_with = "parse_level")]
    pub level: LevelFilter,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_search_index() -> String {
    DEFAULT_SEARCH_INDEX.to_string()
}

fn default_listing_ttl_secs() -> u64 {
    DEFAULT_LISTING_TTL_SECS
}

fn default_log_level() -> LevelFilter {
    LevelFilter::INFO
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

fn parse_level<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    LevelFilter::from_str(&raw).map_err(serde::de::Error::custom)
}
