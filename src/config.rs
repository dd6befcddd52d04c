use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TrackerError;
use crate::{DEFAULT_API_BASE, DEFAULT_TIMEZONE, MAX_PAGE_SIZE};

/// Default settings file path. The file is optional.
pub const SETTINGS_PATH: &str = "tracker.toml";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub timezone: Tz,
    pub settings: SettingsConfig,
}

/// Marketplace credentials and endpoint.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub key: String,
    pub secret: String,
    pub seller_id: String,
}

/// MySQL connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

/// Tunables read from `tracker.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Listings requested per page (marketplace limit is 200).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Timeout for each outbound HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for acquiring a database connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Wait between submitting a price update and checking its batch.
    #[serde(default = "default_batch_check_delay")]
    pub batch_check_delay_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: SettingsConfig,
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_batch_check_delay() -> u64 {
    3
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            batch_check_delay_secs: default_batch_check_delay(),
        }
    }
}

impl SettingsConfig {
    /// Load settings from the given TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
            .map_err(|e| TrackerError::Configuration(format!("{}: {e}", path.display())))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        let file: SettingsFile = toml::from_str(contents).map_err(|e| e.to_string())?;
        file.settings.validate()?;
        Ok(file.settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn batch_check_delay(&self) -> Duration {
        Duration::from_secs(self.batch_check_delay_secs)
    }
}

/// Fetch a required, non-blank value.
fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, TrackerError> {
    optional(lookup, key).ok_or_else(|| TrackerError::Configuration(format!("{key} is not set")))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ApiConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
        let raw_base =
            optional(lookup, "API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let base_url = Url::parse(raw_base.trim_end_matches('/'))
            .map_err(|e| TrackerError::Configuration(format!("API_BASE_URL {raw_base:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TrackerError::Configuration(format!(
                "API_BASE_URL must be http(s), got {raw_base:?}"
            )));
        }
        Ok(Self {
            base_url,
            key: required(lookup, "API_KEY")?,
            secret: required(lookup, "API_SECRET")?,
            seller_id: required(lookup, "SELLER_ID")?,
        })
    }

    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(&env_lookup)
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("seller_id", &self.seller_id)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
        let port = match optional(lookup, "DB_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| TrackerError::Configuration(format!("DB_PORT {raw:?} is not a port")))?,
            None => 3306,
        };
        Ok(Self {
            host: required(lookup, "DB_HOST")?,
            port,
            user: required(lookup, "DB_USER")?,
            // An empty password is valid for local MySQL setups.
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name: required(lookup, "DB_NAME")?,
        })
    }

    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(&env_lookup)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Resolve `TIMEZONE` as an IANA zone name.
pub fn timezone_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Tz, TrackerError> {
    let raw = optional(lookup, "TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    raw.parse::<Tz>()
        .map_err(|_| TrackerError::Configuration(format!("TIMEZONE {raw:?} is not a known zone")))
}

pub fn timezone_from_env() -> Result<Tz, TrackerError> {
    timezone_from_lookup(&env_lookup)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl AppConfig {
    pub fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        settings: SettingsConfig,
    ) -> Result<Self, TrackerError> {
        Ok(Self {
            api: ApiConfig::from_lookup(lookup)?,
            database: DatabaseConfig::from_lookup(lookup)?,
            timezone: timezone_from_lookup(lookup)?,
            settings,
        })
    }

    /// Build the config from process environment plus the given settings.
    pub fn from_env(settings: SettingsConfig) -> Result<Self, TrackerError> {
        Self::from_lookup(&env_lookup, settings)
    }
}
