//! Client configuration with environment overrides. Values are public; never
//! put credentials here. The CLI layers its flags on top through the same
//! override path so both entry points normalise input identically.

use std::{env, path::PathBuf, time::Duration};
use url::Url;

use crate::session::AuthError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_REFRESH_RETRIES: u32 = 2;

pub const ENV_API_URL: &str = "OPSPILOT_API_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "OPSPILOT_TIMEOUT_SECONDS";
pub const ENV_REFRESH_RETRIES: &str = "OPSPILOT_REFRESH_RETRIES";
pub const ENV_STORE_DIR: &str = "OPSPILOT_STORE_DIR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub refresh_retries: u32,
    pub store_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            refresh_retries: DEFAULT_REFRESH_RETRIES,
            store_dir: default_store_dir(),
        }
    }
}

impl AppConfig {
    /// Defaults with `OPSPILOT_*` environment overrides applied.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_overrides(ConfigOverrides::from_env());
        config
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(value) = overrides.api_base_url {
            self.api_base_url = value;
        }
        if let Some(value) = overrides.request_timeout {
            self.request_timeout = value;
        }
        if let Some(value) = overrides.refresh_retries {
            self.refresh_retries = value;
        }
        if let Some(value) = overrides.store_dir {
            self.store_dir = value;
        }
    }

    /// Parsed API base URL.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the base URL is not an absolute http(s) URL.
    pub fn api_url(&self) -> Result<Url, AuthError> {
        let url = Url::parse(self.api_base_url.trim())
            .map_err(|err| AuthError::Config(format!("invalid API base URL: {err}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(AuthError::Config(format!(
                "unsupported API URL scheme: {scheme}"
            ))),
        }
    }
}

/// Optional replacements for [`AppConfig`] fields; `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub request_timeout: Option<Duration>,
    pub refresh_retries: Option<u32>,
    pub store_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    fn from_env() -> Self {
        Self {
            api_base_url: read_env(ENV_API_URL),
            request_timeout: read_env(ENV_TIMEOUT_SECONDS)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            refresh_retries: read_env(ENV_REFRESH_RETRIES).and_then(|value| value.parse().ok()),
            store_dir: read_env(ENV_STORE_DIR).map(PathBuf::from),
        }
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| normalize_value(&value))
}

/// Trims and rejects empty values so blank variables fall back to defaults.
#[must_use]
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `<config dir>/opspilot`, or `./.opspilot` when the platform has none.
#[must_use]
pub fn default_store_dir() -> PathBuf {
    dirs::config_dir().map_or_else(|| PathBuf::from(".opspilot"), |dir| dir.join("opspilot"))
}
