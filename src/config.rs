use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::render::chart::scaled_size;

#[derive(Debug, Clone)]
pub struct Config {
    // Station
    pub device_base_url: String,
    pub request_timeout_seconds: u64,

    // Polling
    pub poll_interval_ms: u64,

    // Export
    pub export_dir: PathBuf,
    pub export_upscale: u32,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_base_url: "http://192.168.1.1".to_string(),
            request_timeout_seconds: 10,
            poll_interval_ms: 1000,
            export_dir: PathBuf::from("."),
            export_upscale: 2,
            chart_width: 800,
            chart_height: 400,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    /// for unset ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but does not parse
    /// or fails [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let var = |name: &str| env::var(name).ok();

        let config = Self {
            // Station
            device_base_url: var("DEVICE_BASE_URL")
                .unwrap_or(defaults.device_base_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout_seconds: parse_setting(
                "REQUEST_TIMEOUT_SECONDS",
                var("REQUEST_TIMEOUT_SECONDS").as_deref(),
                defaults.request_timeout_seconds,
            )?,

            // Polling
            poll_interval_ms: parse_setting(
                "POLL_INTERVAL_MS",
                var("POLL_INTERVAL_MS").as_deref(),
                defaults.poll_interval_ms,
            )?,

            // Export
            export_dir: var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            export_upscale: parse_setting(
                "EXPORT_UPSCALE",
                var("EXPORT_UPSCALE").as_deref(),
                defaults.export_upscale,
            )?,
            chart_width: parse_setting(
                "CHART_WIDTH",
                var("CHART_WIDTH").as_deref(),
                defaults.chart_width,
            )?,
            chart_height: parse_setting(
                "CHART_HEIGHT",
                var("CHART_HEIGHT").as_deref(),
                defaults.chart_height,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail much later.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.device_base_url.starts_with("http://")
            && !self.device_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(
                "DEVICE_BASE_URL",
                format!("expected an http(s) URL, got '{}'", self.device_base_url),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "POLL_INTERVAL_MS",
                "must be greater than zero".to_string(),
            ));
        }
        if self.export_upscale == 0 {
            return Err(ConfigError::Invalid(
                "EXPORT_UPSCALE",
                "must be greater than zero".to_string(),
            ));
        }
        if let Err(e) = scaled_size(self.chart_width, self.chart_height, self.export_upscale) {
            return Err(ConfigError::Invalid("CHART_WIDTH/CHART_HEIGHT", e.to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Parse `raw` as a setting, using `default` when it is unset.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` naming `name` if `raw` is set but does not parse.
pub fn parse_setting<T>(name: &'static str, raw: Option<&str>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid(name, format!("'{value}': {e}"))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    Invalid(&'static str, String),
}
