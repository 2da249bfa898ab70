//! Runtime configuration, defaults and validation, plus optional config file
//! loading. File search order: ./websift.toml, then
//! $XDG_CONFIG_HOME/websift/config.toml (or ~/.config/websift/config.toml).

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::sink::OutputFormat;

pub const DEFAULT_USER_AGENT: &str = "websift/0.1";
pub const DEFAULT_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_OUTPUT_PATH: &str = "results.json";

const CONFIG_FILE_NAME: &str = "websift.toml";

/// Everything a run needs. Invalid values are caught by [`validate`] before
/// any network or file activity.
///
/// [`validate`]: ScrapeConfig::validate
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Identifying User-Agent header sent with every request.
    pub user_agent: String,
    /// Minimum interval between request dispatches, in seconds.
    pub delay_secs: f64,
    /// Total attempts per URL (first try included).
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: f64,
    pub format: OutputFormat,
    pub output_path: PathBuf,
    /// Whole-run cutoff in seconds; `None` disables it.
    pub run_timeout_secs: Option<f64>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            delay_secs: DEFAULT_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            format: OutputFormat::Json,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            run_timeout_secs: None,
        }
    }
}

impl ScrapeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent must not be empty".to_string(),
            ));
        }
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(ConfigError::Validation(format!(
                "delay_secs must be a finite number >= 0, got {}",
                self.delay_secs
            )));
        }
        if self.max_retries < 1 {
            return Err(ConfigError::Validation(format!(
                "max_retries must be >= 1, got {}",
                self.max_retries
            )));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "timeout_secs must be a finite number > 0, got {}",
                self.timeout_secs
            )));
        }
        if let Some(run_timeout) = self.run_timeout_secs {
            if !run_timeout.is_finite() || run_timeout <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "run_timeout_secs must be a finite number > 0, got {}",
                    run_timeout
                )));
            }
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Gate delay as a `Duration`; out-of-range values collapse to zero.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Request timeout as a `Duration`; out-of-range values fall back to the
    /// default.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|d| *d > Duration::ZERO)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }
}

/// Config file / validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Config file contents. All fields optional; only present keys override
/// defaults, and command-line flags override both.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct FileConfig {
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub delay_secs: Option<f64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<f64>,
    /// Total attempts per URL.
    pub max_retries: Option<u32>,
    /// Output format name: "json" or "csv".
    pub format: Option<String>,
    /// Output file path.
    pub output_path: Option<PathBuf>,
    /// Whole-run cutoff in seconds.
    pub run_timeout_secs: Option<f64>,
}

/// Search order: (1) ./websift.toml, (2) $XDG_CONFIG_HOME/websift/config.toml.
/// Missing files return Ok(None); a present but unreadable or invalid file
/// returns Err.
pub fn load_file_config() -> Result<Option<FileConfig>, ConfigError> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("websift").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}
