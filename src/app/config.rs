//! Application configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP transport settings
    pub http: HttpConfig,

    /// Probe run options
    pub probe: ProbeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// History file path override
    pub history_file: Option<PathBuf>,

    /// Maximum entries kept in probe history
    pub max_history_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Follow redirects
    pub follow_redirects: bool,

    /// Maximum redirect depth
    pub max_redirects: usize,

    /// User agent string
    pub user_agent: String,
}

/// Recognized probe options. Explicit range bounds override the
/// charset default; a non-zero `number_tokens` switches the run to
/// token harvesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeOptions {
    /// First character code, inclusive
    pub range_start: Option<u32>,

    /// Last character code, exclusive
    pub range_end: Option<u32>,

    /// Literal prepended to every candidate
    pub prefix: Option<String>,

    /// Literal appended to every candidate
    pub postfix: Option<String>,

    /// Rejection signature applied to response bodies
    pub signature: Option<String>,

    /// Name of the parameter to enumerate
    pub target_param: Option<String>,

    /// Delay between requests
    pub delay_duration: u64,

    /// Unit for the delay (ms, s, m)
    pub delay_unit: String,

    /// Number of blind token requests
    pub number_tokens: usize,

    /// Character set used when no explicit range is given
    pub charset: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            max_history_items: 1000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            follow_redirects: true,
            max_redirects: 10,
            user_agent: format!("sonda/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            range_start: None,
            range_end: None,
            prefix: None,
            postfix: None,
            signature: None,
            target_param: None,
            delay_duration: 0,
            delay_unit: "ms".to_string(),
            number_tokens: 0,
            charset: "ascii".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            let config: Config = toml::from_str(&contents)
                .with_context(|| "Failed to parse configuration file")?;

            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "sonda", "sonda")
            .context("Failed to determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.http.request_timeout, 30);
        assert_eq!(config.probe.delay_unit, "ms");
        assert_eq!(config.probe.charset, "ascii");
        assert_eq!(config.probe.number_tokens, 0);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [probe]
            target_param = "pin"
            signature = "denied"
            range_start = 65
            range_end = 91
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.target_param.as_deref(), Some("pin"));
        assert_eq!(config.probe.range_start, Some(65));
        assert_eq!(config.probe.delay_unit, "ms");
        assert_eq!(config.http.max_redirects, 10);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.probe.number_tokens = 20;
        config.probe.delay_duration = 250;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.probe.number_tokens, 20);
        assert_eq!(parsed.probe.delay_duration, 250);
    }
}
