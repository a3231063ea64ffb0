//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log storage settings.
    #[serde(default)]
    pub logs: LogsConfig,

    /// Live-tail settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging settings for this process.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static client files served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Where log events are read from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsConfig {
    /// Directory containing `*.log` files. Required: the watcher refuses to
    /// start without it.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Live-tail tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Capacity of each viewer's delivery channel. Events beyond this
    /// backlog are dropped for that viewer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Length of the trailing window used when a request gives no time bounds.
    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: i64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "logtail_watch=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    7020
}

fn default_channel_capacity() -> usize {
    50
}

fn default_window_minutes() -> i64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            default_window_minutes: default_window_minutes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `LOGTAIL_HOST` overrides `server.host`
/// - `LOGTAIL_PORT` overrides `server.port`
/// - `LOGTAIL_LOG_DIR` overrides `logs.directory`
/// - `LOGTAIL_LOG_LEVEL` overrides `logging.level`
/// - `LOGTAIL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if `stream.channel_capacity` is zero.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("LOGTAIL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("LOGTAIL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(dir) = std::env::var("LOGTAIL_LOG_DIR") {
        if !dir.trim().is_empty() {
            config.logs.directory = Some(PathBuf::from(dir));
        }
    }
    if let Ok(level) = std::env::var("LOGTAIL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("LOGTAIL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    // tokio's bounded channel panics on zero capacity.
    if config.stream.channel_capacity == 0 {
        return Err(ConfigError::Invalid(
            "stream.channel_capacity must be at least 1".to_string(),
        ));
    }

    Ok(config)
}
