//! Adapter configuration loading from file and environment variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level adapter configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Adapter identity and sink endpoint.
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Inbound feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Status API network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity of this adapter and the sink it reports to.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    /// Name sent with every sink notification.
    #[serde(default = "default_adapter_name")]
    pub name: String,

    /// WebSocket endpoint of the sink.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Capacity of the bounded sink notification queue.
    #[serde(default = "default_sink_queue")]
    pub sink_queue: usize,
}

/// Streaming feed settings.
#[derive(Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the newline-delimited JSON status stream.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Optional bearer token sent with the stream request.
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Network configuration for the status API.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "thingmodel_tweets=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_adapter_name() -> String {
    "TweeterAdapter".to_string()
}

fn default_endpoint() -> String {
    "ws://localhost:8083/".to_string()
}

fn default_sink_queue() -> usize {
    1024
}

fn default_feed_url() -> String {
    "https://stream.twitter.com/1.1/statuses/sample.json".to_string()
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8084
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            name: default_adapter_name(),
            endpoint: default_endpoint(),
            sink_queue: default_sink_queue(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            token: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
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
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `THINGMODEL_ADAPTER_NAME` overrides `adapter.name`
/// - `THINGMODEL_ENDPOINT` overrides `adapter.endpoint`
/// - `THINGMODEL_SINK_QUEUE` overrides `adapter.sink_queue`
/// - `THINGMODEL_FEED_URL` overrides `feed.url`
/// - `THINGMODEL_FEED_TOKEN` overrides `feed.token`
/// - `THINGMODEL_HOST` overrides `server.host`
/// - `THINGMODEL_PORT` overrides `server.port`
/// - `THINGMODEL_LOG_LEVEL` overrides `logging.level`
/// - `THINGMODEL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
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

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup("THINGMODEL_ADAPTER_NAME") {
        config.adapter.name = name;
    }
    if let Some(endpoint) = lookup("THINGMODEL_ENDPOINT") {
        config.adapter.endpoint = endpoint;
    }
    if let Some(queue) = lookup("THINGMODEL_SINK_QUEUE") {
        if let Ok(parsed) = queue.parse() {
            config.adapter.sink_queue = parsed;
        }
    }
    if let Some(url) = lookup("THINGMODEL_FEED_URL") {
        config.feed.url = url;
    }
    if let Some(token) = lookup("THINGMODEL_FEED_TOKEN") {
        config.feed.token = Some(token).filter(|t| !t.is_empty());
    }
    if let Some(host) = lookup("THINGMODEL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("THINGMODEL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("THINGMODEL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("THINGMODEL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
