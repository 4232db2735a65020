//! Application configuration.
//!
//! Loaded from TOML, with `STRADDLE__SECTION__KEY` environment overrides
//! (e.g. `STRADDLE__HIGHLIGHT__WINDOW_MS=1500`).

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use straddle_dashboard::DashboardConfig;
use straddle_engine::{HighlightConfig, MAX_HIGHLIGHT_WINDOW_MS};
use straddle_ws::ConnectionConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "STRADDLE_CONFIG";

/// Config file used when neither `--config` nor `STRADDLE_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of environment overrides.
const ENV_PREFIX: &str = "STRADDLE";

/// Where the file layer of a loaded config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The config file did not exist; built-in defaults were used.
    Defaults,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream data service connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Highlight display window and countdown semantics.
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// Dashboard configuration.
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream WebSocket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// WebSocket URL of the data service.
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum consecutive reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Backoff cap (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Upper bound of the backoff jitter (ms).
    #[serde(default = "default_reconnect_jitter_ms")]
    pub reconnect_jitter_ms: u64,
    /// Dial timeout (ms).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Silence before a ping is sent (ms).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Pong deadline (ms).
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Capacity of the event channel between the client and the coordinator.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_url() -> String {
    "ws://127.0.0.1:5001/ws".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_reconnect_jitter_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_interval_ms() -> u64 {
    15_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_event_buffer() -> usize {
    1024
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_ms: default_reconnect_jitter_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl From<UpstreamConfig> for ConnectionConfig {
    fn from(cfg: UpstreamConfig) -> Self {
        Self {
            url: cfg.url,
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
            reconnect_jitter_ms: cfg.reconnect_jitter_ms,
            connect_timeout_ms: cfg.connect_timeout_ms,
            heartbeat_interval_ms: cfg.heartbeat_interval_ms,
            heartbeat_timeout_ms: cfg.heartbeat_timeout_ms,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Force JSON (true) or pretty (false) logs; unset follows `RUST_ENV`.
    #[serde(default)]
    pub json_logs: Option<bool>,
}

fn default_log_level() -> String {
    "info,straddle=debug".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: None,
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit > `STRADDLE_CONFIG` > default.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path` (if it exists) layered with environment overrides.
    pub fn load(path: &str) -> AppResult<(Self, ConfigSource)> {
        let mut builder = ::config::Config::builder();

        let source = if Path::new(path).exists() {
            builder = builder.add_source(::config::File::new(path, ::config::FileFormat::Toml));
            ConfigSource::File
        } else {
            ConfigSource::Defaults
        };

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        Ok((Self::build(builder)?, source))
    }

    /// Parse TOML text, without environment overrides.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        Self::build(
            ::config::Config::builder()
                .add_source(::config::File::from_str(content, ::config::FileFormat::Toml)),
        )
    }

    fn build(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> AppResult<Self> {
        let app: Self = builder.build()?.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> AppResult<()> {
        if self.highlight.window_ms == 0 || self.highlight.window_ms > MAX_HIGHLIGHT_WINDOW_MS {
            return Err(AppError::Config(format!(
                "highlight.window_ms must be between 1 and {MAX_HIGHLIGHT_WINDOW_MS}, got {}",
                self.highlight.window_ms
            )));
        }
        if self.upstream.event_buffer == 0 {
            return Err(AppError::Config(
                "upstream.event_buffer must be greater than 0".to_string(),
            ));
        }
        if !(self.upstream.url.starts_with("ws://") || self.upstream.url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "upstream.url must be a ws:// or wss:// URL, got {}",
                self.upstream.url
            )));
        }
        Ok(())
    }
}
