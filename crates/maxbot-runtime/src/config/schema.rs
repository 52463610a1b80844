//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use maxbot_core::TextFormat;
use maxbot_framework::BotOptions;
use maxbot_transport::{DEFAULT_BASE_URL, HttpApiConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MaxbotConfig {
    /// Bot credentials and command parsing.
    #[serde(default)]
    pub bot: BotConfig,

    /// API endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling loop settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials and command parsing options.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot access token.
    #[serde(default)]
    pub access_token: String,

    /// Command prefixes, tried in order.
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: Vec<String>,

    /// Accept `@username <prefix>` as a command prefix.
    #[serde(default = "default_true")]
    pub mention_prefix: bool,

    /// Match prefixes and command names case-sensitively.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Default format of outgoing messages (`markdown` or `html`).
    #[serde(default)]
    pub default_format: Option<TextFormat>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            command_prefixes: default_command_prefixes(),
            mention_prefix: true,
            case_sensitive: true,
            default_format: None,
        }
    }
}

impl BotConfig {
    /// Converts to framework bot options.
    pub fn to_options(&self) -> BotOptions {
        BotOptions {
            command_prefixes: self.command_prefixes.clone(),
            mention_prefix: self.mention_prefix,
            case_sensitive: self.case_sensitive,
            default_format: self.default_format,
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("access_token", &"<redacted>")
            .field("command_prefixes", &self.command_prefixes)
            .field("mention_prefix", &self.mention_prefix)
            .field("case_sensitive", &self.case_sensitive)
            .field("default_format", &self.default_format)
            .finish()
    }
}

fn default_command_prefixes() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_true() -> bool {
    true
}

// =============================================================================
// API
// =============================================================================

/// API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Converts to transport config for the given token.
    pub fn to_http_config(&self, access_token: &str) -> HttpApiConfig {
        HttpApiConfig::new(access_token)
            .base_url(self.base_url.clone())
            .timeout(Duration::from_millis(self.timeout_ms))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    60000
}

// =============================================================================
// Polling
// =============================================================================

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Maximum number of updates fetched per request.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Pause after a failed cycle, in milliseconds.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl PollingConfig {
    /// Returns the error back-off as a duration.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

fn default_limit() -> u32 {
    100
}

fn default_error_backoff_ms() -> u64 {
    3000
}

// =============================================================================
// Logging
// =============================================================================

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    #[default]
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output.
    #[default]
    Compact,
    /// Default `tracing-subscriber` output.
    Full,
    /// Multi-line human-friendly output.
    Pretty,
    /// JSON lines (requires the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The file at `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    /// Span creation.
    #[serde(default)]
    pub new: bool,
    /// Span entry.
    #[serde(default)]
    pub enter: bool,
    /// Span exit.
    #[serde(default)]
    pub exit: bool,
    /// Span close.
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Per-module levels, e.g. `maxbot_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Log file path when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Span events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            filters: HashMap::new(),
            file_path: None,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
        }
    }
}
