//! Configuration for the maxbot runtime.
//!
//! Configuration is layered with figment: built-in defaults, then TOML/YAML
//! files, then `MAXBOT_*` environment variables, then programmatic overrides.
//! See [`ConfigLoader`] for the search rules.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, MaxbotConfig,
    PollingConfig, SpanEventConfig,
};
pub use validation::validate_config;
