//! maxbot runtime: polling, configuration and logging.
//!
//! This crate turns the dispatch core of `maxbot-framework` into a running
//! bot:
//!
//! ```text
//!   MaxbotConfig ──► BotRuntime ──► PollingLoop ──► Dispatcher ──► handlers
//!   (figment)          │  owns           │  GET /updates
//!                      │  HandlerRegistry│  marker, back-off, stop
//!                      └── HttpApi ◄─────┘
//! ```
//!
//! - [`config`]: layered configuration (defaults, TOML/YAML, `MAXBOT_*` env)
//! - [`logging`]: `tracing-subscriber` setup driven by configuration
//! - [`PollingLoop`]: the fetch and dispatch cycle with failure isolation
//! - [`BotRuntime`]: one bot, its registry and its shutdown handling
//!
//! ```ignore
//! use maxbot_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BotRuntime::builder().build()?;
//!     runtime.registry_mut().on_ready(|bot| async move {
//!         tracing::info!(username = ?bot.username(), "ready");
//!     });
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod polling;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, MaxbotConfig, load_config, load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use polling::{PollState, PollingLoop, PollingOptions, StopHandle};
pub use runtime::{BotRuntime, RuntimeBuilder, wait_for_shutdown};

// Re-export tracing for use by bot code
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
