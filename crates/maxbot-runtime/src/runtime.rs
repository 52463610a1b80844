//! Bot runtime: one bot, its handlers and its polling loop.
//!
//! A [`BotRuntime`] owns the [`HandlerRegistry`] of one bot, so several bots
//! can run in the same process without sharing handler tables.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use maxbot_runtime::BotRuntime;
//!
//! let mut runtime = BotRuntime::builder()
//!     .config_file("maxbot.toml")
//!     .build()?;
//!
//! runtime.registry_mut().on_message(|ctx: MessageContext| async move {
//!     ctx.reply(ctx.text().to_owned()).await?;
//!     Ok::<_, HandlerError>(())
//! });
//!
//! runtime.run().await?;
//! ```
//!
//! Handlers must be registered before the runtime starts; the registry is
//! frozen when the polling loop is built.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use maxbot_core::BotApi;
use maxbot_framework::{Bot, BotOptions, Dispatcher, HandlerRegistry};
use maxbot_transport::HttpApi;

use crate::config::{ConfigLoader, MaxbotConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::polling::{PollingLoop, PollingOptions};

/// A bot with its handler registry, ready to poll.
pub struct BotRuntime {
    bot: Arc<Bot>,
    registry: HandlerRegistry,
    polling: PollingOptions,
}

impl BotRuntime {
    /// Creates a runtime over `api`.
    ///
    /// The registry normalizes command names with `options.case_sensitive`.
    pub fn new(api: Arc<dyn BotApi>, options: BotOptions) -> Self {
        let registry = HandlerRegistry::for_options(&options);
        Self {
            bot: Arc::new(Bot::new(api, options)),
            registry,
            polling: PollingOptions::default(),
        }
    }

    /// Creates a runtime builder that loads configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime talking to the HTTP API described by `config`.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    ///
    /// # Errors
    ///
    /// Returns a config error if `config` is invalid, or a transport error if
    /// the HTTP client cannot be built.
    pub fn from_config(config: &MaxbotConfig) -> RuntimeResult<Self> {
        validate_config(config)?;
        logging::init_from_config(&config.logging);

        let api = HttpApi::new(config.api.to_http_config(&config.bot.access_token))?;

        info!(
            base_url = %config.api.base_url,
            prefixes = ?config.bot.command_prefixes,
            polling_limit = config.polling.limit,
            "Runtime initialized from configuration"
        );

        Ok(Self::new(Arc::new(api), config.bot.to_options())
            .with_polling_options(PollingOptions::from(&config.polling)))
    }

    /// Replaces the polling options.
    pub fn with_polling_options(mut self, options: PollingOptions) -> Self {
        self.polling = options;
        self
    }

    /// Returns the polling options.
    pub fn polling_options(&self) -> PollingOptions {
        self.polling
    }

    /// Returns the bot.
    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Returns the handler registry for registration.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Freezes the registry and builds the polling loop.
    pub fn into_polling_loop(self) -> PollingLoop {
        let dispatcher = Dispatcher::new(self.registry, self.bot.options());
        PollingLoop::new(self.bot, dispatcher, self.polling)
    }

    /// Polls until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns the start-up error of the polling loop.
    pub async fn run(self) -> RuntimeResult<()> {
        info!("Bot is running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Polls until `shutdown` completes, then stops once the cycle in flight
    /// has fetched and dispatched its batch.
    ///
    /// # Errors
    ///
    /// Returns the start-up error of the polling loop.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let polling = self.into_polling_loop();
        let stop = polling.stop_handle();

        let run = polling.run();
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => return result,
            _ = shutdown => {
                info!("Shutdown requested");
                stop.stop();
            }
        }

        run.await
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// If no signal handler can be installed the error is logged and this
/// future never completes.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                return wait_for_ctrl_c().await;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builds a [`BotRuntime`] from loaded configuration.
///
/// ```rust,ignore
/// let runtime = BotRuntime::builder()
///     .config_file("config/maxbot.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: MaxbotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<BotRuntime> {
        let config = self.config_loader.load_validated()?;
        BotRuntime::from_config(&config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::RuntimeError;
    use crate::testing::{ScriptedApi, message_update};
    use maxbot_framework::{CommandContext, HandlerError};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_run_until_routes_commands_and_stops() {
        let api = Arc::new(ScriptedApi::new());
        api.push_batch(
            vec![message_update("/echo hello world"), message_update("/nope")],
            Some(5),
        );

        let options = BotOptions {
            command_prefixes: vec!["!".into(), "/".into()],
            ..BotOptions::default()
        };
        let mut runtime = BotRuntime::new(api.clone(), options);
        runtime
            .registry_mut()
            .on_command("echo", &["say"], |ctx: CommandContext| async move {
                ctx.reply(ctx.args.clone()).await?;
                Ok::<(), HandlerError>(())
            })
            .unwrap();

        let shutdown = Arc::new(Notify::new());
        let trigger = Arc::clone(&shutdown);
        api.on_exhausted(move || trigger.notify_one());

        runtime
            .run_until(async move { shutdown.notified().await })
            .await
            .unwrap();

        assert_eq!(api.sent_texts(), vec!["hello world"]);
        assert!(api.is_closed());
    }

    #[tokio::test]
    async fn test_registry_follows_case_option() {
        let api = Arc::new(ScriptedApi::new());
        let runtime = BotRuntime::new(
            api,
            BotOptions {
                case_sensitive: false,
                ..BotOptions::default()
            },
        );
        assert!(!runtime.registry().is_case_sensitive());
        assert_eq!(runtime.polling_options(), PollingOptions::default());
    }

    #[test]
    fn test_from_config_rejects_missing_token() {
        let result = BotRuntime::from_config(&MaxbotConfig::default());
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_from_config_applies_polling_options() {
        let mut config = MaxbotConfig::default();
        config.bot.access_token = "token".into();
        config.polling.limit = 50;
        config.polling.error_backoff_ms = 500;

        let runtime = BotRuntime::from_config(&config).unwrap();
        assert_eq!(
            runtime.polling_options(),
            PollingOptions {
                limit: 50,
                error_backoff: std::time::Duration::from_millis(500),
            }
        );
        assert_eq!(runtime.bot().options().command_prefixes, vec!["/"]);
    }
}
