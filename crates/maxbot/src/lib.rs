//! # maxbot
//!
//! An asynchronous SDK for building bots on the Max messenger Bot API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────────────────────────┐
//! │ PollingLoop │────▶│ Dispatcher │────▶│ message / bot_started /       │
//! │ GET /updates│     │            │     │ message_callback handlers     │
//! └─────────────┘     └─────┬──────┘     └───────────────────────────────┘
//!        ▲                  │
//!        │                  └──────────▶ CommandRouter ──▶ command handlers
//!        │                                                      │
//!     HttpApi ◀──────────────── Bot::send_message ◀─────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, the polling loop and shutdown
//! - **Framework**: handler registry, dispatch, command routing, per-user FSM
//! - **Transport**: the HTTP client for the Bot API
//! - **Core**: wire models, the [`BotApi`](core::BotApi) contract and errors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BotRuntime::builder().build()?;
//!
//!     runtime
//!         .registry_mut()
//!         .on_command("ping", &[], |ctx: CommandContext| async move {
//!             ctx.reply("pong").await?;
//!             Ok::<_, HandlerError>(())
//!         })?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use maxbot_core as core;
pub use maxbot_framework as framework;
pub use maxbot_runtime as runtime;
pub use maxbot_transport as transport;

/// Commonly used types for building bots.
///
/// ```rust,ignore
/// use maxbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use maxbot_runtime::{BotRuntime, MaxbotConfig, PollingLoop, RuntimeError, StopHandle};

    // Handler registration and contexts
    pub use maxbot_framework::{
        Bot, BotOptions, BotStartContext, CallbackContext, CommandContext, Filter,
        HandlerError, HandlerRegistry, HandlerResult, MessageContext,
    };

    // Conversation state
    pub use maxbot_framework::{FsmCursor, FsmData, FsmStore};

    // Wire models
    pub use maxbot_core::{
        Format, Message, OutgoingMessage, SendTarget, TextFormat, UpdateKind, User, UserId,
    };
}
