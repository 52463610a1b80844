//! # maxbot framework
//!
//! Update dispatch for bots built on the Max bot API.
//!
//! - [`HandlerRegistry`]: handlers grouped by update kind, plus commands
//! - [`Dispatcher`]: routes one update at a time to the registry
//! - [`CommandRouter`]: prefix matching and argument splitting
//! - [`Bot`]: API access, options and cached identity shared by contexts
//! - [`FsmStore`] / [`FsmCursor`]: per-user conversation state
//!
//! ```text
//!              ┌──────────────────────────┐
//!  Update ───▶ │        Dispatcher        │
//!              │  message ─▶ handlers     │
//!              │          └▶ CommandRouter│──▶ command handlers
//!              │  bot_started ─▶ handlers │
//!              │  callback ─▶ handlers    │
//!              └──────────────────────────┘
//! ```

pub mod bot;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod fsm;
pub mod handler;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::{ATTACHMENT_RETRY_DELAY, Bot, BotOptions};
pub use command::{CommandRouter, ParsedCommand};
pub use context::{BotStartContext, CallbackContext, CommandContext, MessageContext};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{
    DispatchError, DispatchResult, FsmError, FsmResult, HandlerError, HandlerResult,
    RegistryError, RegistryResult,
};
pub use filter::{Filter, FilterText, PredicateFn};
pub use fsm::{FsmCursor, FsmData, FsmStore};
pub use handler::{BoxedHandler, Handler, IntoHandlerResult, into_handler};
pub use registry::{HandlerRegistry, normalize_command};
