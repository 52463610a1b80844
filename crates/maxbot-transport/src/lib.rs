//! # maxbot transport
//!
//! HTTP access to the Max bot API.
//!
//! ```text
//! ┌──────────────────────┐
//! │  maxbot-framework    │  Bot, Dispatcher
//! ├──────────────────────┤
//! │  maxbot-core         │  BotApi trait
//! ├──────────────────────┤
//! │  maxbot-transport    │  <- This crate (reqwest)
//! ├──────────────────────┤
//! │  botapi.max.ru       │
//! └──────────────────────┘
//! ```
//!
//! ```rust,ignore
//! use maxbot_transport::{HttpApi, HttpApiConfig};
//!
//! let api = HttpApi::new(HttpApiConfig::new(token))?;
//! api.open_session().await?;
//! let me = api.get_me().await?;
//! ```

pub mod http_client;

pub use http_client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpApi, HttpApiConfig};
