//! # maxbot core
//!
//! Domain model, error taxonomy and API contract shared by every layer of
//! the maxbot SDK.
//!
//! ## Layout
//!
//! - [`model`]: users, messages, callbacks and updates as delivered by the
//!   Max bot API
//! - [`api`]: the [`BotApi`] trait implemented by the HTTP transport
//! - [`error`]: transport, decode and API errors
//!
//! ```text
//! ┌───────────┐  UpdateBatch   ┌────────────┐  Update   ┌──────────┐
//! │ Transport │───────────────▶│  Polling   │──────────▶│ Dispatch │
//! │ (BotApi)  │◀───────────────│   loop     │           │   core   │
//! └───────────┘ OutgoingMessage└────────────┘           └──────────┘
//! ```

pub mod api;
pub mod error;
pub mod model;

pub use api::{BotApi, BoxedApi};
pub use error::{
    ApiError, ApiResult, DecodeError, DecodeResult, TransportError, TransportResult,
};
pub use model::*;

pub use async_trait::async_trait;
