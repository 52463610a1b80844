//! The bot API contract.
//!
//! [`BotApi`] is the seam between the dispatch core and the network. The
//! production implementation lives in `maxbot-transport`; tests substitute a
//! scripted implementation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::model::{BotInfo, Message, OutgoingMessage, TextFormat, UpdateBatch};

/// Remote operations a bot needs from the Max API.
///
/// Implementations hold a session that must be opened with
/// [`open_session`](BotApi::open_session) before any other call and released
/// with [`close_session`](BotApi::close_session) on shutdown.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Opens the shared HTTP session. Opening an open session is a no-op.
    async fn open_session(&self) -> ApiResult<()>;

    /// Closes the shared HTTP session. Closing a closed session is a no-op.
    async fn close_session(&self) -> ApiResult<()>;

    /// Fetches information about the bot itself (`GET /me`).
    async fn get_me(&self) -> ApiResult<BotInfo>;

    /// Long-polls for new updates (`GET /updates`).
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of updates to return
    /// * `marker` - Marker from the previous batch; `None` on the first call
    async fn get_updates(&self, limit: u32, marker: Option<i64>) -> ApiResult<UpdateBatch>;

    /// Sends a message (`POST /messages`).
    ///
    /// `default_format` is applied when the message asks for the bot default.
    async fn send_message(
        &self,
        message: &OutgoingMessage,
        default_format: Option<TextFormat>,
    ) -> ApiResult<Message>;
}

/// A shared [`BotApi`] trait object.
pub type BoxedApi = Arc<dyn BotApi>;
