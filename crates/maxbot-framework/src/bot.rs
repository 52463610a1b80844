//! The bot handle shared by every context.
//!
//! [`Bot`] wraps a [`BotApi`] implementation together with the bot's
//! [`BotOptions`] and a cache of its own identity, populated by
//! [`Bot::get_me`]. Handlers reach it through their context and use it to
//! send messages.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use maxbot_core::{
    ApiError, ApiResult, BotApi, BotInfo, MAX_TEXT_LENGTH, Message, OutgoingMessage, TextFormat,
    UserId,
};

/// Delay before a send that failed with `attachment.not.ready` is repeated.
pub const ATTACHMENT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Options that shape command parsing and outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotOptions {
    /// Prefixes that introduce a command, tried in order.
    pub command_prefixes: Vec<String>,
    /// Whether `@username <prefix>` is also accepted as a command prefix.
    pub mention_prefix: bool,
    /// Whether prefixes and command names are matched case-sensitively.
    pub case_sensitive: bool,
    /// Format applied to outgoing messages that ask for the bot default.
    pub default_format: Option<TextFormat>,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            command_prefixes: vec!["/".to_owned()],
            mention_prefix: true,
            case_sensitive: true,
            default_format: None,
        }
    }
}

/// A running bot: API access, options and cached identity.
pub struct Bot {
    api: Arc<dyn BotApi>,
    options: BotOptions,
    identity: RwLock<Option<BotInfo>>,
}

impl Bot {
    /// Creates a bot on top of the given API client.
    pub fn new(api: Arc<dyn BotApi>, options: BotOptions) -> Self {
        Self {
            api,
            options,
            identity: RwLock::new(None),
        }
    }

    /// Returns the underlying API client.
    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    /// Returns the bot options.
    pub fn options(&self) -> &BotOptions {
        &self.options
    }

    /// Fetches the bot's own profile and caches it.
    pub async fn get_me(&self) -> ApiResult<BotInfo> {
        let info = self.api.get_me().await?;
        *self.identity.write() = Some(info.clone());
        Ok(info)
    }

    /// Returns the cached profile, if [`get_me`](Self::get_me) has succeeded.
    pub fn me(&self) -> Option<BotInfo> {
        self.identity.read().clone()
    }

    /// Returns the cached user ID of the bot.
    pub fn id(&self) -> Option<UserId> {
        self.identity.read().as_ref().map(|info| info.user_id)
    }

    /// Returns the cached username of the bot.
    pub fn username(&self) -> Option<String> {
        self.identity
            .read()
            .as_ref()
            .and_then(|info| info.username.clone())
    }

    /// Sends a message.
    ///
    /// A send rejected with `attachment.not.ready` is repeated once after
    /// [`ATTACHMENT_RETRY_DELAY`]; the outcome of the second attempt is
    /// returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the text is not shorter than
    /// [`MAX_TEXT_LENGTH`] characters, or any error from the API.
    pub async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Message> {
        let length = message.text.chars().count();
        if length >= MAX_TEXT_LENGTH {
            return Err(ApiError::invalid_request(format!(
                "message text must be shorter than {MAX_TEXT_LENGTH} characters, got {length}"
            )));
        }

        let default_format = self.options.default_format;
        match self.api.send_message(message, default_format).await {
            Err(ApiError::AttachmentNotReady) => {
                debug!(
                    delay_ms = ATTACHMENT_RETRY_DELAY.as_millis() as u64,
                    "Attachment not ready, retrying send"
                );
                tokio::time::sleep(ATTACHMENT_RETRY_DELAY).await;
                self.api.send_message(message, default_format).await
            }
            result => result,
        }
    }

    /// Replies to `message` in the chat it was delivered to.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the message has neither a chat
    /// nor a sender to reply to.
    pub async fn reply(&self, text: impl Into<String>, message: &Message) -> ApiResult<Message> {
        let Some(target) = message.reply_target() else {
            warn!(message_id = message.id(), "Cannot reply: message has no chat or sender");
            return Err(ApiError::invalid_request(
                "message has no chat or sender to reply to",
            ));
        };
        let outgoing = OutgoingMessage::new(target, text).reply_to(message.id());
        self.send_message(&outgoing).await
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("options", &self.options)
            .field("identity", &*self.identity.read())
            .finish()
    }
}
