//! Contexts handed to handlers.
//!
//! Each update kind has its own context type. A fresh context is built for
//! every handler invocation, so handlers own their context and may move it
//! into spawned work.
//!
//! - [`MessageContext`]: a new message (`message_created`)
//! - [`CommandContext`]: a message that resolved to a registered command
//! - [`CallbackContext`]: an inline button press (`message_callback`)
//! - [`BotStartContext`]: a user started the bot (`bot_started`)

use std::sync::Arc;

use maxbot_core::{ApiResult, BotStartPayload, Callback, Message, OutgoingMessage, SendTarget};

use crate::bot::Bot;

// =============================================================================
// MessageContext
// =============================================================================

/// Context for a `message_created` update.
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// The bot that received the message.
    pub bot: Arc<Bot>,
    /// The message.
    pub message: Message,
    /// The sender's locale.
    pub user_locale: Option<String>,
}

impl MessageContext {
    /// Returns the message text.
    pub fn text(&self) -> &str {
        self.message.text()
    }

    /// Replies to the message.
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        self.bot.reply(text, &self.message).await
    }
}

// =============================================================================
// CommandContext
// =============================================================================

/// Context for a resolved command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The bot that received the command.
    pub bot: Arc<Bot>,
    /// The message carrying the command.
    pub message: Message,
    /// The command name as typed, before normalization.
    pub name: String,
    /// Arguments after the command name, joined by single spaces.
    pub args: String,
    /// The sender's locale.
    pub user_locale: Option<String>,
}

impl CommandContext {
    /// Returns the arguments split on whitespace.
    pub fn args_list(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }

    /// Replies to the message carrying the command.
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        self.bot.reply(text, &self.message).await
    }
}

// =============================================================================
// CallbackContext
// =============================================================================

/// Context for a `message_callback` update.
#[derive(Debug, Clone)]
pub struct CallbackContext {
    /// The bot owning the pressed keyboard.
    pub bot: Arc<Bot>,
    /// The callback.
    pub callback: Callback,
    /// The message the keyboard was attached to, if delivered.
    pub message: Option<Message>,
    /// The presser's locale.
    pub user_locale: Option<String>,
}

impl CallbackContext {
    /// Returns the button payload.
    pub fn payload(&self) -> &str {
        self.callback.payload()
    }

    /// Sends `text` to where the keyboard was shown.
    ///
    /// Falls back to a direct message to the user who pressed the button
    /// when the originating message is unknown.
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        match &self.message {
            Some(message) => self.bot.reply(text, message).await,
            None => {
                let target = SendTarget::User(self.callback.user.user_id);
                self.bot
                    .send_message(&OutgoingMessage::new(target, text))
                    .await
            }
        }
    }
}

// =============================================================================
// BotStartContext
// =============================================================================

/// Context for a `bot_started` update.
#[derive(Debug, Clone)]
pub struct BotStartContext {
    /// The bot that was started.
    pub bot: Arc<Bot>,
    /// The event payload.
    pub payload: BotStartPayload,
}

impl BotStartContext {
    /// Sends `text` into the dialog that was just opened.
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        let outgoing = OutgoingMessage::new(SendTarget::Chat(self.payload.chat_id), text);
        self.bot.send_message(&outgoing).await
    }
}
