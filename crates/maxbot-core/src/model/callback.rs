//! Button callbacks and bot-start events.

use serde::{Deserialize, Serialize};

use super::user::{ChatId, User};

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    /// Unique callback ID, used to answer the callback.
    pub callback_id: String,
    /// Press time, in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Payload attached to the button.
    #[serde(default)]
    pub payload: Option<String>,
    /// The user who pressed the button.
    pub user: User,
}

impl Callback {
    /// Returns the button payload, or an empty string if none was attached.
    pub fn payload(&self) -> &str {
        self.payload.as_deref().unwrap_or("")
    }
}

/// A user started a dialog with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStartPayload {
    /// Dialog chat ID.
    pub chat_id: ChatId,
    /// The user who started the bot.
    pub user: User,
    /// Deep-link payload, if the bot was started through a link.
    #[serde(default)]
    pub payload: Option<String>,
    /// Event time, in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// The user's locale.
    #[serde(default)]
    pub user_locale: Option<String>,
}
