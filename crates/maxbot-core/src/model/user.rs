//! Users and bot identity.

use serde::{Deserialize, Serialize};

/// Identifier of a user (or bot) on the platform.
pub type UserId = i64;

/// Identifier of a chat.
pub type ChatId = i64;

/// A user as it appears in messages, callbacks and bot-start events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub user_id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Public username, without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// Whether this user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// Last activity time, in milliseconds since the epoch.
    #[serde(default)]
    pub last_activity_time: Option<i64>,
}

impl User {
    /// Returns the best available human-readable name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.first_name.as_deref())
            .or(self.username.as_deref())
            .unwrap_or("")
    }
}

/// A command advertised in the bot profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    /// Command name, without prefix.
    pub name: String,
    /// Optional description shown to users.
    #[serde(default)]
    pub description: Option<String>,
}

/// Information about the bot itself, as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotInfo {
    /// The bot's user ID.
    pub user_id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public username, without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// Profile description.
    #[serde(default)]
    pub description: Option<String>,
    /// Commands advertised in the profile.
    #[serde(default)]
    pub commands: Vec<BotCommand>,
}
