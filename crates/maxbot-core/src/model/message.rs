//! Messages, both received and outgoing.
//!
//! # Wire shape
//!
//! ```text
//! Message { sender, recipient, timestamp, link, body, url }
//! └── MessageBody { mid, seq, text, attachments }
//! ```
//!
//! Outgoing messages are described by [`OutgoingMessage`], which renders the
//! query string and JSON body expected by `POST /messages`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::{ChatId, User, UserId};

/// Upper bound (exclusive) on the length of a message text, in characters.
pub const MAX_TEXT_LENGTH: usize = 4000;

// ============================================================================
// Received messages
// ============================================================================

/// Where a message was delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Chat ID, if the message was sent to a chat.
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    /// Chat type (`"dialog"`, `"chat"`, `"channel"`).
    #[serde(default)]
    pub chat_type: Option<String>,
    /// User ID, if the message was sent to a user directly.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Content of a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Unique message ID.
    #[serde(rename = "mid")]
    pub message_id: String,
    /// Sequence number within the chat.
    #[serde(default)]
    pub seq: Option<i64>,
    /// Text content; absent for attachment-only messages.
    #[serde(default)]
    pub text: Option<String>,
    /// Raw attachments.
    #[serde(default)]
    pub attachments: Vec<Value>,
}

/// A forwarded or replied-to message reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedMessage {
    /// Link type (`"reply"` or `"forward"`).
    #[serde(rename = "type")]
    pub link_type: String,
    /// Original sender.
    #[serde(default)]
    pub sender: Option<User>,
    /// Chat of the original message.
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    /// Body of the original message.
    #[serde(default)]
    pub message: Option<MessageBody>,
}

/// A message received from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The author; absent for channel posts.
    #[serde(default)]
    pub sender: Option<User>,
    /// Where the message was delivered.
    #[serde(default)]
    pub recipient: Recipient,
    /// Creation time, in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Linked (replied or forwarded) message.
    #[serde(default)]
    pub link: Option<LinkedMessage>,
    /// Message content.
    pub body: MessageBody,
    /// Public URL, for channel posts.
    #[serde(default)]
    pub url: Option<String>,
}

impl Message {
    /// Returns the message text, or an empty string for attachment-only messages.
    pub fn text(&self) -> &str {
        self.body.text.as_deref().unwrap_or("")
    }

    /// Returns the message ID.
    pub fn id(&self) -> &str {
        &self.body.message_id
    }

    /// Returns the ID of the user who sent this message, if known.
    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|u| u.user_id)
    }

    /// Returns where a reply to this message should go.
    ///
    /// Prefers the chat the message was delivered to, falling back to the sender.
    pub fn reply_target(&self) -> Option<SendTarget> {
        self.recipient
            .chat_id
            .map(SendTarget::Chat)
            .or_else(|| self.sender_id().map(SendTarget::User))
    }
}

// ============================================================================
// Outgoing messages
// ============================================================================

/// Markup understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    /// Markdown markup.
    Markdown,
    /// HTML markup.
    Html,
}

impl TextFormat {
    /// Returns the wire name of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }
}

/// Format requested for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Use the bot's configured default format.
    #[default]
    BotDefault,
    /// Send as plain text.
    Plain,
    /// Send with the given markup.
    Text(TextFormat),
}

impl Format {
    /// Resolves this choice against the bot default.
    pub fn resolve(self, default: Option<TextFormat>) -> Option<TextFormat> {
        match self {
            Self::BotDefault => default,
            Self::Plain => None,
            Self::Text(format) => Some(format),
        }
    }
}

/// Destination of an outgoing message.
///
/// Exactly one of a chat or a user is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// Send into a chat.
    Chat(ChatId),
    /// Send to a user directly.
    User(UserId),
}

/// A message to be sent with `POST /messages`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    /// Destination.
    pub target: SendTarget,
    /// Text content.
    pub text: String,
    /// Markup format.
    pub format: Format,
    /// ID of the message being replied to.
    pub reply_to: Option<String>,
    /// Whether chat members are notified.
    pub notify: bool,
    /// Whether link previews are suppressed.
    pub disable_link_preview: bool,
    /// Raw attachments (already uploaded).
    pub attachments: Vec<Value>,
}

impl OutgoingMessage {
    /// Creates a plain message with default options.
    pub fn new(target: SendTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            text: text.into(),
            format: Format::BotDefault,
            reply_to: None,
            notify: true,
            disable_link_preview: false,
            attachments: Vec::new(),
        }
    }

    /// Sets the markup format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Marks this message as a reply to `message_id`.
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Sets whether chat members are notified.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Sets whether link previews are suppressed.
    pub fn disable_link_preview(mut self, disable: bool) -> Self {
        self.disable_link_preview = disable;
        self
    }

    /// Attaches a raw attachment payload.
    pub fn attachment(mut self, attachment: Value) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Query parameters for the request.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let target = match self.target {
            SendTarget::Chat(id) => ("chat_id", id.to_string()),
            SendTarget::User(id) => ("user_id", id.to_string()),
        };
        vec![
            target,
            (
                "disable_link_preview",
                self.disable_link_preview.to_string(),
            ),
        ]
    }

    /// JSON body for the request, with `default_format` applied.
    pub fn body(&self, default_format: Option<TextFormat>) -> NewMessageBody {
        NewMessageBody {
            text: self.text.clone(),
            format: self.format.resolve(default_format),
            notify: self.notify,
            link: self.reply_to.as_ref().map(|mid| NewMessageLink {
                link_type: "reply",
                mid: mid.clone(),
            }),
            attachments: self.attachments.clone(),
        }
    }
}

/// Serialized body of `POST /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessageBody {
    /// Text content.
    pub text: String,
    /// Markup format; omitted for plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
    /// Whether chat members are notified.
    pub notify: bool,
    /// Reply link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<NewMessageLink>,
    /// Attachments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Value>,
}

/// Reply link inside [`NewMessageBody`].
#[derive(Debug, Clone, Serialize)]
pub struct NewMessageLink {
    /// Always `"reply"`.
    #[serde(rename = "type")]
    pub link_type: &'static str,
    /// ID of the message being replied to.
    pub mid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_decodes_body_mid() {
        let message: Message = serde_json::from_value(json!({
            "sender": { "user_id": 7, "name": "Ann" },
            "recipient": { "chat_id": 42, "chat_type": "dialog" },
            "timestamp": 1700000000000i64,
            "body": { "mid": "mid.abc", "seq": 3, "text": "/greet Alice" }
        }))
        .unwrap();

        assert_eq!(message.id(), "mid.abc");
        assert_eq!(message.text(), "/greet Alice");
        assert_eq!(message.sender_id(), Some(7));
        assert_eq!(message.reply_target(), Some(SendTarget::Chat(42)));
    }

    #[test]
    fn test_text_defaults_to_empty() {
        let message: Message =
            serde_json::from_value(json!({ "body": { "mid": "m1", "text": null } })).unwrap();
        assert_eq!(message.text(), "");
        assert_eq!(message.reply_target(), None);
    }

    #[test]
    fn test_body_resolves_default_format() {
        let msg = OutgoingMessage::new(SendTarget::Chat(1), "hi").reply_to("mid.1");

        let body = serde_json::to_value(msg.body(Some(TextFormat::Html))).unwrap();
        assert_eq!(body["format"], "html");
        assert_eq!(body["link"]["type"], "reply");
        assert_eq!(body["link"]["mid"], "mid.1");
        assert!(body.get("attachments").is_none());

        let plain = msg.clone().format(Format::Plain);
        let body = serde_json::to_value(plain.body(Some(TextFormat::Html))).unwrap();
        assert!(body.get("format").is_none());
    }

    #[test]
    fn test_query_addresses_exactly_one_target() {
        let msg = OutgoingMessage::new(SendTarget::User(9), "hi").disable_link_preview(true);
        assert_eq!(
            msg.query(),
            vec![
                ("user_id", "9".to_string()),
                ("disable_link_preview", "true".to_string())
            ]
        );
    }
}
