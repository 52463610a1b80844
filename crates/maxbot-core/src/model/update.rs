//! Updates delivered by `GET /updates`.
//!
//! An [`Update`] keeps the raw JSON it was decoded from alongside a typed
//! [`UpdatePayload`]. Update types this crate does not know about decode to
//! [`UpdatePayload::Unknown`] rather than failing, so that new upstream event
//! kinds never break an existing bot.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::callback::{BotStartPayload, Callback};
use super::message::Message;
use crate::error::{DecodeError, DecodeResult};

// ============================================================================
// Update Kind
// ============================================================================

/// Classification of updates by their `update_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// A new message was posted (`message_created`).
    MessageCreated,
    /// A user started the bot (`bot_started`).
    BotStarted,
    /// An inline button was pressed (`message_callback`).
    MessageCallback,
    /// Any other update type.
    Unknown,
}

impl UpdateKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated => "message_created",
            Self::BotStarted => "bot_started",
            Self::MessageCallback => "message_callback",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for UpdateKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "message_created" => Self::MessageCreated,
            "bot_started" => Self::BotStarted,
            "message_callback" => Self::MessageCallback,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Update
// ============================================================================

/// Decoded content of an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    /// A new message.
    MessageCreated {
        /// The message.
        message: Message,
        /// The sender's locale.
        user_locale: Option<String>,
    },
    /// A user started the bot.
    BotStarted(BotStartPayload),
    /// An inline button was pressed.
    MessageCallback {
        /// The callback.
        callback: Callback,
        /// The message carrying the pressed keyboard.
        message: Option<Message>,
        /// The presser's locale.
        user_locale: Option<String>,
    },
    /// An update type this crate does not handle.
    Unknown {
        /// The raw `update_type` value.
        update_type: String,
    },
}

/// One update, decoded from the JSON returned by `GET /updates`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    raw: Value,
    timestamp: i64,
    payload: UpdatePayload,
}

impl Update {
    /// Decodes a raw update object.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if `update_type` is missing or if a known
    /// update type does not have the expected shape.
    pub fn decode(raw: Value) -> DecodeResult<Self> {
        let update_type = raw
            .get("update_type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField {
                target: "update",
                field: "update_type",
            })?;
        let timestamp = raw.get("timestamp").and_then(Value::as_i64).unwrap_or(0);
        let user_locale = raw
            .get("user_locale")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let payload = match update_type.parse::<UpdateKind>() {
            Ok(UpdateKind::MessageCreated) => UpdatePayload::MessageCreated {
                message: required_field(&raw, "message", "message_created")?,
                user_locale,
            },
            Ok(UpdateKind::BotStarted) => UpdatePayload::BotStarted(
                BotStartPayload::deserialize(&raw)
                    .map_err(|e| DecodeError::json("bot_started", e))?,
            ),
            Ok(UpdateKind::MessageCallback) => UpdatePayload::MessageCallback {
                callback: required_field(&raw, "callback", "message_callback")?,
                message: optional_field(&raw, "message", "message_callback")?,
                user_locale,
            },
            _ => UpdatePayload::Unknown {
                update_type: update_type.to_owned(),
            },
        };

        Ok(Self {
            raw,
            timestamp,
            payload,
        })
    }

    /// Returns the kind of this update.
    pub fn kind(&self) -> UpdateKind {
        match &self.payload {
            UpdatePayload::MessageCreated { .. } => UpdateKind::MessageCreated,
            UpdatePayload::BotStarted(_) => UpdateKind::BotStarted,
            UpdatePayload::MessageCallback { .. } => UpdateKind::MessageCallback,
            UpdatePayload::Unknown { .. } => UpdateKind::Unknown,
        }
    }

    /// Returns the event time, in milliseconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the raw JSON this update was decoded from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the decoded payload.
    pub fn payload(&self) -> &UpdatePayload {
        &self.payload
    }

    /// Consumes the update, returning the decoded payload.
    pub fn into_payload(self) -> UpdatePayload {
        self.payload
    }
}

fn required_field<T: DeserializeOwned>(
    raw: &Value,
    field: &'static str,
    target: &'static str,
) -> DecodeResult<T> {
    let value = raw
        .get(field)
        .ok_or(DecodeError::MissingField { target, field })?;
    T::deserialize(value).map_err(|e| DecodeError::json(target, e))
}

fn optional_field<T: DeserializeOwned>(
    raw: &Value,
    field: &'static str,
    target: &'static str,
) -> DecodeResult<Option<T>> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| DecodeError::json(target, e)),
    }
}

// ============================================================================
// Update Batch
// ============================================================================

/// Response of `GET /updates`.
///
/// Updates are kept raw so that a single malformed update surfaces as a
/// decode error at dispatch time instead of failing the whole fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Raw update objects, oldest first.
    #[serde(default)]
    pub updates: Vec<Value>,
    /// Marker to pass to the next call to receive only newer updates.
    #[serde(default)]
    pub marker: Option<i64>,
}
