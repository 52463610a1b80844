//! Domain model for the Max bot API.
//!
//! Only the subset of objects the dispatch core needs is modelled here;
//! everything else is kept as raw [`serde_json::Value`].

pub mod callback;
pub mod message;
pub mod update;
pub mod user;

pub use callback::{BotStartPayload, Callback};
pub use message::{
    Format, LinkedMessage, MAX_TEXT_LENGTH, Message, MessageBody, NewMessageBody, NewMessageLink,
    OutgoingMessage, Recipient, SendTarget, TextFormat,
};
pub use update::{Update, UpdateBatch, UpdateKind, UpdatePayload};
pub use user::{BotCommand, BotInfo, ChatId, User, UserId};
