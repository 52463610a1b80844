//! Test doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use maxbot_core::{
    ApiError, ApiResult, BotApi, BotInfo, Message, MessageBody, OutgoingMessage, Recipient,
    SendTarget, TextFormat, UpdateBatch, UserId,
};

/// An in-memory [`BotApi`] that records sent messages.
#[derive(Default)]
pub(crate) struct MockApi {
    username: Option<String>,
    fail_sends: AtomicUsize,
    attempts: AtomicUsize,
    sent: Mutex<Vec<(OutgoingMessage, Option<TextFormat>)>>,
}

impl MockApi {
    pub(crate) fn with_username(username: &str) -> Self {
        Self {
            username: Some(username.to_owned()),
            ..Self::default()
        }
    }

    /// Makes the next `n` sends fail with `attachment.not.ready`.
    pub(crate) fn fail_next_sends(&self, n: usize) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    pub(crate) fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<(OutgoingMessage, Option<TextFormat>)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl BotApi for MockApi {
    async fn open_session(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn close_session(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn get_me(&self) -> ApiResult<BotInfo> {
        Ok(BotInfo {
            user_id: 1000,
            name: Some("Test Bot".into()),
            username: self.username.clone(),
            description: None,
            commands: Vec::new(),
        })
    }

    async fn get_updates(&self, _limit: u32, _marker: Option<i64>) -> ApiResult<UpdateBatch> {
        Ok(UpdateBatch::default())
    }

    async fn send_message(
        &self,
        message: &OutgoingMessage,
        default_format: Option<TextFormat>,
    ) -> ApiResult<Message> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::AttachmentNotReady);
        }

        self.sent.lock().push((message.clone(), default_format));
        let recipient = match message.target {
            SendTarget::Chat(chat_id) => Recipient {
                chat_id: Some(chat_id),
                ..Recipient::default()
            },
            SendTarget::User(user_id) => Recipient {
                user_id: Some(user_id),
                ..Recipient::default()
            },
        };
        Ok(Message {
            sender: None,
            recipient,
            timestamp: 0,
            link: None,
            body: MessageBody {
                message_id: format!("sent.{attempt}"),
                seq: None,
                text: Some(message.text.clone()),
                attachments: Vec::new(),
            },
            url: None,
        })
    }
}

/// A message from `sender` delivered to chat `chat_id`.
pub(crate) fn message(sender: UserId, chat_id: i64, text: &str) -> Message {
    serde_json::from_value(message_json(sender, chat_id, text)).unwrap()
}

fn message_json(sender: UserId, chat_id: i64, text: &str) -> Value {
    json!({
        "sender": { "user_id": sender, "name": "Tester" },
        "recipient": { "chat_id": chat_id, "chat_type": "dialog" },
        "timestamp": 1,
        "body": { "mid": format!("mid.{sender}.{chat_id}"), "text": text }
    })
}

pub(crate) fn message_update(sender: UserId, chat_id: i64, text: &str) -> Value {
    json!({
        "update_type": "message_created",
        "timestamp": 1,
        "message": message_json(sender, chat_id, text),
        "user_locale": "en"
    })
}

pub(crate) fn bot_started(user: UserId) -> Value {
    json!({
        "update_type": "bot_started",
        "timestamp": 1,
        "chat_id": user,
        "user": { "user_id": user }
    })
}

pub(crate) fn callback_update(user: UserId, payload: &str) -> Value {
    json!({
        "update_type": "message_callback",
        "timestamp": 1,
        "callback": {
            "callback_id": "cb.1",
            "payload": payload,
            "user": { "user_id": user }
        },
        "message": message_json(1000, user, "pick one")
    })
}
