//! A scripted [`BotApi`] for the polling tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use maxbot_core::{
    ApiError, ApiResult, BotApi, BotInfo, Message, MessageBody, OutgoingMessage, Recipient,
    TextFormat, UpdateBatch,
};

type Hook = Box<dyn Fn() + Send + Sync>;

/// Replays queued `GET /updates` results, then returns empty batches.
pub(crate) struct ScriptedApi {
    script: Mutex<VecDeque<ApiResult<UpdateBatch>>>,
    on_exhausted: Mutex<Option<Hook>>,
    on_fetch: Mutex<Option<Hook>>,
    fetch_delay: Mutex<Option<Duration>>,
    fail_get_me: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicBool,
    markers: Mutex<Vec<Option<i64>>>,
    limits: Mutex<Vec<u32>>,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            on_exhausted: Mutex::new(None),
            on_fetch: Mutex::new(None),
            fetch_delay: Mutex::new(None),
            fail_get_me: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            markers: Mutex::new(Vec::new()),
            limits: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_batch(&self, updates: Vec<Value>, marker: Option<i64>) {
        self.script
            .lock()
            .push_back(Ok(UpdateBatch { updates, marker }));
    }

    pub(crate) fn push_error(&self, error: ApiError) {
        self.script.lock().push_back(Err(error));
    }

    /// Runs `hook` on every fetch made after the script ran out.
    pub(crate) fn on_exhausted(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_exhausted.lock() = Some(Box::new(hook));
    }

    /// Runs `hook` at the start of every fetch.
    pub(crate) fn on_fetch(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_fetch.lock() = Some(Box::new(hook));
    }

    /// Makes every fetch sleep for `delay` before answering.
    pub(crate) fn fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    pub(crate) fn fail_get_me(&self) {
        self.fail_get_me.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.markers.lock().len()
    }

    pub(crate) fn requested_markers(&self) -> Vec<Option<i64>> {
        self.markers.lock().clone()
    }

    pub(crate) fn requested_limits(&self) -> Vec<u32> {
        self.limits.lock().clone()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl BotApi for ScriptedApi {
    async fn open_session(&self) -> ApiResult<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close_session(&self) -> ApiResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get_me(&self) -> ApiResult<BotInfo> {
        if self.fail_get_me.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 401,
                code: "verify.token".into(),
                message: "Invalid access_token".into(),
            });
        }
        Ok(BotInfo {
            user_id: 42,
            name: Some("Scripted".into()),
            username: Some("scripted_bot".into()),
            description: None,
            commands: Vec::new(),
        })
    }

    async fn get_updates(&self, limit: u32, marker: Option<i64>) -> ApiResult<UpdateBatch> {
        self.markers.lock().push(marker);
        self.limits.lock().push(limit);

        if let Some(hook) = self.on_fetch.lock().as_ref() {
            hook();
        }
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            None => {
                if let Some(hook) = self.on_exhausted.lock().as_ref() {
                    hook();
                }
                tokio::task::yield_now().await;
                Ok(UpdateBatch::default())
            }
        }
    }

    async fn send_message(
        &self,
        message: &OutgoingMessage,
        _default_format: Option<TextFormat>,
    ) -> ApiResult<Message> {
        self.sent.lock().push(message.clone());
        Ok(Message {
            sender: None,
            recipient: Recipient::default(),
            timestamp: 0,
            link: None,
            body: MessageBody {
                message_id: "sent".into(),
                seq: None,
                text: Some(message.text.clone()),
                attachments: Vec::new(),
            },
            url: None,
        })
    }
}

/// A `message_created` update from user 1 in chat 10.
pub(crate) fn message_update(text: &str) -> Value {
    json!({
        "update_type": "message_created",
        "timestamp": 1,
        "message": {
            "sender": { "user_id": 1, "name": "Tester" },
            "recipient": { "chat_id": 10, "chat_type": "dialog" },
            "body": { "mid": "mid.1", "text": text }
        }
    })
}
