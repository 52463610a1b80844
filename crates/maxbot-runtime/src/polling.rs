//! The long-polling loop.
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──run()──► Running ──stop()──► Stopped
//!                     │
//!                     ├─ open session
//!                     ├─ GET /me, cache identity
//!                     ├─ on_ready handlers
//!                     └─ loop: fetch(marker) ─► dispatch each update in order
//!                              ├─ on error: log, pause, continue
//!                              └─ stop flag checked between cycles
//! ```
//!
//! Updates are dispatched one at a time in arrival order. The marker is
//! advanced as soon as a batch is received, so an update that fails
//! dispatch is never delivered again and the rest of its batch is dropped.
//!
//! Stopping is cooperative: the cycle in flight finishes, so a fetch that is
//! already pending completes and its batch is dispatched before the loop
//! exits. Only the back-off pause after a failed cycle is cut short.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use maxbot_core::UpdateBatch;
use maxbot_framework::{Bot, Dispatcher};

use crate::config::PollingConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Lifecycle state of a [`PollingLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Not started yet.
    Idle,
    /// Fetching and dispatching updates.
    Running,
    /// Finished; the session has been released.
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// Tunables of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingOptions {
    /// Maximum number of updates per fetch.
    pub limit: u32,
    /// Pause after a failed cycle.
    pub error_backoff: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            error_backoff: Duration::from_secs(3),
        }
    }
}

impl From<&PollingConfig> for PollingOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            limit: config.limit,
            error_backoff: config.error_backoff(),
        }
    }
}

/// Requests a [`PollingLoop`] to stop.
///
/// Cloneable and usable from any task.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    /// Asks the loop to stop once the current fetch and dispatch cycle ends.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Drives a [`Dispatcher`] from `GET /updates`.
pub struct PollingLoop {
    bot: Arc<Bot>,
    dispatcher: Dispatcher,
    options: PollingOptions,
    marker: Mutex<Option<i64>>,
    state: Mutex<PollState>,
    stop: StopHandle,
}

impl PollingLoop {
    /// Creates an idle loop.
    pub fn new(bot: Arc<Bot>, dispatcher: Dispatcher, options: PollingOptions) -> Self {
        Self {
            bot,
            dispatcher,
            options,
            marker: Mutex::new(None),
            state: Mutex::new(PollState::Idle),
            stop: StopHandle::default(),
        }
    }

    /// Returns the bot updates are dispatched with.
    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the polling options.
    pub fn options(&self) -> PollingOptions {
        self.options
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> PollState {
        *self.state.lock()
    }

    /// Returns the marker that will be sent with the next fetch.
    pub fn marker(&self) -> Option<i64> {
        *self.marker.lock()
    }

    /// Returns a handle that stops this loop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Asks the loop to stop. Same as `self.stop_handle().stop()`.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Runs the loop until stopped.
    ///
    /// The session is closed on exit whether the loop stopped normally or
    /// failed to start.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::AlreadyStarted`] if the loop is not idle, or
    /// the error of opening the session, of `GET /me` or of a ready handler.
    /// Failures after start-up are logged and never end the loop.
    pub async fn run(&self) -> RuntimeResult<()> {
        {
            let mut state = self.state.lock();
            if *state != PollState::Idle {
                return Err(RuntimeError::AlreadyStarted(*state));
            }
            *state = PollState::Running;
        }

        let result = self.run_inner().await;

        if let Err(e) = self.bot.api().close_session().await {
            warn!(error = %e, "Failed to close session");
        }
        *self.state.lock() = PollState::Stopped;
        info!("Polling stopped");

        result
    }

    async fn run_inner(&self) -> RuntimeResult<()> {
        self.bot.api().open_session().await?;

        let me = self.bot.get_me().await?;
        info!(
            bot_id = me.user_id,
            username = me.username.as_deref().unwrap_or(""),
            limit = self.options.limit,
            "Bot started polling"
        );

        self.dispatcher.run_ready(&self.bot).await?;

        while !self.stop.is_stopped() {
            let cycle = match self.fetch().await {
                Ok(batch) => self.dispatch_batch(batch).await,
                Err(e) => Err(e),
            };

            if let Err(e) = cycle {
                error!(
                    error = %e,
                    backoff_ms = self.options.error_backoff.as_millis() as u64,
                    "Polling cycle failed"
                );
                tokio::select! {
                    _ = self.stop.notified() => break,
                    _ = tokio::time::sleep(self.options.error_backoff) => {}
                }
            }
        }

        Ok(())
    }

    /// Runs one fetch and dispatch cycle, returning the number of updates
    /// dispatched.
    ///
    /// Does not open the session or fetch the bot identity; use this to drive
    /// the loop by hand after doing both.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or the first dispatch error. Updates after a
    /// failing one are skipped.
    pub async fn poll_once(&self) -> RuntimeResult<usize> {
        let batch = self.fetch().await?;
        self.dispatch_batch(batch).await
    }

    async fn fetch(&self) -> RuntimeResult<UpdateBatch> {
        let marker = self.marker();
        let batch = self
            .bot
            .api()
            .get_updates(self.options.limit, marker)
            .await?;

        if let Some(next) = batch.marker {
            *self.marker.lock() = Some(next);
        }
        debug!(
            count = batch.updates.len(),
            marker = ?batch.marker,
            "Fetched updates"
        );
        Ok(batch)
    }

    async fn dispatch_batch(&self, batch: UpdateBatch) -> RuntimeResult<usize> {
        let mut dispatched = 0;
        for raw in batch.updates {
            let outcome = self.dispatcher.dispatch_raw(&self.bot, raw).await?;
            if !outcome.handled {
                debug!(kind = %outcome.kind, "Update not handled");
            }
            dispatched += 1;
        }
        Ok(dispatched)
    }
}

impl fmt::Debug for PollingLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingLoop")
            .field("options", &self.options)
            .field("state", &self.state())
            .field("marker", &self.marker())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, message_update};
    use maxbot_core::ApiError;
    use maxbot_framework::{
        BotOptions, DispatchError, HandlerError, HandlerRegistry, MessageContext,
    };
    use std::sync::atomic::AtomicUsize;

    fn polling_loop(api: Arc<ScriptedApi>, registry: HandlerRegistry) -> PollingLoop {
        let options = BotOptions::default();
        let bot = Arc::new(Bot::new(api, options.clone()));
        let dispatcher = Dispatcher::new(registry, &options);
        PollingLoop::new(bot, dispatcher, PollingOptions::default())
    }

    fn texts(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().clone()
    }

    fn recording_registry(log: &Arc<Mutex<Vec<String>>>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::default();
        let log = Arc::clone(log);
        registry.on_message(move |ctx: MessageContext| {
            let log = Arc::clone(&log);
            async move {
                if ctx.text() == "boom" {
                    return Err(HandlerError::from("handler exploded"));
                }
                log.lock().push(ctx.text().to_owned());
                Ok::<(), HandlerError>(())
            }
        });
        registry
    }

    #[tokio::test]
    async fn test_poll_once_advances_marker_and_keeps_order() {
        let api = Arc::new(ScriptedApi::new());
        api.push_batch(vec![message_update("a"), message_update("b")], Some(7));
        api.push_batch(vec![message_update("c")], None);

        let log = Arc::new(Mutex::new(Vec::new()));
        let polling = polling_loop(Arc::clone(&api), recording_registry(&log));

        assert_eq!(polling.poll_once().await.unwrap(), 2);
        assert_eq!(polling.marker(), Some(7));
        assert_eq!(polling.poll_once().await.unwrap(), 1);
        // A batch without a marker keeps the previous one.
        assert_eq!(polling.marker(), Some(7));

        assert_eq!(texts(&log), vec!["a", "b", "c"]);
        assert_eq!(api.requested_markers(), vec![None, Some(7)]);
        assert_eq!(api.requested_limits(), vec![100, 100]);
    }

    #[tokio::test]
    async fn test_failing_update_skips_rest_of_batch_only() {
        let api = Arc::new(ScriptedApi::new());
        api.push_batch(
            vec![message_update("a"), message_update("boom"), message_update("lost")],
            Some(1),
        );
        api.push_batch(vec![message_update("next")], Some(2));

        let log = Arc::new(Mutex::new(Vec::new()));
        let polling = polling_loop(Arc::clone(&api), recording_registry(&log));

        assert!(matches!(
            polling.poll_once().await,
            Err(RuntimeError::Dispatch(_))
        ));
        assert_eq!(polling.marker(), Some(1));

        assert_eq!(polling.poll_once().await.unwrap(), 1);
        assert_eq!(texts(&log), vec!["a", "next"]);
    }

    #[tokio::test]
    async fn test_malformed_update_is_a_cycle_error() {
        let api = Arc::new(ScriptedApi::new());
        api.push_batch(vec![serde_json::json!({ "timestamp": 1 })], Some(3));

        let polling = polling_loop(Arc::clone(&api), HandlerRegistry::default());
        assert!(matches!(
            polling.poll_once().await,
            Err(RuntimeError::Dispatch(_))
        ));
        assert_eq!(polling.marker(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_errors_and_stops() {
        let api = Arc::new(ScriptedApi::new());
        api.push_error(ApiError::invalid_request("network down"));
        api.push_batch(vec![message_update("boom")], Some(1));
        api.push_batch(vec![message_update("after")], Some(2));

        let log = Arc::new(Mutex::new(Vec::new()));
        let polling = polling_loop(Arc::clone(&api), recording_registry(&log));

        let stop = polling.stop_handle();
        api.on_exhausted(move || stop.stop());

        let started = tokio::time::Instant::now();
        polling.run().await.unwrap();

        assert_eq!(polling.state(), PollState::Stopped);
        assert_eq!(texts(&log), vec!["after"]);
        // One pause after the fetch error, one after the handler error.
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(api.is_closed());
        assert_eq!(api.open_count(), 1);
    }

    #[tokio::test]
    async fn test_run_fires_ready_once_and_caches_identity() {
        let api = Arc::new(ScriptedApi::new());
        let ready = Arc::new(AtomicUsize::new(0));

        let mut registry = HandlerRegistry::default();
        let counter = Arc::clone(&ready);
        registry.on_ready(move |bot: Arc<Bot>| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(bot.username().as_deref(), Some("scripted_bot"));
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let polling = polling_loop(Arc::clone(&api), registry);
        let stop = polling.stop_handle();
        api.on_exhausted(move || stop.stop());

        polling.run().await.unwrap();

        assert_eq!(ready.load(Ordering::SeqCst), 1);
        assert_eq!(polling.bot().id(), Some(42));
        assert!(api.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_fetch_still_dispatches_batch() {
        let api = Arc::new(ScriptedApi::new());
        api.push_batch(vec![message_update("late")], Some(5));
        api.fetch_delay(Duration::from_millis(50));

        let log = Arc::new(Mutex::new(Vec::new()));
        let polling = polling_loop(Arc::clone(&api), recording_registry(&log));

        let stop = polling.stop_handle();
        api.on_fetch(move || stop.stop());

        polling.run().await.unwrap();

        assert_eq!(texts(&log), vec!["late"]);
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(polling.marker(), Some(5));
        assert_eq!(polling.state(), PollState::Stopped);
        assert!(api.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cuts_backoff_short() {
        let api = Arc::new(ScriptedApi::new());
        api.push_error(ApiError::invalid_request("network down"));

        let polling = polling_loop(Arc::clone(&api), HandlerRegistry::default());
        let stop = polling.stop_handle();
        api.on_fetch(move || stop.stop());

        let started = tokio::time::Instant::now();
        polling.run().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(api.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_ready_failure_is_fatal_and_closes_session() {
        let api = Arc::new(ScriptedApi::new());
        let mut registry = HandlerRegistry::default();
        registry.on_ready(|_bot: Arc<Bot>| async {
            Err::<(), _>(HandlerError::from("cannot warm up"))
        });

        let polling = polling_loop(Arc::clone(&api), registry);
        assert!(matches!(
            polling.run().await,
            Err(RuntimeError::Dispatch(DispatchError::Ready(_)))
        ));
        assert_eq!(polling.state(), PollState::Stopped);
        assert!(api.is_closed());
        assert_eq!(api.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let api = Arc::new(ScriptedApi::new());
        let polling = polling_loop(Arc::clone(&api), HandlerRegistry::default());
        polling.stop();
        polling.run().await.unwrap();

        assert!(matches!(
            polling.run().await,
            Err(RuntimeError::AlreadyStarted(PollState::Stopped))
        ));
    }

    #[tokio::test]
    async fn test_get_me_failure_is_fatal_and_closes_session() {
        let api = Arc::new(ScriptedApi::new());
        api.fail_get_me();
        let polling = polling_loop(Arc::clone(&api), HandlerRegistry::default());

        assert!(matches!(polling.run().await, Err(RuntimeError::Api(_))));
        assert_eq!(polling.state(), PollState::Stopped);
        assert!(api.is_closed());
        assert_eq!(api.fetch_count(), 0);
    }
}
