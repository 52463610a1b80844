//! Update dispatcher for the maxbot framework.
//!
//! The [`Dispatcher`] routes one decoded [`Update`] at a time to the
//! handlers in its [`HandlerRegistry`]:
//!
//! 1. `message_created`: every message handler whose filter passes runs in
//!    registration order, then the [`CommandRouter`] runs on the same message.
//!    Both may fire for one update.
//! 2. `bot_started`: every bot-start handler runs.
//! 3. `message_callback`: every callback handler whose filter passes runs.
//! 4. Any other update type is ignored.
//!
//! The first handler error aborts the remaining handlers for that update and
//! is returned to the caller. The dispatcher keeps no state between updates,
//! so dispatching the same update twice runs its handlers twice.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, Level, debug, span};

use maxbot_core::{Update, UpdateKind, UpdatePayload};

use crate::bot::{Bot, BotOptions};
use crate::command::CommandRouter;
use crate::context::{BotStartContext, CallbackContext, MessageContext};
use crate::error::{DispatchError, DispatchResult};
use crate::registry::HandlerRegistry;

/// What happened while dispatching one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Kind of the dispatched update.
    pub kind: UpdateKind,
    /// Whether at least one handler ran.
    pub handled: bool,
    /// The command that was routed, if any.
    pub command: Option<String>,
}

impl DispatchOutcome {
    fn new(kind: UpdateKind, handled: bool) -> Self {
        Self {
            kind,
            handled,
            command: None,
        }
    }
}

/// Routes updates to registered handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    router: CommandRouter,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    ///
    /// Command prefixes and the mention flag are copied from `options`.
    /// The case rule is the registry's alone, since command names were
    /// normalized with it at registration; build the registry with
    /// [`HandlerRegistry::for_options`] to take it from `options`.
    pub fn new(registry: impl Into<Arc<HandlerRegistry>>, options: &BotOptions) -> Self {
        let registry = registry.into();
        let router = CommandRouter::new(
            options.command_prefixes.clone(),
            options.mention_prefix,
            registry.is_case_sensitive(),
        );
        Self { registry, router }
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Returns the command router.
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Decodes and dispatches a raw update.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Decode`] if the update cannot be decoded, or
    /// the first handler failure.
    pub async fn dispatch_raw(
        &self,
        bot: &Arc<Bot>,
        raw: Value,
    ) -> DispatchResult<DispatchOutcome> {
        let update = Update::decode(raw)?;
        self.dispatch(bot, &update).await
    }

    /// Dispatches a decoded update.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Handler`] from the first failing handler.
    pub async fn dispatch(
        &self,
        bot: &Arc<Bot>,
        update: &Update,
    ) -> DispatchResult<DispatchOutcome> {
        let kind = update.kind();
        let span = span!(Level::DEBUG, "dispatch", kind = %kind);
        self.dispatch_payload(bot, kind, update.payload())
            .instrument(span)
            .await
    }

    async fn dispatch_payload(
        &self,
        bot: &Arc<Bot>,
        kind: UpdateKind,
        payload: &UpdatePayload,
    ) -> DispatchResult<DispatchOutcome> {
        match payload {
            UpdatePayload::MessageCreated {
                message,
                user_locale,
            } => {
                let mut handled = false;
                for entry in self.registry.message_handlers() {
                    let ctx = MessageContext {
                        bot: Arc::clone(bot),
                        message: message.clone(),
                        user_locale: user_locale.clone(),
                    };
                    if let Some(filter) = &entry.filter
                        && !filter.matches(&ctx)
                    {
                        continue;
                    }
                    entry
                        .handler
                        .call(ctx)
                        .await
                        .map_err(|e| DispatchError::handler(kind, e))?;
                    handled = true;
                }

                if handled {
                    debug!(text = message.text(), "Message handled");
                } else {
                    debug!(text = message.text(), "Message not handled");
                }

                let command = self
                    .router
                    .route(&self.registry, bot, message, user_locale.as_deref())
                    .await?;

                Ok(DispatchOutcome {
                    kind,
                    handled: handled || command.is_some(),
                    command,
                })
            }

            UpdatePayload::BotStarted(payload) => {
                debug!(user_id = payload.user.user_id, "User started bot");
                let handlers = self.registry.bot_start_handlers();
                for handler in handlers {
                    let ctx = BotStartContext {
                        bot: Arc::clone(bot),
                        payload: payload.clone(),
                    };
                    handler
                        .call(ctx)
                        .await
                        .map_err(|e| DispatchError::handler(kind, e))?;
                }
                Ok(DispatchOutcome::new(kind, !handlers.is_empty()))
            }

            UpdatePayload::MessageCallback {
                callback,
                message,
                user_locale,
            } => {
                let mut handled = false;
                for entry in self.registry.callback_handlers() {
                    let ctx = CallbackContext {
                        bot: Arc::clone(bot),
                        callback: callback.clone(),
                        message: message.clone(),
                        user_locale: user_locale.clone(),
                    };
                    if let Some(filter) = &entry.filter
                        && !filter.matches(&ctx)
                    {
                        continue;
                    }
                    entry
                        .handler
                        .call(ctx)
                        .await
                        .map_err(|e| DispatchError::handler(kind, e))?;
                    handled = true;
                }

                if handled {
                    debug!(payload = callback.payload(), "Callback handled");
                } else {
                    debug!(payload = callback.payload(), "Callback not handled");
                }
                Ok(DispatchOutcome::new(kind, handled))
            }

            UpdatePayload::Unknown { update_type } => {
                debug!(update_type = %update_type, "Ignoring unsupported update type");
                Ok(DispatchOutcome::new(kind, false))
            }
        }
    }

    /// Runs every ready handler in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Ready`] from the first failing handler; the
    /// handlers after it do not run.
    pub async fn run_ready(&self, bot: &Arc<Bot>) -> DispatchResult<()> {
        for handler in self.registry.ready_handlers() {
            handler
                .call(Arc::clone(bot))
                .await
                .map_err(DispatchError::Ready)?;
        }
        Ok(())
    }
}
