//! Handler registry.
//!
//! A [`HandlerRegistry`] holds every handler of one bot, grouped by update
//! kind, plus the command table. Registration is append-only and the order
//! of registration is the order of invocation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use maxbot_core::UpdateKind;

use crate::bot::{Bot, BotOptions};
use crate::context::{BotStartContext, CallbackContext, CommandContext, MessageContext};
use crate::error::{RegistryError, RegistryResult};
use crate::filter::Filter;
use crate::handler::{BoxedHandler, Handler, into_handler};

/// Normalizes a command name for registration and lookup.
///
/// Both sides of a command lookup go through this function, so a command
/// registered as `"Greet"` resolves for `"greet"` when matching is
/// case-insensitive.
pub fn normalize_command(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_owned()
    } else {
        name.to_lowercase()
    }
}

fn validate_command_name(name: &str) -> RegistryResult<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidCommandName(name.to_owned()));
    }
    Ok(())
}

/// A handler with an optional filter.
pub(crate) struct FilteredHandler<C> {
    pub(crate) filter: Option<Filter<C>>,
    pub(crate) handler: BoxedHandler<C>,
}

/// All handlers registered for one bot.
pub struct HandlerRegistry {
    case_sensitive: bool,
    message: Vec<FilteredHandler<MessageContext>>,
    bot_start: Vec<BoxedHandler<BotStartContext>>,
    callback: Vec<FilteredHandler<CallbackContext>>,
    ready: Vec<BoxedHandler<Arc<Bot>>>,
    commands: HashMap<String, Vec<BoxedHandler<CommandContext>>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    ///
    /// `case_sensitive` selects how command names are normalized. The
    /// [`Dispatcher`](crate::Dispatcher) built over this registry routes
    /// commands with the same rule.
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            message: Vec::new(),
            bot_start: Vec::new(),
            callback: Vec::new(),
            ready: Vec::new(),
            commands: HashMap::new(),
        }
    }

    /// Creates an empty registry using the case rule of `options`.
    pub fn for_options(options: &BotOptions) -> Self {
        Self::new(options.case_sensitive)
    }

    /// Returns whether command names are matched case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a handler for every new message.
    pub fn on_message<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.message.push(FilteredHandler {
            filter: None,
            handler: into_handler(handler),
        });
        self
    }

    /// Registers a handler for new messages that pass `filter`.
    ///
    /// Passing a string registers an exact text match.
    pub fn on_message_filtered<H>(
        &mut self,
        filter: impl Into<Filter<MessageContext>>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.message.push(FilteredHandler {
            filter: Some(filter.into()),
            handler: into_handler(handler),
        });
        self
    }

    /// Registers a handler for `bot_started` updates.
    pub fn on_bot_start<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<BotStartContext>,
    {
        self.bot_start.push(into_handler(handler));
        self
    }

    /// Registers a handler for every button press.
    pub fn on_button_callback<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<CallbackContext>,
    {
        self.callback.push(FilteredHandler {
            filter: None,
            handler: into_handler(handler),
        });
        self
    }

    /// Registers a handler for button presses that pass `filter`.
    ///
    /// Passing a string matches the button payload exactly.
    pub fn on_button_callback_filtered<H>(
        &mut self,
        filter: impl Into<Filter<CallbackContext>>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CallbackContext>,
    {
        self.callback.push(FilteredHandler {
            filter: Some(filter.into()),
            handler: into_handler(handler),
        });
        self
    }

    /// Registers a handler run once polling has started and the bot
    /// identity is known.
    pub fn on_ready<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<Arc<Bot>>,
    {
        self.ready.push(into_handler(handler));
        self
    }

    /// Registers a command handler under `name` and every alias.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidCommandName`] if the name or an alias
    /// is empty or contains whitespace. Nothing is registered in that case.
    pub fn on_command<H>(&mut self, name: &str, aliases: &[&str], handler: H) -> RegistryResult<()>
    where
        H: Handler<CommandContext>,
    {
        validate_command_name(name)?;
        for alias in aliases {
            validate_command_name(alias)?;
        }

        let handler = into_handler(handler);
        for key in std::iter::once(&name).chain(aliases) {
            let key = normalize_command(key, self.case_sensitive);
            debug!(command = %key, "Registered command handler");
            self.commands
                .entry(key)
                .or_default()
                .push(Arc::clone(&handler));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Returns the number of handlers registered for an update kind.
    ///
    /// Command handlers are not included; see [`command_names`](Self::command_names).
    pub fn handler_count(&self, kind: UpdateKind) -> usize {
        match kind {
            UpdateKind::MessageCreated => self.message.len(),
            UpdateKind::BotStarted => self.bot_start.len(),
            UpdateKind::MessageCallback => self.callback.len(),
            UpdateKind::Unknown => 0,
        }
    }

    /// Returns the number of ready handlers.
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Returns the normalized names of all registered commands and aliases, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub(crate) fn message_handlers(&self) -> &[FilteredHandler<MessageContext>] {
        &self.message
    }

    pub(crate) fn bot_start_handlers(&self) -> &[BoxedHandler<BotStartContext>] {
        &self.bot_start
    }

    pub(crate) fn callback_handlers(&self) -> &[FilteredHandler<CallbackContext>] {
        &self.callback
    }

    pub(crate) fn ready_handlers(&self) -> &[BoxedHandler<Arc<Bot>>] {
        &self.ready
    }

    /// Looks up the handlers for a raw command name.
    pub(crate) fn command_handlers(&self, name: &str) -> &[BoxedHandler<CommandContext>] {
        self.commands
            .get(&normalize_command(name, self.case_sensitive))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("case_sensitive", &self.case_sensitive)
            .field("message", &self.message.len())
            .field("bot_start", &self.bot_start.len())
            .field("callback", &self.callback.len())
            .field("ready", &self.ready.len())
            .field("commands", &self.command_names())
            .finish()
    }
}
