//! Filters gating message and callback handlers.
//!
//! A [`Filter`] is resolved once at registration: either an exact text
//! comparison or an arbitrary predicate over the handler's context.

use std::fmt;
use std::sync::Arc;

use crate::context::{CallbackContext, MessageContext};

/// A predicate over a handler context.
pub type PredicateFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Contexts that expose a text to compare against [`Filter::ExactText`].
pub trait FilterText {
    /// The text compared by [`Filter::ExactText`].
    fn filter_text(&self) -> &str;
}

impl FilterText for MessageContext {
    fn filter_text(&self) -> &str {
        self.message.text()
    }
}

impl FilterText for CallbackContext {
    fn filter_text(&self) -> &str {
        self.callback.payload()
    }
}

/// Condition under which a handler runs.
pub enum Filter<C> {
    /// Matches when the context text equals this string exactly, whatever
    /// the bot's case setting.
    ExactText(String),
    /// Matches when the predicate returns `true`.
    Predicate(PredicateFn<C>),
}

impl<C> Filter<C> {
    /// Creates an exact text filter.
    pub fn text(text: impl Into<String>) -> Self {
        Self::ExactText(text.into())
    }

    /// Creates a predicate filter.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

impl<C: FilterText> Filter<C> {
    /// Returns `true` if the handler should run for `ctx`.
    pub fn matches(&self, ctx: &C) -> bool {
        match self {
            Self::ExactText(text) => ctx.filter_text() == text.as_str(),
            Self::Predicate(f) => f(ctx),
        }
    }
}

impl<C> Clone for Filter<C> {
    fn clone(&self) -> Self {
        match self {
            Self::ExactText(text) => Self::ExactText(text.clone()),
            Self::Predicate(f) => Self::Predicate(Arc::clone(f)),
        }
    }
}

impl<C> From<&str> for Filter<C> {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl<C> From<String> for Filter<C> {
    fn from(text: String) -> Self {
        Self::ExactText(text)
    }
}

impl<C> fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactText(text) => f.debug_tuple("ExactText").field(text).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
