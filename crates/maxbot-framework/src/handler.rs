//! Handler system for the maxbot framework.
//!
//! A [`Handler`] is any async function taking a single context value. Its
//! return type is normalized through [`IntoHandlerResult`], so handlers may
//! return `()` or a `Result<(), E>` for any error type convertible into a
//! [`HandlerError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use maxbot_framework::{MessageContext, HandlerRegistry};
//!
//! async fn echo(ctx: MessageContext) -> Result<(), maxbot_framework::HandlerError> {
//!     let text = ctx.message.text().to_owned();
//!     ctx.reply(text).await?;
//!     Ok(())
//! }
//!
//! let mut registry = HandlerRegistry::new(true);
//! registry.on_message(echo);
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{HandlerError, HandlerResult};

// ============================================================================
// IntoHandlerResult - Normalize handler return values
// ============================================================================

/// Converts a handler's return value into a [`HandlerResult`].
pub trait IntoHandlerResult: Send {
    /// Performs the conversion.
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<HandlerError> + Send,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// An async callback invoked with a context of type `C`.
///
/// Implemented automatically for every `Fn(C) -> impl Future` whose output
/// implements [`IntoHandlerResult`].
pub trait Handler<C>: Send + Sync + 'static {
    /// Invokes the handler.
    fn call(&self, ctx: C) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, C> Handler<C> for F
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHandlerResult,
    C: Send + 'static,
{
    fn call(&self, ctx: C) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into_handler_result() })
    }
}

/// A type-erased handler stored in the registry.
pub type BoxedHandler<C> = Arc<dyn Handler<C>>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<C, H>(handler: H) -> BoxedHandler<C>
where
    H: Handler<C>,
{
    Arc::new(handler)
}
