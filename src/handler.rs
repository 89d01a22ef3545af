//! Handler variants and type erasure.
//!
//! # Two kinds of handler
//!
//! A chain holds [`Handler`]s of two variants, picked when the handler is
//! registered:
//!
//! | Variant | Runs when | Returns |
//! |---|---|---|
//! | [`Handler::Normal`] | no error is pending | [`Outcome`]: `Ok(Flow::Next)`, `Ok(Flow::Respond(..))` or `Err(..)` |
//! | [`Handler::Error`]  | an error is pending | [`Recovery`]: `Ok(response)` or `Err(..)` to forward |
//!
//! The continuation is the return value. A handler that returns has signalled
//! exactly once; there is no callback to forget or to call twice.
//!
//! # How handlers are stored
//!
//! The pipeline stores handlers of many concrete types in one `Vec`, so each
//! one is erased behind a trait object:
//!
//! ```text
//! fn m1(ctx: &mut Context) -> Outcome { … }     ← user writes this
//!        ↓ from_fn(m1)
//! FnMiddleware(m1)                             ← implements Middleware
//!        ↓
//! Handler::Normal(Arc<dyn Middleware>)         ← stored in the pipeline
//!        ↓ at request time
//! middleware.call(&mut ctx)                    ← one vtable dispatch
//!        ↓
//! Box::pin(async move { m1(ctx) })             ← BoxFuture
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::HandlerError;
use crate::response::{IntoResponse, Response};

// ── Types ─────────────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future borrowing from the request context.
///
/// `Send` lets tokio move the request's future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a normal handler returns.
pub type Outcome = Result<Flow, HandlerError>;

/// What an error handler returns: a terminal response, or the error to pass on.
pub type Recovery = Result<Response, HandlerError>;

/// How a normal handler hands control back to the chain.
#[derive(Debug)]
pub enum Flow {
    /// Continue with the next handler.
    Next,
    /// Write this response and stop the chain.
    Respond(Response),
}

impl Flow {
    pub fn respond(res: impl IntoResponse) -> Self {
        Self::Respond(res.into_response())
    }
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// A step that runs while no error is pending.
///
/// Most code uses [`from_fn`] or [`from_async_fn`]; implement this directly
/// for handlers that carry their own state.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Outcome>;
}

/// A step that runs only once an error is pending.
///
/// See [`error_fn`] for the closure form.
pub trait ErrorMiddleware: Send + Sync + 'static {
    fn call<'a>(&'a self, err: HandlerError, ctx: &'a mut Context) -> BoxFuture<'a, Recovery>;
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// One registered step of a chain.
#[derive(Clone)]
pub enum Handler {
    Normal(Arc<dyn Middleware>),
    Error(Arc<dyn ErrorMiddleware>),
}

impl Handler {
    pub fn normal(middleware: impl Middleware) -> Self {
        Self::Normal(Arc::new(middleware))
    }

    pub fn error(middleware: impl ErrorMiddleware) -> Self {
        Self::Error(Arc::new(middleware))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_error() { "Handler::Error" } else { "Handler::Normal" })
    }
}

// ── Function adapters ─────────────────────────────────────────────────────────

/// Wraps a synchronous function as a normal handler.
///
/// ```rust
/// use relay::{Context, Flow, Outcome, from_fn};
///
/// fn m1(ctx: &mut Context) -> Outcome {
///     ctx.locals_mut().insert("m1", "hi from m1");
///     Ok(Flow::Next)
/// }
///
/// let handler = from_fn(m1);
/// assert!(!handler.is_error());
/// ```
pub fn from_fn<F>(f: F) -> Handler
where
    F: Fn(&mut Context) -> Outcome + Send + Sync + 'static,
{
    Handler::normal(FnMiddleware(f))
}

/// Wraps a function returning a boxed future as a normal handler.
///
/// The future may borrow the context across `.await` points:
///
/// ```rust
/// use relay::{BoxFuture, Context, Flow, Outcome, from_async_fn};
///
/// fn load(ctx: &mut Context) -> BoxFuture<'_, Outcome> {
///     Box::pin(async move {
///         ctx.locals_mut().insert("data", "loaded");
///         Ok(Flow::Next)
///     })
/// }
///
/// let handler = from_async_fn(load);
/// ```
pub fn from_async_fn<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    Handler::normal(AsyncFnMiddleware(f))
}

/// Wraps a synchronous function as an error handler.
///
/// ```rust
/// use relay::{Response, error_fn};
///
/// let handler = error_fn(|err, _ctx| Ok(Response::text(err.to_string())));
/// assert!(handler.is_error());
/// ```
pub fn error_fn<F>(f: F) -> Handler
where
    F: Fn(HandlerError, &mut Context) -> Recovery + Send + Sync + 'static,
{
    Handler::error(ErrorFn(f))
}

// The adapters below call the wrapped function from inside the returned
// future, so a panic in it surfaces while the pipeline is polling.

struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Context) -> Outcome + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Outcome> {
        Box::pin(async move { (self.0)(ctx) })
    }
}

struct AsyncFnMiddleware<F>(F);

impl<F> Middleware for AsyncFnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Outcome> {
        Box::pin(async move { (self.0)(ctx).await })
    }
}

struct ErrorFn<F>(F);

impl<F> ErrorMiddleware for ErrorFn<F>
where
    F: Fn(HandlerError, &mut Context) -> Recovery + Send + Sync + 'static,
{
    fn call<'a>(&'a self, err: HandlerError, ctx: &'a mut Context) -> BoxFuture<'a, Recovery> {
        Box::pin(async move { (self.0)(err, ctx) })
    }
}
