//! The chain walker.
//!
//! Dispatch is a loop over the frozen layer list with two pieces of state:
//! the current position and the pending error, if any.
//!
//! ```text
//!             ┌─────────── Normal layer: Ok(Next) ───────────┐
//!             ▼                                              │
//!   ┌──────────────────┐   Normal layer: Err(e)   ┌──────────┴───────┐
//!   │ normal mode      │ ───────────────────────▶ │ error mode (e)   │
//!   │ error layers     │                          │ normal layers    │
//!   │ are skipped      │                          │ are skipped      │
//!   └──────────────────┘                          └──────────────────┘
//!             │ Ok(Respond(r))                       │ Ok(r)       ▲
//!             ▼                                      ▼             │
//!          response r                           response r    Err(e') forwards
//! ```
//!
//! There is no way back from error mode: an error handler either writes the
//! response or forwards an error.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::{ErrorMiddleware, Flow, Handler, Middleware, Outcome, Recovery};
use crate::request::Request;
use crate::response::Response;
use crate::router::Layer;

/// A frozen, shareable set of layers built by [`Router::build`](crate::Router::build).
pub struct Pipeline {
    layers: Vec<Layer>,
}

impl Pipeline {
    pub(crate) fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Number of registered handlers, across all routes.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Runs `request` through every layer that matches it and returns the
    /// response written by the terminal handler.
    ///
    /// Handlers run one at a time in registration order. A handler that
    /// returns `Err` or panics puts the walk into error mode, after which only
    /// error handlers run.
    ///
    /// A chain that runs out of layers without responding is a routing
    /// mistake; dispatch logs it and answers `404` (no error pending) or
    /// `500` (error pending) instead of leaving the client waiting.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        let mut pending: Option<HandlerError> = None;

        for layer in &self.layers {
            let Some(params) = layer.matches(ctx.method(), ctx.path()) else {
                continue;
            };

            match (&layer.handler, pending.take()) {
                (Handler::Normal(middleware), None) => {
                    ctx.set_params(params);
                    match invoke(middleware.as_ref(), &mut ctx).await {
                        Ok(Flow::Next) => {}
                        Ok(Flow::Respond(res)) => return res,
                        Err(err) => {
                            debug!(layer = layer.pattern(), kind = ?err.kind(), "handler signalled error: {err}");
                            pending = Some(err);
                        }
                    }
                }
                (Handler::Error(middleware), Some(err)) => {
                    ctx.set_params(params);
                    match recover(middleware.as_ref(), err, &mut ctx).await {
                        Ok(res) => return res,
                        Err(err) => pending = Some(err),
                    }
                }
                // Wrong variant for the current mode: skip, keep the state.
                (_, skipped) => pending = skipped,
            }
        }

        unresolved(ctx.path(), pending)
    }
}

/// Runs a normal handler, turning a panic into a pending error.
async fn invoke(middleware: &dyn Middleware, ctx: &mut Context) -> Outcome {
    AssertUnwindSafe(async move { middleware.call(ctx).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::panicked(payload)))
}

/// Runs an error handler, turning a panic into the next pending error.
async fn recover(middleware: &dyn ErrorMiddleware, err: HandlerError, ctx: &mut Context) -> Recovery {
    AssertUnwindSafe(async move { middleware.call(err, ctx).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::panicked(payload)))
}

fn unresolved(path: &str, pending: Option<HandlerError>) -> Response {
    let builder = Response::builder()
        .header("x-content-type-options", "nosniff");
    match pending {
        None => {
            warn!(path, "no handler responded");
            builder.status(StatusCode::NOT_FOUND).text(format!("Cannot GET {path}"))
        }
        Some(err) => {
            warn!(path, kind = ?err.kind(), "unhandled error: {err}");
            builder.status(StatusCode::INTERNAL_SERVER_ERROR).text("Internal Server Error")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::{BoxFuture, Router, error_fn, from_async_fn, from_fn};

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn step(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        from_fn(move |_| {
            trace.lock().unwrap().push(name);
            Ok(Flow::Next)
        })
    }

    fn fail(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        from_fn(move |_| {
            trace.lock().unwrap().push(name);
            Err(HandlerError::validation(name))
        })
    }

    fn finish(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        from_fn(move |_| {
            trace.lock().unwrap().push(name);
            Ok(Flow::respond(name))
        })
    }

    fn forward(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        error_fn(move |err, _| {
            trace.lock().unwrap().push(name);
            Err(err)
        })
    }

    fn render(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        error_fn(move |err, _| {
            trace.lock().unwrap().push(name);
            Ok(Response::text(format!("{name}: {err}")))
        })
    }

    fn body(res: &Response) -> &str {
        std::str::from_utf8(res.body()).unwrap()
    }

    #[tokio::test]
    async fn runs_in_registration_order_until_response() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .global([step(&trace, "global")])
            .get("/", [step(&trace, "a"), step(&trace, "b"), finish(&trace, "done"), step(&trace, "after")])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(body(&res), "done");
        assert_eq!(*trace.lock().unwrap(), ["global", "a", "b", "done"]);
    }

    #[tokio::test]
    async fn error_skips_normal_handlers() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .get("/", [step(&trace, "a"), fail(&trace, "boom"), step(&trace, "skipped")])
            .global([forward(&trace, "log"), step(&trace, "also skipped"), render(&trace, "render")])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(body(&res), "render: boom");
        assert_eq!(*trace.lock().unwrap(), ["a", "boom", "log", "render"]);
    }

    #[tokio::test]
    async fn error_handlers_skipped_without_error() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .global([render(&trace, "render")])
            .get("/", [finish(&trace, "ok")])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(body(&res), "ok");
        assert_eq!(*trace.lock().unwrap(), ["ok"]);
    }

    #[tokio::test]
    async fn error_handler_can_replace_the_error() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .get("/", [fail(&trace, "first")])
            .global([
                error_fn(|_, _| Err(HandlerError::upstream("second"))),
                render(&trace, "render"),
            ])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(body(&res), "render: second");
    }

    #[tokio::test]
    async fn panics_enter_error_mode() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .get("/", [from_fn(|_| panic!("handler blew up")), step(&trace, "skipped")])
            .global([render(&trace, "render")])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(body(&res), "render: handler blew up");
        assert_eq!(*trace.lock().unwrap(), ["render"]);
    }

    fn slow_then_fail(_: &mut Context) -> BoxFuture<'_, Outcome> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err(HandlerError::upstream("unable to reach server"))
        })
    }

    fn slow_then_store(ctx: &mut Context) -> BoxFuture<'_, Outcome> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            ctx.locals_mut().insert("data", "fetched");
            Ok(Flow::Next)
        })
    }

    #[tokio::test]
    async fn async_handlers_hold_the_chain() {
        let pipeline = Router::new()
            .get("/ok", [
                from_async_fn(slow_then_store),
                from_fn(|ctx| Ok(Flow::respond(ctx.locals().get_str("data").unwrap_or("missing").to_owned()))),
            ])
            .get("/fail", [from_async_fn(slow_then_fail), from_fn(|_| Ok(Flow::respond("unreachable")))])
            .global([error_fn(|err, _| Ok(Response::text(err.to_string())))])
            .build();

        assert_eq!(body(&pipeline.dispatch(Request::get("/ok")).await), "fetched");
        assert_eq!(body(&pipeline.dispatch(Request::get("/fail")).await), "unable to reach server");
    }

    #[tokio::test]
    async fn params_belong_to_the_running_layer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |seen: &Arc<Mutex<Vec<Option<String>>>>| {
            let seen = Arc::clone(seen);
            from_fn(move |ctx| {
                seen.lock().unwrap().push(ctx.param("userId").map(str::to_owned));
                Ok(Flow::Next)
            })
        };
        let pipeline = Router::new()
            .global([record(&seen)])
            .scope("/user/:userId", [record(&seen)])
            .build();

        pipeline.dispatch(Request::get("/user/7/food")).await;
        assert_eq!(*seen.lock().unwrap(), [None, Some("7".to_owned())]);
    }

    #[tokio::test]
    async fn falls_back_when_nothing_responds() {
        let trace = Trace::default();
        let pipeline = Router::new()
            .get("/", [step(&trace, "a")])
            .get("/broken", [fail(&trace, "boom")])
            .build();

        let res = pipeline.dispatch(Request::get("/")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res), "Cannot GET /");

        let res = pipeline.dispatch(Request::get("/broken")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
