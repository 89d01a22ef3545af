//! Built-in handlers.
//!
//! The usual tail of an application:
//!
//! ```rust
//! use relay::{Router, middleware};
//!
//! let app = Router::new()
//!     // … routes …
//!     .global([middleware::log_errors(), middleware::json_errors()])
//!     .global([middleware::not_found("sorry, can't help you")]);
//! ```
//!
//! `log_errors` and `json_errors` are error handlers, so they are skipped
//! unless something upstream failed. `not_found` is a normal handler, so a
//! failed request never reaches it.

use serde_json::json;
use tracing::error;

use crate::handler::{Flow, Handler, error_fn, from_fn};
use crate::response::Response;

/// Logs the pending error and forwards it unchanged.
pub fn log_errors() -> Handler {
    error_fn(|err, ctx| {
        error!(path = ctx.path(), kind = ?err.kind(), "ERROR {err}");
        Err(err)
    })
}

/// Answers with `{"error": "<message>"}` and ends the chain.
///
/// The status stays `200 OK`.
pub fn json_errors() -> Handler {
    error_fn(|err, _| Ok(Response::json_value(&json!({ "error": err.message() }))))
}

/// Answers every request that reaches it with a fixed text body.
pub fn not_found(body: impl Into<String>) -> Handler {
    let body = body.into();
    from_fn(move |_| Ok(Flow::respond(body.clone())))
}
