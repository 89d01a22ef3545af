//! # relay
//!
//! Ordered middleware chains for HTTP, on hyper.
//!
//! A request walks the handlers registered for it in registration order.
//! Each handler reads and writes a per-request [`Context`], then either
//! continues, answers, or fails. A failure skips every remaining normal
//! handler and goes to the error handlers, in order, until one of them
//! answers.
//!
//! - Routes and scoped middleware: [`Router`]
//! - Handler variants and adapters: [`Handler`], [`from_fn`],
//!   [`from_async_fn`], [`error_fn`]
//! - The chain walker: [`Pipeline::dispatch`]
//! - Serving: [`Server`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use relay::{Context, Flow, HandlerError, Outcome, Router, Server, from_fn, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay::Error> {
//!     let app = Router::new()
//!         .scope("/users/:id", [from_fn(check_id)])
//!         .get("/users/:id", [from_fn(get_user)])
//!         .global([middleware::log_errors(), middleware::json_errors()])
//!         .global([middleware::not_found("sorry, can't help you")]);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn check_id(ctx: &mut Context) -> Outcome {
//!     match ctx.param("id") {
//!         Some(id) if id.bytes().all(|b| b.is_ascii_digit()) => Ok(Flow::Next),
//!         _ => Err(HandlerError::validation("invalid id")),
//!     }
//! }
//!
//! fn get_user(ctx: &mut Context) -> Outcome {
//!     let id = ctx.param("id").unwrap_or_default();
//!     Ok(Flow::respond(format!("user {id}")))
//! }
//! ```

mod context;
mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod router;
mod server;

pub mod demo;
pub mod middleware;

pub use context::{Context, Locals};
pub use error::{Error, ErrorKind, HandlerError};
pub use handler::{
    BoxFuture, ErrorMiddleware, Flow, Handler, Middleware, Outcome, Recovery, error_fn,
    from_async_fn, from_fn,
};
pub use pipeline::Pipeline;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
