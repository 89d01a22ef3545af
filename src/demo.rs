//! The demo application served by the `relay` binary.
//!
//! Four small examples of chaining:
//!
//! 1. `GET /`: two handlers fill the locals, a third returns them as JSON.
//! 2. `/user/:userId`: a scoped handler validates the id and loads the user
//!    for every route mounted below it.
//! 3. `GET /async`: a handler awaits a flaky upstream call; failure goes
//!    down the error path.
//! 4. Error handlers log the error, then render it as `{"error": …}`.
//!
//! Anything else falls through to the catch-all.

use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::{BoxFuture, Flow, Outcome, from_async_fn, from_fn};
use crate::middleware;
use crate::response::Response;
use crate::router::Router;

/// Where the `relay` binary listens.
pub const ADDR: &str = "0.0.0.0:3000";

/// The user table, indexed by user id.
pub const USERS: [&str; 3] = ["taco", "smokey", "ginger"];

/// Body of the catch-all route.
pub const FALLBACK: &str = "sorry, can't help you";

/// What the simulated upstream returns when it is reachable.
pub const UPSTREAM_DATA: &str = "some data from Facebook";

const UPSTREAM_DELAY: Duration = Duration::from_millis(500);

/// One or two digits, no leading zero. `0` itself is allowed.
static USER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9][0-9]?)$").expect("user id pattern is valid")
});

/// Builds the demo router.
pub fn app() -> Router {
    Router::new()
        .get("/", [from_fn(m1), from_fn(m2), from_fn(show_locals)])
        .scope("/user/:userId", [from_fn(load_user)])
        .nest("/user/:userId", user_routes())
        .get("/async", [from_async_fn(fetch_data), from_fn(show_data)])
        .global([middleware::log_errors(), middleware::json_errors()])
        .global([middleware::not_found(FALLBACK)])
}

fn user_routes() -> Router {
    Router::new()
        .get("/", [from_fn(show_user)])
        .get("/food", [from_fn(show_food)])
}

// ── Example 1: locals ─────────────────────────────────────────────────────────

fn m1(ctx: &mut Context) -> Outcome {
    ctx.locals_mut().insert("m1", "hi from m1");
    Ok(Flow::Next)
}

fn m2(ctx: &mut Context) -> Outcome {
    ctx.locals_mut().insert("m2", "hi from m2");
    Ok(Flow::Next)
}

fn show_locals(ctx: &mut Context) -> Outcome {
    Ok(Flow::Respond(Response::json_value(ctx.locals().as_map())))
}

// ── Example 2: scoped middleware ──────────────────────────────────────────────

/// Resolves `:userId` to a name and stores it under `user`.
fn load_user(ctx: &mut Context) -> Outcome {
    let id = ctx.param("userId").unwrap_or_default();
    if !USER_ID.is_match(id) {
        return Err(HandlerError::validation("invalid userId"));
    }

    let user = id.parse::<usize>().ok().and_then(|i| USERS.get(i)).copied();
    let Some(user) = user else {
        return Err(HandlerError::validation("user not found"));
    };

    ctx.locals_mut().insert("user", user);
    Ok(Flow::Next)
}

fn show_user(ctx: &mut Context) -> Outcome {
    let user = current_user(ctx)?;
    Ok(Flow::respond(user.to_owned()))
}

fn show_food(ctx: &mut Context) -> Outcome {
    let food = if current_user(ctx)? == "taco" { "tacos" } else { "salmon" };
    Ok(Flow::respond(food))
}

fn current_user(ctx: &Context) -> Result<&str, HandlerError> {
    ctx.locals().get_str("user").ok_or_else(|| HandlerError::validation("user not found"))
}

// ── Example 3: async middleware ───────────────────────────────────────────────

fn fetch_data(ctx: &mut Context) -> BoxFuture<'_, Outcome> {
    Box::pin(async move {
        // Forward explicitly; `?` would do the same.
        match get_data_from_upstream().await {
            Ok(data) => {
                ctx.locals_mut().insert("data", data);
                Ok(Flow::Next)
            }
            Err(err) => Err(err),
        }
    })
}

fn show_data(ctx: &mut Context) -> Outcome {
    let data = ctx.locals().get_str("data")
        .ok_or_else(|| HandlerError::upstream("unable to reach server"))?;
    Ok(Flow::respond(data.to_owned()))
}

/// Simulated network call: succeeds unless the clock lands on a multiple of
/// ten milliseconds when it completes.
async fn get_data_from_upstream() -> Result<&'static str, HandlerError> {
    tokio::time::sleep(UPSTREAM_DELAY).await;
    upstream_reply(now_millis())
}

/// The upstream's answer at time `millis`.
pub fn upstream_reply(millis: u128) -> Result<&'static str, HandlerError> {
    if millis % 10 == 0 {
        Err(HandlerError::upstream("unable to reach server"))
    } else {
        Ok(UPSTREAM_DATA)
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
