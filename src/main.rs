//! Serves the demo application on port 3000.
//!
//! Run with:
//!   RUST_LOG=debug cargo run
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/user/1
//!   curl http://localhost:3000/user/0/food
//!   curl http://localhost:3000/user/abc
//!   curl http://localhost:3000/async
//!   curl http://localhost:3000/nonexistent

use relay::{Server, demo};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), relay::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    Server::bind(demo::ADDR)?.serve(demo::app()).await
}
