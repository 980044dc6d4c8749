//! Local stand-in for the image feed, the forecast API and the chat endpoint.
//!
//! Listens on `CLOCK_MOCK_ADDR` (default `127.0.0.1:3000`). Pass `--stable` to keep the
//! feed pointing at the same image instead of rotating it on every request.

use std::env;
use std::error::Error;

use log::info;
use tokio::net::TcpListener;

use snowclock::mock::{self, Routes};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let rotate = !env::args().skip(1).any(|arg| arg == "--stable");
    let addr = env::var("CLOCK_MOCK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Mock feeds on http://{} (rotating images: {})",
        listener.local_addr()?,
        rotate
    );

    tokio::select! {
        result = mock::serve(listener, Routes::new(rotate)) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(())
}
