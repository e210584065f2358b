//! # Launchpad Agent Server
//!
//! HTTP API server for an AI-assisted memecoin launchpad agent, built
//! with Axum and Tokio.
//!
//! ## Features
//! - Market scanning against the pump.fun REST API
//! - LLM-backed advisory oracle for narratives, evaluations and ideas
//! - Unsigned Solana transaction drafting (no signing, no submission)
//! - Command dispatch plus a conversational SSE surface
//!
//! ## Architecture
//! - `server`: server initialization and route registration
//! - `config`: environment variable configuration
//! - `agent`: market data, snapshotting, oracle and the orchestrator
//! - `onchain`: instruction drafting and read-only RPC lookups
//! - `routes`: HTTP handlers organized by API domain
//!
//! ## Running the Server
//! ```bash
//! cp .env.example .env   # set OPENAI_API_KEY etc.
//! cargo run
//! ```
//!
//! The server listens on `0.0.0.0:3000` by default; verify with
//! `curl http://localhost:3000/ping`.

mod agent;
mod config;
mod onchain;
mod routes;
mod server;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point.
///
/// Loads `.env`, initializes the tracing subscriber and starts the HTTP
/// server. Runs until the process is terminated.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    server::start().await;
}
