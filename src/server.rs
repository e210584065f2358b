//! # Server Module
//!
//! HTTP server setup and route configuration for the launchpad agent.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::agent::AgentOrchestrator;
use crate::agent::market_data::MarketDataClient;
use crate::agent::oracle::OpenAiOracle;
use crate::agent::snapshot::MarketSnapshotBuilder;
use crate::config::CONFIG;
use crate::routes::{agent, health::ping};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AgentOrchestrator>,
}

/// Starts the launchpad agent HTTP server.
///
/// Wires the orchestrator into shared application state, registers all
/// routes and serves until the process is terminated.
pub async fn start() {
    let market = MarketDataClient::new();
    let snapshots = MarketSnapshotBuilder::new(market.clone());
    let oracle = Arc::new(OpenAiOracle::new());
    let orchestrator = Arc::new(AgentOrchestrator::new(market, snapshots, oracle));

    let app_state = AppState { orchestrator };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::ORIGIN,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ]);

    let app = Router::new()
        .route("/ping", get(ping))
        .merge(agent::create_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(app_state);

    let addr = std::net::SocketAddr::new(
        CONFIG
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0])),
        CONFIG.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address - port may already be in use");

    tracing::info!("Launchpad agent server starting");
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/ping", addr);
    tracing::info!("Agent endpoints available at http://{}/api/v1/agent/*", addr);

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
