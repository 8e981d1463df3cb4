//! Keep-alive HTTP server.
//!
//! Free-tier hosts suspend processes that receive no HTTP traffic; an
//! external monitor pings these routes. Every GET answers 200 and nothing
//! here touches the database.

use std::net::SocketAddr;

use axum::Router;
use axum::response::Json;
use axum::routing::get;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

/// Liveness routes. Unknown paths also answer 200.
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/heartbeat", get(heartbeat))
        .route("/ping", get(ping))
        .fallback(home)
}

/// Serve [`router`] on all interfaces until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("🌐 Keep-alive server listening on {}", address);
    axum::serve(listener, router()).await
}

async fn home() -> &'static str {
    "EarningClubBot is running!"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now().timestamp() }))
}

async fn status() -> Json<Value> {
    Json(json!({
        "bot": "EarningClubBot",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().timestamp(),
    }))
}

async fn heartbeat() -> Json<Value> {
    Json(json!({
        "alive": true,
        "timestamp": Utc::now().timestamp(),
        "message": "Bot is running",
    }))
}

async fn ping() -> &'static str {
    "pong"
}
