//! User management exposed over the Model Context Protocol
//!
//! Wires the session-aware MCP engine and the user tools into an axum router.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod user_client;

use mcp::server::McpServer;

pub const MCP_ENDPOINT: &str = "/mcp";
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
}

impl AppState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server: Arc::new(server),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route(MCP_ENDPOINT, post(http::handlers::mcp_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
