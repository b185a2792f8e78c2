use std::sync::Arc;

use tracing::info;
use ums_mcp_server::{
    build_app,
    config::Config,
    domain::tools::register_user_tools,
    logging,
    mcp::{
        adapter::ToolInvoker,
        registry::ToolRegistry,
        server::McpServer,
        session::{spawn_idle_sweeper, SessionStore},
    },
    user_client::HttpUserClient,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let users = Arc::new(HttpUserClient::new(
        config.user_service_url.clone(),
        config.backend_timeout,
    )?);
    let mut registry = ToolRegistry::new();
    register_user_tools(&mut registry, users)?;

    let sessions = Arc::new(SessionStore::new());
    if let Some(max_idle) = config.session_idle_timeout {
        let every = (max_idle / 4).max(std::time::Duration::from_secs(1));
        spawn_idle_sweeper(sessions.clone(), max_idle, every);
        info!(max_idle_secs = max_idle.as_secs(), "idle session eviction enabled");
    }

    let server = McpServer::new(
        registry,
        sessions,
        ToolInvoker::new(config.tool_concurrency),
    );
    let app = build_app(AppState::new(server));
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        user_service_url = %config.user_service_url,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
