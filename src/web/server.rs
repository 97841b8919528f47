//! Web server startup.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::chat::Hub;
use crate::config::ServerConfig;
use crate::Result;

use super::handlers::AppState;
use super::router::create_router;

/// Bind and serve the web API until the process is stopped.
pub async fn serve(hub: Arc<Hub>, config: &ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(hub));
    let router = create_router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
