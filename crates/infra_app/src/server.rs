//! HTTP server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::routes::build_router;
use crate::store::ItemStore;

/// Serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, store: Arc<dyn ItemStore>) -> AppResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Could not listen for shutdown signal: {}", e),
    }
}
