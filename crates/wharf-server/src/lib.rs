//! Local HTTP server for installed component assets.
//!
//! Serves files out of the Extensions directory to the host UI over
//! loopback HTTP, with permissive CORS so component frames can fetch
//! their own assets.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use wharf_core::ExtensionsRoot;

mod routes;

pub use routes::create_router;

/// Default port the host UI expects the asset server on.
pub const DEFAULT_PORT: u16 = 45653;

/// Bind and serve until interrupted.
pub async fn run(bind: SocketAddr, root: ExtensionsRoot) -> anyhow::Result<()> {
    let app = create_router(Arc::new(root));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind asset server to {bind}"))?;
    info!(addr = %bind, "Asset server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("asset server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutting down asset server");
}
