use std::sync::Arc;

use netgauge_core::TracingLogger;
use netgauge_server::{AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "netgauge=debug,netgauge_core=debug,netgauge_server=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    let limits = config.limits;

    let state = AppState {
        limits,
        logger: Arc::new(TracingLogger),
    };
    let app = netgauge_server::app(state);

    let addr = config.bind_addr()?;
    info!("netgauge listening on {}", addr);
    info!(
        "Limits: default download {} bytes, max download {} bytes, max upload {} bytes",
        limits.default_download, limits.max_download, limits.max_upload
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
