mod config;

use tower_http::trace::TraceLayer;
use tracing::info;

use chatsite_api::AppStateInner;
use chatsite_store::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chatsite=debug,chatsite_api=debug,chatsite_store=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init storage
    let store = Store::open(&config.data_dir)?;
    let state = AppStateInner::new(store, config.session_secret.clone(), config.pfp_dir.clone())?;
    info!("Serving avatars from {}", config.pfp_dir.display());

    let app = chatsite_api::router(state).layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("CHAT SITE listening on {}", addr);

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
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
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
