mod api;
mod app;
mod auth;
mod bootstrap;
mod config;
mod dto;
mod error;
mod middleware;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::time::Duration;

use signage_core::throttle::now_unix;
use signage_core::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Attempt records untouched this long are purged.
const STALE_ATTEMPT_SECS: i64 = 24 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "signage_web=debug,signage_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();

    let db = Database::new(&config.storage.database).await?;
    let state = AppState::new(config, db);
    bootstrap::prepare_storage(&state.config, &state.db, &state.files).await?;

    // Session + attempt cleanup task
    let cleanup_store = state.session_store.clone();
    let cleanup_attempts = state.db.attempts();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_store.cleanup_expired();
            tracing::trace!(sessions = cleanup_store.len(), "Session cleanup");
            let now = now_unix();
            match cleanup_attempts.purge_stale(now - STALE_ATTEMPT_SECS, now).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {n} stale login attempt records"),
                Err(e) => tracing::warn!("Login attempt cleanup failed: {e}"),
            }
        }
    });

    let app = app::build_router(state)?;

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("signage-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("signage-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
