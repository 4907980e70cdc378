//! MyActivity API server
//!
//! Usage:
//!   JWT_SECRET=... myactivity --bind-addr 0.0.0.0:8080
//!
//! Environment:
//!   JWT_SECRET - Token signing secret (required)
//!   STORE_BACKEND - sqlite (default) or memory
//!   AUTH_DB_PATH - SQLite file (default: myactivity_auth.db)
//!   BCRYPT_COST - bcrypt work factor (default: 12)
//!   STORE_TIMEOUT_MS - Per-call credential store deadline (default: 5000)
//!   CORS_ALLOWED_ORIGIN - Restrict CORS to one origin (default: permissive)

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use myactivity_backend::{api, build_auth_state, config::AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();
    init_tracing();

    info!("🚀 MyActivity API starting");
    info!("Configuration: {:?}", config);

    let auth_state = build_auth_state(&config).context("Failed to initialize authentication")?;
    info!("🔐 Authentication initialized ({:?} store)", config.store_backend);

    let app = api::create_router(auth_state, config.cors_origin.as_deref())?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "myactivity_backend=debug,myactivity=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
