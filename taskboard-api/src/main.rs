//! # Taskboard API Server
//!
//! Multi-tenant project/task tracker. Users register, create projects,
//! manage their team and track tasks; every project and task operation is
//! gated by the caller's owner/member standing on the project.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskboard \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p taskboard-api
//! ```

use std::sync::Arc;

use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::db::migrations::{latest_applied_version, run_migrations};
use taskboard_shared::db::pool::{close_pool, create_pool};
use taskboard_shared::events::BroadcastRelay;
use taskboard_shared::store::{PgStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(config.pool_config()).await?;
    run_migrations(&pool).await?;
    tracing::info!(
        schema_version = ?latest_applied_version(&pool).await?,
        "Database migrations applied"
    );

    let pg_store = PgStore::new(pool);
    let store: Arc<dyn Store> = Arc::new(pg_store.clone());
    let relay = BroadcastRelay::new(config.events.capacity);
    let bind_address = config.bind_address();

    let app = build_router(AppState::new(store, relay, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pg_store.pool().clone()).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
