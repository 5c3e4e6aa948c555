use std::sync::Arc;

use meerkat_app::app::router;
use meerkat_app::state::AppState;
use meerkat_core::config::load_config;
use meerkat_db::db::connection::create_pool;
use meerkat_db::db::memory::MemoryContactStore;
use meerkat_db::db::migrate::run_migrations;
use meerkat_db::db::pg::PgContactStore;
use meerkat_db::db::store::ContactStore;
use meerkat_service::import::InMemorySessions;
use salvo::Listener;
use salvo::conn::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Meerkat CardDAV server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store: Arc<dyn ContactStore> = if config.database.is_memory() {
        tracing::warn!("Using the in-process contact store; data is lost on exit");
        Arc::new(MemoryContactStore::new())
    } else {
        run_migrations(&config.database.url).await?;
        let pool = create_pool(
            &config.database.url,
            u32::from(config.database.max_connections),
        )
        .await?;
        tracing::info!("Database connection pool created.");
        Arc::new(PgContactStore::new(pool))
    };

    tokio::fs::create_dir_all(&config.photos.dir).await?;

    let state = AppState::build(&config, store, Arc::new(InMemorySessions::new()))?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = router(config, Arc::new(state))?;

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
