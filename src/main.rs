//! Campus Library server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_library::{
    api,
    config::{AppConfig, StoreBackend},
    services::Services,
    store::{FirestoreStore, MemoryStore, StudentStore},
    sync::Outbox,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("campus_library={},tower_http=debug", config.logging.level).into()
    });
    let json = config.logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting Campus Library v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn StudentStore> = match config.store.backend {
        StoreBackend::Firestore => {
            tracing::info!(
                "Using Firestore project {} collection {}",
                config.store.project_id,
                config.store.collection
            );
            Arc::new(FirestoreStore::new(&config.store).context("Failed to create store client")?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory student store, students are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let outbox = Outbox::open(&config.sync.outbox_path).await;
    let services = Services::start(&config, store, outbox).await;

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid host address {}", config.server.host))?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
