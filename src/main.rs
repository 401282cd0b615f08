//! courtside-back binary entrypoint wiring REST, SSE, the clock ticker and the storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside_back::{
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    routes,
    services::clock_service,
    state::{AppState, SharedState},
};
#[cfg(any(feature = "mongo-store", feature = "postgrest-store"))]
use courtside_back::{
    dao::{game_store::GameStore, storage::StorageError},
    services::storage_supervisor,
};

const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    start_storage(&app_state).await?;
    tokio::spawn(clock_service::run(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.persist_current_game().await;
    info!("server stopped");
    Ok(())
}

/// Install the backend selected by `STORAGE_BACKEND` (`memory`, `mongo` or `postgrest`).
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let default_backend = if cfg!(feature = "mongo-store") {
        "mongo"
    } else {
        "memory"
    };
    let backend = env::var(STORAGE_BACKEND_ENV).unwrap_or_else(|_| default_backend.into());

    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => {
            warn!("using in-memory storage; games are lost on restart");
            state
                .set_game_store(Arc::new(MemoryGameStore::new()))
                .await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            info!("using MongoDB storage");
            tokio::spawn(storage_supervisor::run(state.clone(), connect_mongo));
        }
        #[cfg(feature = "postgrest-store")]
        "postgrest" => {
            info!("using PostgREST storage");
            tokio::spawn(storage_supervisor::run(state.clone(), connect_postgrest));
        }
        other => bail!("unsupported {STORAGE_BACKEND_ENV} `{other}` for this build"),
    }
    Ok(())
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> Result<Arc<dyn GameStore>, StorageError> {
    use courtside_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoGameStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "postgrest-store")]
async fn connect_postgrest() -> Result<Arc<dyn GameStore>, StorageError> {
    use courtside_back::dao::game_store::postgrest::{PostgrestConfig, PostgrestGameStore};

    let config = PostgrestConfig::from_env()?;
    let store = PostgrestGameStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
