//! Foosball Back binary entrypoint wiring REST, SSE and the match store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foosball_back::{
    config::AppConfig,
    dao::match_store::InMemoryMatchStore,
    routes,
    services::sse_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);
    sse_service::spawn_degraded_relay(app_state.clone());

    install_store(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

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

    Ok(())
}

/// Pick the storage backend from `STORAGE_BACKEND`, defaulting to MongoDB when `MONGO_URI` is set.
async fn install_store(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").ok();
    match backend.as_deref() {
        Some("memory") => install_memory_store(state).await,
        #[cfg(feature = "mongo-store")]
        Some("mongo") => spawn_mongo_supervisor(state),
        #[cfg(feature = "mongo-store")]
        None if env::var("MONGO_URI").is_ok() => spawn_mongo_supervisor(state),
        None => install_memory_store(state).await,
        Some(other) => anyhow::bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
    Ok(())
}

async fn install_memory_store(state: &SharedState) {
    info!("using in-memory match store");
    state.set_store(Arc::new(InMemoryMatchStore::new())).await;
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: &SharedState) {
    use foosball_back::dao::{
        match_store::{
            MatchStore,
            mongodb::{MongoConfig, MongoMatchStore},
        },
        storage::StorageError,
    };
    use foosball_back::services::storage_supervisor;

    info!("using MongoDB match store");
    tokio::spawn(storage_supervisor::run(state.clone(), || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoMatchStore::connect(config).await?;
        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn MatchStore>)
    }));
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

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
