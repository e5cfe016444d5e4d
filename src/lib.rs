pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{
    config::{Settings, StoreBackend},
    redis::RedisHandle,
    shutdown::Shutdown,
    state::AppState,
    telemetry,
};
use crate::services::exam_backend::HttpExamBackend;
use crate::session::redis_store::RedisTimeStore;
use crate::session::store::{MemoryTimeStore, TimeStore};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    let time_store: Arc<dyn TimeStore> = match settings.store().backend {
        StoreBackend::Redis => {
            if let Err(err) = redis.connect().await {
                tracing::error!(
                    error = %err,
                    "Failed to connect to Redis; session state is unavailable until it recovers"
                );
            } else {
                tracing::info!("Redis connected successfully");
            }
            Arc::new(RedisTimeStore::new(redis.clone(), settings.store().state_ttl_seconds))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory session store; sittings do not survive a restart");
            Arc::new(MemoryTimeStore::new())
        }
    };

    let backend = Arc::new(HttpExamBackend::from_settings(&settings)?);
    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let state = AppState::new(settings, redis.clone(), time_store, backend, shutdown.clone());
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        store = state.settings().store().backend.as_str(),
        "Proctor session API listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
