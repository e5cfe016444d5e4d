use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::config::StoreBackend;
use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        docs_url: format!("{}/docs", state.settings().api().api_v1_str),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.settings().store().backend {
        StoreBackend::Memory => {
            components.insert("store".to_string(), "memory".to_string());
        }
        StoreBackend::Redis => match state.redis().health().await {
            RedisHealth::Healthy => {
                components.insert("store".to_string(), "healthy".to_string());
            }
            RedisHealth::Disconnected => {
                components.insert("store".to_string(), "disconnected".to_string());
                status = "unhealthy".to_string();
            }
            RedisHealth::Unhealthy(error) => {
                components.insert("store".to_string(), format!("unhealthy: {error}"));
                status = "degraded".to_string();
            }
        },
    }

    components.insert("sessions".to_string(), state.session_count().await.to_string());

    Json(HealthResponse { service: "proctor-session".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
