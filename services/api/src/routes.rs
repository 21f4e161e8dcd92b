use crate::infra::{AppState, Wiring};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use espace::catalog::catalog_router;
use espace::geography::{geography_router, ReferenceStore};
use espace::registry::registry_router;
use serde_json::json;
use std::sync::Arc;

/// Registry, catalog and geography routes plus the operational endpoints.
pub(crate) fn application_router(wiring: &Wiring, reference: Arc<dyn ReferenceStore>) -> Router {
    registry_router(wiring.registry.clone())
        .merge(catalog_router(wiring.catalog.clone()))
        .merge(geography_router(reference))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
