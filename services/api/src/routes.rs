use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use karin_engine::workflows::karin::{
    karin_router, ActorDirectory, CaseId, CaseStore, CounterStore, InMemoryCaseStore, KarinCase,
    KarinProcessService, NotificationDispatcher, StoreError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterCaseRequest {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) company_id: String,
    #[serde(default = "default_true")]
    pub(crate) is_karin_case: bool,
}

fn default_true() -> bool {
    true
}

/// Mounts the process routes over an in-memory case store, plus the
/// operational endpoints.
pub(crate) fn with_karin_routes<C, N, D>(
    service: Arc<KarinProcessService<InMemoryCaseStore, C, N, D>>,
    cases: Arc<InMemoryCaseStore>,
) -> axum::Router
where
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    karin_router(service)
        .route(
            "/api/v1/karin/cases",
            axum::routing::post(register_case_endpoint),
        )
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(Extension(cases))
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

pub(crate) async fn register_case_endpoint(
    Extension(cases): Extension<Arc<InMemoryCaseStore>>,
    Json(payload): Json<RegisterCaseRequest>,
) -> Response {
    let id = payload.id.trim();
    if id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "case id must not be empty" })),
        )
            .into_response();
    }

    let case = KarinCase {
        id: CaseId(id.to_string()),
        code: payload.code,
        company_id: payload.company_id,
        is_karin_case: payload.is_karin_case,
        process: None,
    };
    match cases.save_case(case.clone(), Some(0)) {
        Ok(_) => {
            info!(case_id = %case.id, company_id = %case.company_id, "case registered");
            (StatusCode::CREATED, Json(case)).into_response()
        }
        Err(StoreError::Unavailable(reason)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": reason })),
        )
            .into_response(),
        Err(err) => (StatusCode::CONFLICT, Json(json!({ "error": err.to_string() })))
            .into_response(),
    }
}
