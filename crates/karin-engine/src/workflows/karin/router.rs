use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::CaseId;
use super::folio::CounterStore;
use super::ledger::{Authority, LedgerError, NotificationDraft, NotificationStatus};
use super::repository::{ActorDirectory, CaseStore, NotificationDispatcher, StoreError};
use super::service::{KarinProcessService, ServiceError};
use super::transition::{InvalidTransition, StageData, TransitionError};
use super::updates::{ProcessError, ProcessUpdate};

type SharedService<S, C, N, D> = Arc<KarinProcessService<S, C, N, D>>;

/// Router builder exposing the Ley Karin process endpoints.
pub fn karin_router<S, C, N, D>(service: SharedService<S, C, N, D>) -> Router
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/karin/cases/:case_id/open",
            post(open_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/advance",
            post(advance_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/subsanation",
            post(subsanation_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/updates",
            post(update_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/notifications/:authority",
            post(record_notification_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/notifications/:authority/:record_id",
            patch(notification_status_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/documents",
            post(register_document_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/stage",
            get(stage_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/deadlines",
            get(deadlines_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/compliance",
            get(compliance_handler::<S, C, N, D>),
        )
        .route(
            "/api/v1/karin/cases/:case_id/audit.csv",
            get(audit_handler::<S, C, N, D>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenBody {
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceBody {
    actor_id: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    data: StageData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubsanationBody {
    actor_id: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    status: NotificationStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentBody {
    document_type: String,
    title: String,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeadlineQuery {
    #[serde(default)]
    today: Option<NaiveDate>,
    #[serde(default)]
    all: bool,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// HTTP status for a service failure.
pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Transition(TransitionError::Compliance(_))
        | ServiceError::Transition(TransitionError::Invalid(
            InvalidTransition::DateOutOfRange { .. },
        )) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Transition(TransitionError::Invalid(_)) => StatusCode::CONFLICT,
        ServiceError::Process(ProcessError::NotFound { .. })
        | ServiceError::Ledger(LedgerError::NotFound { .. })
        | ServiceError::Store(StoreError::NotFound(_))
        | ServiceError::ProcessNotOpened(_) => StatusCode::NOT_FOUND,
        ServiceError::Process(ProcessError::EmptyMeasures)
        | ServiceError::Process(ProcessError::NoReportToApprove)
        | ServiceError::Process(ProcessError::DateOutOfRange(_))
        | ServiceError::NotKarinCase(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Process(_)
        | ServiceError::Ledger(_)
        | ServiceError::Store(StoreError::Conflict { .. })
        | ServiceError::AlreadyOpened(_)
        | ServiceError::ConcurrentModification(_) => StatusCode::CONFLICT,
        ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Audit(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: ServiceError) -> Response {
    let status = status_for(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

pub(crate) async fn open_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Json(body): Json<OpenBody>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let case_id = CaseId(case_id);
    match service.open_process(&case_id, body.date.unwrap_or_else(today)) {
        Ok(process) => (StatusCode::CREATED, Json(process)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Json(body): Json<AdvanceBody>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let case_id = CaseId(case_id);
    let on = body.date.unwrap_or_else(today);
    match service.advance_stage(&case_id, &body.actor_id, body.notes, on, body.data) {
        Ok(change) => (StatusCode::OK, Json(change)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn subsanation_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Json(body): Json<SubsanationBody>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let case_id = CaseId(case_id);
    let on = body.date.unwrap_or_else(today);
    match service.enter_subsanation(&case_id, &body.actor_id, body.notes, on) {
        Ok(change) => (StatusCode::OK, Json(change)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Json(update): Json<ProcessUpdate>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    match service.apply_update(&CaseId(case_id), update) {
        Ok(process) => (StatusCode::OK, Json(process)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_notification_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path((case_id, authority)): Path<(String, String)>,
    Json(draft): Json<NotificationDraft>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let authority: Authority = match authority.parse() {
        Ok(authority) => authority,
        Err(error) => return bad_request(error.to_string()),
    };
    match service.record_notification(&CaseId(case_id), authority, draft) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn notification_status_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path((case_id, authority, record_id)): Path<(String, String, String)>,
    Json(body): Json<StatusBody>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let authority: Authority = match authority.parse() {
        Ok(authority) => authority,
        Err(error) => return bad_request(error.to_string()),
    };
    match service.update_notification_status(&CaseId(case_id), authority, &record_id, body.status)
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_document_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Json(body): Json<DocumentBody>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let on = body.date.unwrap_or_else(today);
    match service.register_document(&CaseId(case_id), &body.document_type, &body.title, on) {
        Ok(document) => (StatusCode::CREATED, Json(document)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stage_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    match service.stage_info(&CaseId(case_id)) {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn deadlines_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
    Query(query): Query<DeadlineQuery>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    let case_id = CaseId(case_id);
    let now = query.today.unwrap_or_else(today);
    let result = if query.all {
        service.all_deadlines(&case_id, now)
    } else {
        service.active_deadlines(&case_id, now)
    };

    match result {
        Ok(deadlines) => {
            let views: Vec<_> = deadlines
                .iter()
                .map(|deadline| {
                    json!({
                        "key": deadline.key,
                        "title": deadline.title,
                        "stage": deadline.stage,
                        "start_date": deadline.start_date,
                        "end_date": deadline.end_date,
                        "mode": deadline.mode,
                        "days_total": deadline.days_total,
                        "days_elapsed": deadline.days_elapsed,
                        "days_remaining": deadline.days_remaining,
                        "status": deadline.status,
                        "status_label": deadline.status.label(),
                        "is_urgent": deadline.is_urgent,
                        "progress_percent": deadline.progress_percent(),
                    })
                })
                .collect();
            let payload = json!({
                "case_id": case_id,
                "today": now,
                "deadlines": views,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compliance_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    match service.compliance_status(&CaseId(case_id)) {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_handler<S, C, N, D>(
    State(service): State<SharedService<S, C, N, D>>,
    Path(case_id): Path<String>,
) -> Response
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    match service.audit_export(&CaseId(case_id)) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}
