use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::actions::MoveAction;
use super::domain::SessionId;
use super::repository::{RepositoryError, SessionRepository};
use super::service::{QuoteWizardService, WizardServiceError};
use super::session::{QuoteFetchState, WizardSession};

type SharedService<R> = Arc<QuoteWizardService<R>>;

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    pub actions: Vec<MoveAction>,
}

#[derive(Debug, Deserialize)]
pub struct GoToRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuoteRequest {
    pub vendor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

/// Router builder exposing the quote wizard under `/api/v1/wizard`.
pub fn wizard_router<R>(service: SharedService<R>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/wizard/sessions", post(start_handler::<R>))
        .route(
            "/api/v1/wizard/sessions/:session_id",
            get(snapshot_handler::<R>).delete(discard_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/actions",
            post(actions_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/next",
            post(next_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/back",
            post(back_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/goto",
            post(goto_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/resume",
            post(resume_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/quotes",
            post(quotes_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/quotes/select",
            post(select_handler::<R>),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/checkout",
            post(checkout_handler::<R>),
        )
        .route("/api/v1/wizard/addresses", get(addresses_handler::<R>))
        .route("/api/v1/wizard/report", get(report_handler::<R>))
        .with_state(service)
}

fn snapshot_response<R>(
    service: &QuoteWizardService<R>,
    status: StatusCode,
    session: &WizardSession,
) -> Response
where
    R: SessionRepository + 'static,
{
    (status, axum::Json(service.snapshot(session))).into_response()
}

fn error_response<R>(
    service: &QuoteWizardService<R>,
    id: Option<&SessionId>,
    error: WizardServiceError,
) -> Response
where
    R: SessionRepository + 'static,
{
    let status = match &error {
        WizardServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WizardServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        WizardServiceError::Navigation(_)
        | WizardServiceError::Incomplete(_)
        | WizardServiceError::AlreadyPaid => StatusCode::CONFLICT,
        WizardServiceError::Resume(_)
        | WizardServiceError::QuoteNotOffered(_)
        | WizardServiceError::CheckoutMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WizardServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
    };

    // Refusals carry the unchanged screen so the client can stay where it is.
    let snapshot = id
        .filter(|_| !matches!(error, WizardServiceError::Repository(_)))
        .and_then(|id| service.get(id).ok())
        .map(|session| service.snapshot(&session));

    let payload = json!({
        "error": error.to_string(),
        "snapshot": snapshot,
    });
    (status, axum::Json(payload)).into_response()
}

fn respond<R>(
    service: &QuoteWizardService<R>,
    id: &SessionId,
    result: Result<WizardSession, WizardServiceError>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match result {
        Ok(session) => snapshot_response(service, StatusCode::OK, &session),
        Err(error) => error_response(service, Some(id), error),
    }
}

pub(crate) async fn start_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    match service.start() {
        Ok(session) => snapshot_response(&service, StatusCode::CREATED, &session),
        Err(error) => error_response(&service, None, error),
    }
}

pub(crate) async fn snapshot_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.get(&id);
    respond(&service, &id, result)
}

pub(crate) async fn discard_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    match service.discard(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(&service, None, error),
    }
}

pub(crate) async fn actions_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<ActionsRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.apply(&id, &request.actions);
    respond(&service, &id, result)
}

pub(crate) async fn next_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.next(&id);
    respond(&service, &id, result)
}

pub(crate) async fn back_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.back(&id);
    respond(&service, &id, result)
}

pub(crate) async fn goto_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<GoToRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.go_to(&id, request.index);
    respond(&service, &id, result)
}

pub(crate) async fn resume_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<ResumeRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.resume(&id, &request.url).await;
    match result {
        Ok(session) if session.payment_error.is_some() && !session.is_booked() => {
            snapshot_response(&service, StatusCode::BAD_GATEWAY, &session)
        }
        other => respond(&service, &id, other),
    }
}

pub(crate) async fn quotes_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    match service.fetch_quotes(&id).await {
        Ok(session) if matches!(session.quotes, QuoteFetchState::Failed { .. }) => {
            snapshot_response(&service, StatusCode::BAD_GATEWAY, &session)
        }
        other => respond(&service, &id, other),
    }
}

pub(crate) async fn select_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SelectQuoteRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service.select_quote(&id, &request.vendor_id);
    respond(&service, &id, result)
}

pub(crate) async fn checkout_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    match service.start_checkout(&id).await {
        Ok(session) if session.checkout.is_none() => {
            snapshot_response(&service, StatusCode::BAD_GATEWAY, &session)
        }
        other => respond(&service, &id, other),
    }
}

pub(crate) async fn addresses_handler<R>(
    State(service): State<SharedService<R>>,
    Query(query): Query<SuggestQuery>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.suggest_addresses(&query.q).await {
        Ok(suggestions) => {
            let payload = json!({ "suggestions": suggestions });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(&service, None, error),
    }
}

pub(crate) async fn report_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    match service.report() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(&service, None, error),
    }
}
