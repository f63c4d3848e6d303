use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::catalog::SurveyFactor;
use super::domain::{DriveType, SeatChoice};
use super::repository::{RepositoryError, SessionId, SessionRepository};
use super::service::{SessionCommand, SurveyService, SurveyServiceError};
use crate::workflows::recommendation::{HandoffError, RankingService, RecommendationError};

/// Router builder exposing the survey walk-through and the recommendation step.
pub fn survey_router<R, S>(service: Arc<SurveyService<R, S>>) -> Router
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    Router::new()
        .route("/api/v1/survey/catalog", get(catalog_handler::<R, S>))
        .route("/api/v1/survey/sessions", post(open_handler::<R, S>))
        .route(
            "/api/v1/survey/sessions/:session_id",
            get(session_handler::<R, S>),
        )
        .route(
            "/api/v1/survey/sessions/:session_id/commands",
            post(command_handler::<R, S>),
        )
        .route(
            "/api/v1/survey/sessions/:session_id/submit",
            post(submit_handler::<R, S>),
        )
        .route(
            "/api/v1/survey/sessions/:session_id/recommendations",
            post(recommendations_handler::<R, S>),
        )
        .with_state(service)
}

#[derive(Serialize)]
struct SeatOptionView {
    seats: u8,
    label: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct DriveOptionView {
    id: DriveType,
    label: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct CatalogView<'a> {
    factors: &'a [SurveyFactor],
    total_questions: usize,
    seat_options: Vec<SeatOptionView>,
    drive_options: Vec<DriveOptionView>,
}

pub(crate) async fn catalog_handler<R, S>(
    State(service): State<Arc<SurveyService<R, S>>>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    let catalog = service.catalog();
    let view = CatalogView {
        factors: catalog.factors(),
        total_questions: catalog.total_questions(),
        seat_options: SeatChoice::ordered()
            .into_iter()
            .map(|choice| SeatOptionView {
                seats: choice.seats(),
                label: choice.label(),
                description: choice.description(),
            })
            .collect(),
        drive_options: DriveType::ordered()
            .into_iter()
            .map(|drive| DriveOptionView {
                id: drive,
                label: drive.label(),
                description: drive.description(),
            })
            .collect(),
    };
    (StatusCode::OK, axum::Json(view)).into_response()
}

pub(crate) async fn open_handler<R, S>(State(service): State<Arc<SurveyService<R, S>>>) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    match service.open_session() {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<R, S>(
    State(service): State<Arc<SurveyService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn command_handler<R, S>(
    State(service): State<Arc<SurveyService<R, S>>>,
    Path(session_id): Path<String>,
    axum::Json(command): axum::Json<SessionCommand>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    match service.apply(&SessionId(session_id), command) {
        Ok((transition, record)) => {
            let payload = json!({
                "transition": transition,
                "session": record.view(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, S>(
    State(service): State<Arc<SurveyService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    let id = SessionId(session_id);
    match service.submit(&id) {
        Ok(submission) => {
            let payload = json!({
                "session_id": id,
                "submission": submission,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recommendations_handler<R, S>(
    State(service): State<Arc<SurveyService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    let id = SessionId(session_id);
    match service.recommendations(&id).await {
        Ok(cards) => {
            let payload = json!({
                "session_id": id,
                "results": cards,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: SurveyServiceError) -> Response {
    let status = match &err {
        SurveyServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SurveyServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SurveyServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SurveyServiceError::Incomplete(gap) => {
            let payload = json!({
                "error": err.to_string(),
                "gap": gap,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
        SurveyServiceError::Handoff(HandoffError::Empty) => StatusCode::NOT_FOUND,
        SurveyServiceError::Recommendation(RecommendationError::InFlight) => StatusCode::CONFLICT,
        SurveyServiceError::Recommendation(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
