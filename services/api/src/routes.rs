use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use ev_advisor::workflows::notifications::{parse_recipients, DispatchError, DispatchOutcome};
use ev_advisor::workflows::recommendation::RankingService;
use ev_advisor::workflows::survey::{survey_router, SessionRepository, SurveyService};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_SUBJECT: &str = "Your EV recommendations";

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationRequest {
    /// Comma-separated recipient list.
    pub(crate) to: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    pub(crate) text: String,
}

pub(crate) fn with_survey_routes<R, S>(service: Arc<SurveyService<R, S>>) -> axum::Router
where
    R: SessionRepository + 'static,
    S: RankingService + 'static,
{
    survey_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/notifications/recommendations",
            axum::routing::post(notification_endpoint),
        )
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

pub(crate) async fn notification_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<NotificationRequest>,
) -> impl IntoResponse {
    let recipients = parse_recipients(&payload.to);
    let subject = payload
        .subject
        .filter(|subject| !subject.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    match state
        .notifier
        .dispatch(&recipients, &subject, &payload.text)
        .await
    {
        Ok(report) => {
            let status = match report.outcome {
                DispatchOutcome::Delivered => StatusCode::OK,
                DispatchOutcome::Partial => StatusCode::MULTI_STATUS,
                DispatchOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = json!({
                "message": report.summary(),
                "report": report,
            });
            (status, Json(body))
        }
        Err(err @ DispatchError::NoRecipients) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        ),
    }
}
