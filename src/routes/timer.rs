use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::timer::{TimerDurationRequest, TimerSnapshot},
    error::AppError,
    routes::organizer_token,
    services::timer_service,
    state::SharedState,
};

/// Timer command endpoints. Every command requires the organizer token;
/// the snapshot endpoint is public so late joiners can poll before the
/// websocket is up.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{id}/timer", get(get_timer))
        .route("/sessions/{id}/timer/start", post(start_timer))
        .route("/sessions/{id}/timer/pause", post(pause_timer))
        .route("/sessions/{id}/timer/resume", post(resume_timer))
        .route("/sessions/{id}/timer/stop", post(stop_timer))
        .route("/sessions/{id}/timer/reset", post(reset_timer))
}

/// Start a countdown; a running one restarts from the full duration.
#[utoipa::path(
    post,
    path = "/sessions/{id}/timer/start",
    tag = "timer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer token issued at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    request_body(content = TimerDurationRequest, description = "Optional duration override"),
    responses((status = 200, description = "Timer started", body = TimerSnapshot))
)]
pub async fn start_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    payload: Option<Json<TimerDurationRequest>>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let token = organizer_token(&headers)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(
        timer_service::start_timer(&state, id, &token, payload).await?,
    ))
}

/// Freeze the running countdown.
#[utoipa::path(
    post,
    path = "/sessions/{id}/timer/pause",
    tag = "timer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer token issued at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Timer paused", body = TimerSnapshot))
)]
pub async fn pause_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<TimerSnapshot>, AppError> {
    let token = organizer_token(&headers)?;
    Ok(Json(timer_service::pause_timer(&state, id, &token).await?))
}

/// Continue a paused countdown where it left off.
#[utoipa::path(
    post,
    path = "/sessions/{id}/timer/resume",
    tag = "timer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer token issued at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Timer resumed", body = TimerSnapshot))
)]
pub async fn resume_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<TimerSnapshot>, AppError> {
    let token = organizer_token(&headers)?;
    Ok(Json(timer_service::resume_timer(&state, id, &token).await?))
}

/// Clear any countdown and return the timer to its neutral state.
#[utoipa::path(
    post,
    path = "/sessions/{id}/timer/stop",
    tag = "timer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer token issued at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Timer stopped", body = TimerSnapshot))
)]
pub async fn stop_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<TimerSnapshot>, AppError> {
    let token = organizer_token(&headers)?;
    Ok(Json(timer_service::stop_timer(&state, id, &token).await?))
}

/// Stop, then immediately start a fresh countdown.
#[utoipa::path(
    post,
    path = "/sessions/{id}/timer/reset",
    tag = "timer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer token issued at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    request_body(content = TimerDurationRequest, description = "Optional duration override"),
    responses((status = 200, description = "Timer reset", body = TimerSnapshot))
)]
pub async fn reset_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    payload: Option<Json<TimerDurationRequest>>,
) -> Result<Json<TimerSnapshot>, AppError> {
    let token = organizer_token(&headers)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(
        timer_service::reset_timer(&state, id, &token, payload).await?,
    ))
}

/// Read the timer's current state without joining the websocket.
#[utoipa::path(
    get,
    path = "/sessions/{id}/timer",
    tag = "timer",
    params(("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Current timer state", body = TimerSnapshot))
)]
pub async fn get_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimerSnapshot>, AppError> {
    Ok(Json(timer_service::timer_snapshot(&state, id).await?))
}
