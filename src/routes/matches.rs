use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        events::{GoalResponse, RecordGoalRequest, RecordTimeoutRequest, TimeoutResponse},
        matches::{CreateMatchRequest, MatchSummary, ScoreboardResponse},
    },
    error::AppError,
    services::{match_service, scoring_service},
    state::SharedState,
};

/// Match setup, manual lifecycle and event recording.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/start", post(start_match))
        .route("/matches/{id}/end", post(end_match))
        .route("/matches/{id}/abort", post(abort_match))
        .route("/matches/{id}/goals", post(record_goal))
        .route("/matches/{id}/timeouts", post(record_timeout))
}

/// Create a match and its first set.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = ScoreboardResponse),
        (status = 400, description = "Invalid teams or rules"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<ScoreboardResponse>), AppError> {
    let created = match_service::create_match(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Scoreboard of a match: the match and every set.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Scoreboard", body = ScoreboardResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreboardResponse>, AppError> {
    Ok(Json(match_service::get_scoreboard(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/start",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match started", body = MatchSummary),
        (status = 409, description = "Match is not in `not_started`")
    )
)]
/// Start a match before its first event.
pub async fn start_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::start_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/end",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match ended", body = MatchSummary),
        (status = 409, description = "Match is not in `in_progress`")
    )
)]
/// End a running match.
pub async fn end_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::end_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/abort",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match aborted", body = MatchSummary),
        (status = 409, description = "Match already completed or aborted")
    )
)]
/// Abort a match for good.
pub async fn abort_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::abort_match(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/goals",
    tag = "events",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = RecordGoalRequest,
    responses(
        (status = 201, description = "Goal recorded", body = GoalResponse),
        (status = 404, description = "Unknown match or set"),
        (status = 409, description = "Match no longer accepts events")
    )
)]
/// Record a goal in the current set, or in `set_id` when given.
pub async fn record_goal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RecordGoalRequest>>,
) -> Result<(StatusCode, Json<GoalResponse>), AppError> {
    let recorded = scoring_service::record_goal(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

#[utoipa::path(
    post,
    path = "/matches/{id}/timeouts",
    tag = "events",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = RecordTimeoutRequest,
    responses(
        (status = 201, description = "Timeout recorded", body = TimeoutResponse),
        (status = 404, description = "Unknown match or set"),
        (status = 409, description = "No timeout left, or match no longer accepts events")
    )
)]
/// Record a timeout in the current set, or in `set_id` when given.
pub async fn record_timeout(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RecordTimeoutRequest>>,
) -> Result<(StatusCode, Json<TimeoutResponse>), AppError> {
    let recorded = scoring_service::record_timeout(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}
