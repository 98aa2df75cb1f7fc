use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::events::{GoalResponse, SetVoidedRequest, TimeoutResponse},
    error::AppError,
    services::scoring_service,
    state::SharedState,
};

/// Referee corrections on recorded goals and timeouts.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/goals/{id}/voided", put(set_goal_voided))
        .route("/timeouts/{id}/voided", put(set_timeout_voided))
}

#[utoipa::path(
    put,
    path = "/goals/{id}/voided",
    tag = "events",
    params(("id" = Uuid, Path, description = "Goal identifier")),
    request_body = SetVoidedRequest,
    responses(
        (status = 200, description = "Goal updated and set re-evaluated", body = GoalResponse),
        (status = 404, description = "Unknown goal")
    )
)]
/// Void or restore a goal.
pub async fn set_goal_voided(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SetVoidedRequest>>,
) -> Result<Json<GoalResponse>, AppError> {
    Ok(Json(
        scoring_service::set_goal_voided(&state, id, payload.voided).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/timeouts/{id}/voided",
    tag = "events",
    params(("id" = Uuid, Path, description = "Timeout identifier")),
    request_body = SetVoidedRequest,
    responses(
        (status = 200, description = "Timeout updated and set re-evaluated", body = TimeoutResponse),
        (status = 404, description = "Unknown timeout")
    )
)]
/// Void or restore a timeout.
pub async fn set_timeout_voided(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SetVoidedRequest>>,
) -> Result<Json<TimeoutResponse>, AppError> {
    Ok(Json(
        scoring_service::set_timeout_voided(&state, id, payload.voided).await?,
    ))
}
