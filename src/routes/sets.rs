use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::events::{CompleteSetRequest, ProgressionSummary},
    error::AppError,
    services::scoring_service,
    state::SharedState,
};

/// Explicit set actions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sets/{id}/start", post(start_set))
        .route("/sets/{id}/complete", post(complete_set))
}

#[utoipa::path(
    post,
    path = "/sets/{id}/start",
    tag = "sets",
    params(("id" = Uuid, Path, description = "Set identifier")),
    responses(
        (status = 200, description = "Set started", body = ProgressionSummary),
        (status = 404, description = "Unknown set"),
        (status = 409, description = "Set already started")
    )
)]
/// Start a set before its first event.
pub async fn start_set(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressionSummary>, AppError> {
    Ok(Json(scoring_service::start_set(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/sets/{id}/complete",
    tag = "sets",
    params(("id" = Uuid, Path, description = "Set identifier")),
    request_body = CompleteSetRequest,
    responses(
        (status = 200, description = "Set completed and match re-evaluated", body = ProgressionSummary),
        (status = 400, description = "Winner is not 0 or 1"),
        (status = 404, description = "Unknown set"),
        (status = 409, description = "Set is not in progress")
    )
)]
/// Complete an in-progress set with the given winner, whatever the score.
pub async fn complete_set(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<CompleteSetRequest>>,
) -> Result<Json<ProgressionSummary>, AppError> {
    Ok(Json(scoring_service::complete_set(&state, id, payload).await?))
}
