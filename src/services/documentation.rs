use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Foosball Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::start_match,
        crate::routes::matches::end_match,
        crate::routes::matches::abort_match,
        crate::routes::matches::record_goal,
        crate::routes::matches::record_timeout,
        crate::routes::events::set_goal_voided,
        crate::routes::events::set_timeout_voided,
        crate::routes::sets::start_set,
        crate::routes::sets::complete_set,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::TeamInput,
            crate::dto::matches::MatchRulesInput,
            crate::dto::matches::MatchSummary,
            crate::dto::matches::MatchStatusDto,
            crate::dto::matches::MatchRulesSummary,
            crate::dto::matches::TeamSummary,
            crate::dto::matches::SetSummary,
            crate::dto::matches::SetStatusDto,
            crate::dto::matches::ScoreboardResponse,
            crate::dto::events::RecordGoalRequest,
            crate::dto::events::RecordTimeoutRequest,
            crate::dto::events::ScoringRowDto,
            crate::dto::events::SetVoidedRequest,
            crate::dto::events::CompleteSetRequest,
            crate::dto::events::GoalSummary,
            crate::dto::events::TimeoutSummary,
            crate::dto::events::GoalResponse,
            crate::dto::events::TimeoutResponse,
            crate::dto::events::ProgressionSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ProgressionEvent,
            crate::dto::sse::MatchStatusEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "matches", description = "Match setup, scoreboard and manual lifecycle"),
        (name = "events", description = "Goals, timeouts and referee corrections"),
        (name = "sets", description = "Explicit set actions"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sse/public",
            "/matches",
            "/matches/{id}",
            "/matches/{id}/goals",
            "/goals/{id}/voided",
            "/timeouts/{id}/voided",
            "/sets/{id}/complete",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
