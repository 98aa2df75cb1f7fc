//! Scoring mutations: every goal, timeout and set action runs through the progression engine
//! while the owning match is locked, then the outcome is published.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{GoalEntity, MatchEntity, MatchStatus, SetEntity, TeamIndex, TimeoutEntity},
    },
    dto::events::{
        CompleteSetRequest, GoalResponse, ProgressionSummary, RecordGoalRequest,
        RecordTimeoutRequest, TimeoutResponse,
    },
    error::ServiceError,
    progression::{ProgressionEngine, ProgressionResult},
    services::{match_service::load_match, sse_events::broadcast_progression},
    state::SharedState,
};

/// Record a goal and progress its set.
pub async fn record_goal(
    state: &SharedState,
    match_id: Uuid,
    request: RecordGoalRequest,
) -> Result<GoalResponse, ServiceError> {
    let team_index = parse_team_index(request.team_index)?;
    let store = state.require_store().await?;

    let (goal, result) = state
        .run_locked(match_id, move || async move {
            let match_entity = load_match(&store, match_id).await?;
            ensure_accepts_events(&match_entity)?;
            let set = target_set(&store, &match_entity, request.set_id).await?;

            let goal = GoalEntity {
                id: Uuid::new_v4(),
                match_id,
                set_id: set.id,
                team_index,
                timestamp: SystemTime::now(),
                scoring_row: request.scoring_row.map(Into::into),
                voided: false,
            };
            store.save_goal(goal.clone()).await?;
            debug!(match_id = %match_id, goal_id = %goal.id, team = %team_index, "goal recorded");

            let result = ProgressionEngine::new(store)
                .process_goal_progression(&goal)
                .await?;
            Ok((goal, result))
        })
        .await?;

    Ok(GoalResponse {
        goal: goal.into(),
        progression: publish(state, match_id, result),
    })
}

/// Void or restore a goal and progress its set.
pub async fn set_goal_voided(
    state: &SharedState,
    goal_id: Uuid,
    voided: bool,
) -> Result<GoalResponse, ServiceError> {
    let store = state.require_store().await?;
    let match_id = find_goal(&store, goal_id).await?.match_id;

    let (goal, result) = state
        .run_locked(match_id, move || async move {
            let mut goal = find_goal(&store, goal_id).await?;
            if goal.voided != voided {
                goal.voided = voided;
                store.save_goal(goal.clone()).await?;
                debug!(goal_id = %goal_id, voided, "goal voided flag changed");
            }

            let result = ProgressionEngine::new(store)
                .process_goal_voiding_progression(&goal)
                .await?;
            Ok((goal, result))
        })
        .await?;

    Ok(GoalResponse {
        goal: goal.into(),
        progression: publish(state, match_id, result),
    })
}

/// Record a timeout, refusing it when the team used up its allowance for the set.
pub async fn record_timeout(
    state: &SharedState,
    match_id: Uuid,
    request: RecordTimeoutRequest,
) -> Result<TimeoutResponse, ServiceError> {
    let team_index = parse_team_index(request.team_index)?;
    let store = state.require_store().await?;

    let (timeout, result) = state
        .run_locked(match_id, move || async move {
            let match_entity = load_match(&store, match_id).await?;
            ensure_accepts_events(&match_entity)?;
            let set = target_set(&store, &match_entity, request.set_id).await?;

            let used = store
                .list_timeouts(set.id)
                .await?
                .iter()
                .filter(|timeout| !timeout.voided && timeout.team_index == team_index)
                .count();
            let allowed = match_entity.rules.timeouts_per_set as usize;
            if used >= allowed {
                return Err(ServiceError::InvalidState(format!(
                    "team {team_index} already used {used} of {allowed} timeouts in set {}",
                    set.set_number
                )));
            }

            let timeout = TimeoutEntity {
                id: Uuid::new_v4(),
                match_id,
                set_id: set.id,
                team_index,
                timestamp: SystemTime::now(),
                voided: false,
            };
            store.save_timeout(timeout.clone()).await?;
            debug!(match_id = %match_id, timeout_id = %timeout.id, team = %team_index, "timeout recorded");

            let result = ProgressionEngine::new(store)
                .process_timeout_progression(&timeout)
                .await?;
            Ok((timeout, result))
        })
        .await?;

    Ok(TimeoutResponse {
        timeout: timeout.into(),
        progression: publish(state, match_id, result),
    })
}

/// Void or restore a timeout and progress its set.
pub async fn set_timeout_voided(
    state: &SharedState,
    timeout_id: Uuid,
    voided: bool,
) -> Result<TimeoutResponse, ServiceError> {
    let store = state.require_store().await?;
    let match_id = find_timeout(&store, timeout_id).await?.match_id;

    let (timeout, result) = state
        .run_locked(match_id, move || async move {
            let mut timeout = find_timeout(&store, timeout_id).await?;
            if timeout.voided != voided {
                timeout.voided = voided;
                store.save_timeout(timeout.clone()).await?;
                debug!(timeout_id = %timeout_id, voided, "timeout voided flag changed");
            }

            let result = ProgressionEngine::new(store)
                .process_timeout_voiding_progression(&timeout)
                .await?;
            Ok((timeout, result))
        })
        .await?;

    Ok(TimeoutResponse {
        timeout: timeout.into(),
        progression: publish(state, match_id, result),
    })
}

/// Explicitly start a set that has no events yet.
pub async fn start_set(
    state: &SharedState,
    set_id: Uuid,
) -> Result<ProgressionSummary, ServiceError> {
    let store = state.require_store().await?;
    let match_id = find_set(&store, set_id).await?.match_id;

    let result = state
        .run_locked(match_id, move || async move {
            Ok(ProgressionEngine::new(store)
                .process_set_start(set_id)
                .await?)
        })
        .await?;

    Ok(publish(state, match_id, result))
}

/// Operator-forced completion of an in-progress set.
pub async fn complete_set(
    state: &SharedState,
    set_id: Uuid,
    request: CompleteSetRequest,
) -> Result<ProgressionSummary, ServiceError> {
    let winner = request.winner;
    let store = state.require_store().await?;
    let match_id = find_set(&store, set_id).await?.match_id;

    let result = state
        .run_locked(match_id, move || async move {
            Ok(ProgressionEngine::new(store)
                .process_manual_set_completion(set_id, winner)
                .await?)
        })
        .await?;

    info!(match_id = %match_id, set_id = %set_id, winner, "set completed manually");
    Ok(publish(state, match_id, result))
}

fn publish(state: &SharedState, match_id: Uuid, result: ProgressionResult) -> ProgressionSummary {
    if result.match_entity.is_none() {
        state.scoreboard().invalidate(match_id);
    } else {
        state.scoreboard().apply_progression(&result);
    }

    let summary = ProgressionSummary::from(result);
    broadcast_progression(state, match_id, summary.clone());
    summary
}

fn parse_team_index(value: u8) -> Result<TeamIndex, ServiceError> {
    TeamIndex::new(value)
        .ok_or_else(|| ServiceError::InvalidInput(format!("team_index must be 0 or 1 (got {value})")))
}

fn ensure_accepts_events(match_entity: &MatchEntity) -> Result<(), ServiceError> {
    match match_entity.status {
        MatchStatus::NotStarted | MatchStatus::InProgress => Ok(()),
        status => Err(ServiceError::InvalidState(format!(
            "match `{}` is {status:?} and no longer accepts events",
            match_entity.id
        ))),
    }
}

async fn target_set(
    store: &Arc<dyn MatchStore>,
    match_entity: &MatchEntity,
    requested: Option<Uuid>,
) -> Result<SetEntity, ServiceError> {
    let set_id = requested.or(match_entity.current_set).ok_or_else(|| {
        ServiceError::InvalidState(format!("match `{}` has no current set", match_entity.id))
    })?;

    let set = find_set(store, set_id).await?;
    if set.match_id != match_entity.id {
        return Err(ServiceError::InvalidInput(format!(
            "set `{set_id}` does not belong to match `{}`",
            match_entity.id
        )));
    }
    Ok(set)
}

async fn find_set(store: &Arc<dyn MatchStore>, id: Uuid) -> Result<SetEntity, ServiceError> {
    store
        .find_set(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("set `{id}` not found")))
}

async fn find_goal(store: &Arc<dyn MatchStore>, id: Uuid) -> Result<GoalEntity, ServiceError> {
    store
        .find_goal(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("goal `{id}` not found")))
}

async fn find_timeout(
    store: &Arc<dyn MatchStore>,
    id: Uuid,
) -> Result<TimeoutEntity, ServiceError> {
    store
        .find_timeout(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("timeout `{id}` not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::InMemoryMatchStore,
        dto::matches::{CreateMatchRequest, MatchStatusDto, SetStatusDto},
        services::match_service,
        state::AppState,
    };

    struct Fixture {
        state: SharedState,
        match_id: Uuid,
        first_set: Uuid,
    }

    async fn fixture(rules: &str) -> Fixture {
        let state = AppState::new(AppConfig::default());
        state.set_store(Arc::new(InMemoryMatchStore::new())).await;
        let request: CreateMatchRequest = serde_json::from_str(&format!(
            r#"{{ "teams": [{{ "name": "Blue" }}, {{ "name": "Red" }}], "rules": {rules} }}"#
        ))
        .unwrap();
        let created = match_service::create_match(&state, request).await.unwrap();
        Fixture {
            match_id: created.match_summary.id,
            first_set: created.sets[0].id,
            state,
        }
    }

    fn goal(team_index: u8) -> RecordGoalRequest {
        RecordGoalRequest {
            team_index,
            set_id: None,
            scoring_row: None,
        }
    }

    fn timeout(team_index: u8) -> RecordTimeoutRequest {
        RecordTimeoutRequest {
            team_index,
            set_id: None,
        }
    }

    #[tokio::test]
    async fn goals_target_the_current_set() {
        let fx = fixture(r#"{ "num_goals_to_win": 2 }"#).await;

        let first = record_goal(&fx.state, fx.match_id, goal(0)).await.unwrap();
        assert_eq!(first.goal.set_id, fx.first_set);
        let match_summary = first.progression.match_summary.unwrap();
        assert_eq!(match_summary.status, MatchStatusDto::InProgress);

        let second = record_goal(&fx.state, fx.match_id, goal(0)).await.unwrap();
        assert!(second.progression.set_completed);
        assert!(second.progression.new_set_created);
        let next_set = second.progression.match_summary.unwrap().current_set.unwrap();
        assert_ne!(next_set, fx.first_set);

        let third = record_goal(&fx.state, fx.match_id, goal(1)).await.unwrap();
        assert_eq!(third.goal.set_id, next_set);
    }

    #[tokio::test]
    async fn voiding_reopens_and_broadcasts() {
        let fx = fixture(r#"{ "num_goals_to_win": 1 }"#).await;
        let mut events = fx.state.public_sse().subscribe();

        let scored = record_goal(&fx.state, fx.match_id, goal(1)).await.unwrap();
        assert!(scored.progression.set_completed);
        assert_eq!(
            events.recv().await.unwrap().event.as_deref(),
            Some("progression")
        );

        let voided = set_goal_voided(&fx.state, scored.goal.id, true)
            .await
            .unwrap();
        assert!(voided.goal.voided);
        let set = voided.progression.set.unwrap();
        assert_eq!(set.status, SetStatusDto::InProgress);
        assert_eq!(set.scores, [0, 0]);
        assert!(set.winner.is_none());

        let board = match_service::get_scoreboard(&fx.state, fx.match_id)
            .await
            .unwrap();
        assert_eq!(board.match_summary.current_set, Some(fx.first_set));
        assert_eq!(board.match_summary.teams[1].sets_won, 0);
    }

    #[tokio::test]
    async fn scoreboard_reflects_progression() {
        let fx = fixture(r#"{ "num_goals_to_win": 3 }"#).await;
        let before = match_service::get_scoreboard(&fx.state, fx.match_id)
            .await
            .unwrap();
        assert_eq!(before.sets[0].scores, [0, 0]);

        record_goal(&fx.state, fx.match_id, goal(0)).await.unwrap();

        let after = match_service::get_scoreboard(&fx.state, fx.match_id)
            .await
            .unwrap();
        assert_eq!(after.sets[0].scores, [1, 0]);
        assert_eq!(after.match_summary.status, MatchStatusDto::InProgress);
    }

    #[tokio::test]
    async fn timeouts_are_capped_per_team() {
        let fx = fixture(r#"{ "timeouts_per_set": 1 }"#).await;

        let first = record_timeout(&fx.state, fx.match_id, timeout(0)).await.unwrap();
        assert_eq!(
            first.progression.set.unwrap().timeouts_used,
            [1, 0]
        );

        let refused = record_timeout(&fx.state, fx.match_id, timeout(0))
            .await
            .unwrap_err();
        assert!(matches!(refused, ServiceError::InvalidState(_)));

        record_timeout(&fx.state, fx.match_id, timeout(1)).await.unwrap();

        set_timeout_voided(&fx.state, first.timeout.id, true)
            .await
            .unwrap();
        let again = record_timeout(&fx.state, fx.match_id, timeout(0)).await.unwrap();
        assert_eq!(again.progression.set.unwrap().timeouts_used, [1, 1]);
    }

    #[tokio::test]
    async fn aborted_match_refuses_goals() {
        let fx = fixture("{}").await;
        match_service::abort_match(&fx.state, fx.match_id)
            .await
            .unwrap();

        let err = record_goal(&fx.state, fx.match_id, goal(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn foreign_set_is_rejected() {
        let fx = fixture("{}").await;
        let request: CreateMatchRequest =
            serde_json::from_str(r#"{ "teams": [{ "name": "Green" }, { "name": "Gold" }] }"#)
                .unwrap();
        let other = match_service::create_match(&fx.state, request)
            .await
            .unwrap();

        let request = RecordGoalRequest {
            set_id: Some(other.sets[0].id),
            ..goal(0)
        };
        let err = record_goal(&fx.state, fx.match_id, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let unknown = RecordGoalRequest {
            set_id: Some(Uuid::new_v4()),
            ..goal(0)
        };
        let err = record_goal(&fx.state, fx.match_id, unknown).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn set_actions_go_through_the_engine() {
        let fx = fixture("{}").await;

        let started = start_set(&fx.state, fx.first_set).await.unwrap();
        assert_eq!(started.set.unwrap().status, SetStatusDto::InProgress);
        assert_eq!(
            started.match_summary.unwrap().status,
            MatchStatusDto::InProgress
        );

        let refused = start_set(&fx.state, fx.first_set).await.unwrap_err();
        assert!(matches!(refused, ServiceError::InvalidState(_)));

        let bad_winner = complete_set(&fx.state, fx.first_set, CompleteSetRequest { winner: 2 })
            .await
            .unwrap_err();
        assert!(matches!(bad_winner, ServiceError::InvalidInput(_)));

        let completed = complete_set(&fx.state, fx.first_set, CompleteSetRequest { winner: 1 })
            .await
            .unwrap();
        assert!(completed.set_completed);
        assert!(completed.new_set_created);
        assert_eq!(completed.set.unwrap().winner, Some(1));
    }
}
