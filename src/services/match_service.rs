use std::{sync::Arc, time::SystemTime};

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        match_store::{MatchStore, ProgressionWrite},
        models::{MatchEntity, MatchStatus, SetEntity, TeamEntity},
    },
    dto::matches::{CreateMatchRequest, MatchSummary, ScoreboardResponse, TeamInput},
    error::ServiceError,
    services::sse_events::broadcast_match_status,
    state::{
        Scoreboard, SharedState,
        state_machine::{MatchEvent, MatchStateMachine},
    },
};

/// Create a match in `not_started` together with its first set.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<ScoreboardResponse, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let store = state.require_store().await?;

    let CreateMatchRequest { teams, rules } = request;
    let [first, second]: [TeamInput; 2] = teams
        .try_into()
        .map_err(|_| ServiceError::InvalidInput("a match requires exactly two teams".into()))?;
    let rules = rules
        .unwrap_or_default()
        .resolve(state.config().match_defaults());

    let now = SystemTime::now();
    let match_id = Uuid::new_v4();
    let first_set = SetEntity::new(match_id, 1);
    let match_entity = MatchEntity {
        id: match_id,
        teams: [build_team(first), build_team(second)],
        rules,
        status: MatchStatus::NotStarted,
        start_time: None,
        end_time: None,
        sets: vec![first_set.id],
        current_set: Some(first_set.id),
        created_at: now,
        updated_at: now,
    };

    store
        .commit(ProgressionWrite {
            sets: vec![first_set.clone()],
            match_entity: Some(match_entity.clone()),
        })
        .await?;
    info!(match_id = %match_id, "match created");

    let scoreboard = Scoreboard {
        match_entity,
        sets: vec![first_set],
    };
    state.scoreboard().insert(scoreboard.clone());
    Ok(scoreboard.into())
}

/// Operator start: `not_started -> in_progress`.
pub async fn start_match(state: &SharedState, id: Uuid) -> Result<MatchSummary, ServiceError> {
    transition_match(state, id, MatchEvent::Start).await
}

/// Operator end: `in_progress -> completed`.
pub async fn end_match(state: &SharedState, id: Uuid) -> Result<MatchSummary, ServiceError> {
    transition_match(state, id, MatchEvent::End).await
}

/// Operator abort: `not_started | in_progress -> aborted`.
pub async fn abort_match(state: &SharedState, id: Uuid) -> Result<MatchSummary, ServiceError> {
    transition_match(state, id, MatchEvent::Abort).await
}

/// Match with every set, served from the scoreboard cache when possible.
///
/// A miss is loaded and cached under the match lock, so the entry always reflects one commit.
pub async fn get_scoreboard(
    state: &SharedState,
    id: Uuid,
) -> Result<ScoreboardResponse, ServiceError> {
    if let Some(cached) = state.scoreboard().get(id) {
        return Ok(cached.into());
    }

    let store = state.require_store().await?;
    let shared = state.clone();
    let scoreboard = state
        .run_locked(id, move || async move {
            if let Some(cached) = shared.scoreboard().get(id) {
                return Ok(cached);
            }
            let match_entity = load_match(&store, id).await?;
            let sets = store.list_sets(id).await?;
            let scoreboard = Scoreboard { match_entity, sets };
            shared.scoreboard().insert(scoreboard.clone());
            Ok(scoreboard)
        })
        .await?;
    Ok(scoreboard.into())
}

pub(crate) async fn load_match(
    store: &Arc<dyn MatchStore>,
    id: Uuid,
) -> Result<MatchEntity, ServiceError> {
    store
        .find_match(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))
}

async fn transition_match(
    state: &SharedState,
    id: Uuid,
    event: MatchEvent,
) -> Result<MatchSummary, ServiceError> {
    let store = state.require_store().await?;

    let entity = state
        .run_locked(id, move || async move {
            let mut entity = load_match(&store, id).await?;
            MatchStateMachine::apply(&mut entity, event, SystemTime::now())
                .map_err(|err| ServiceError::InvalidState(err.to_string()))?;
            store.save_match(entity.clone()).await?;
            Ok(entity)
        })
        .await?;

    info!(match_id = %id, ?event, status = ?entity.status, "match transitioned");
    state.scoreboard().invalidate(id);
    broadcast_match_status(state, id, entity.status);
    Ok(entity.into())
}

fn build_team(input: TeamInput) -> TeamEntity {
    TeamEntity {
        name: input.name.trim().to_owned(),
        players: input
            .players
            .into_iter()
            .map(|player| player.trim().to_owned())
            .collect(),
        sets_won: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::InMemoryMatchStore,
        dto::matches::{MatchStatusDto, SetStatusDto},
        state::AppState,
    };

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_store(Arc::new(InMemoryMatchStore::new())).await;
        state
    }

    fn request(json: &str) -> CreateMatchRequest {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn create_match_builds_first_set() {
        let state = ready_state().await;
        let created = create_match(
            &state,
            request(
                r#"{ "teams": [{ "name": " Blue " }, { "name": "Red" }], "rules": { "num_goals_to_win": 10 } }"#,
            ),
        )
        .await
        .unwrap();

        assert_eq!(created.match_summary.status, MatchStatusDto::NotStarted);
        assert_eq!(created.match_summary.teams[0].name, "Blue");
        assert_eq!(created.match_summary.rules.num_goals_to_win, 10);
        assert_eq!(created.match_summary.rules.num_sets_to_win, 2);
        assert_eq!(created.sets.len(), 1);
        assert_eq!(created.sets[0].set_number, 1);
        assert_eq!(created.sets[0].status, SetStatusDto::NotStarted);
        assert_eq!(
            created.match_summary.current_set,
            Some(created.sets[0].id)
        );

        state.scoreboard().invalidate(created.match_summary.id);
        let loaded = get_scoreboard(&state, created.match_summary.id)
            .await
            .unwrap();
        assert_eq!(loaded.sets[0].id, created.sets[0].id);
    }

    #[tokio::test]
    async fn create_match_requires_two_teams() {
        let state = ready_state().await;
        let err = create_match(&state, request(r#"{ "teams": [{ "name": "Solo" }] }"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn degraded_state_refuses_writes() {
        let state = AppState::new(AppConfig::default());
        let err = create_match(
            &state,
            request(r#"{ "teams": [{ "name": "Blue" }, { "name": "Red" }] }"#),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test]
    async fn manual_transitions_follow_the_lifecycle() {
        let state = ready_state().await;
        let created = create_match(
            &state,
            request(r#"{ "teams": [{ "name": "Blue" }, { "name": "Red" }] }"#),
        )
        .await
        .unwrap();
        let id = created.match_summary.id;
        let mut events = state.public_sse().subscribe();

        let err = end_match(&state, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let started = start_match(&state, id).await.unwrap();
        assert_eq!(started.status, MatchStatusDto::InProgress);
        assert!(started.start_time.is_some());
        assert_eq!(
            events.recv().await.unwrap().event.as_deref(),
            Some("match.status")
        );

        let aborted = abort_match(&state, id).await.unwrap();
        assert_eq!(aborted.status, MatchStatusDto::Aborted);
        assert!(aborted.end_time.is_some());

        let err = start_match(&state, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let board = get_scoreboard(&state, id).await.unwrap();
        assert_eq!(board.match_summary.status, MatchStatusDto::Aborted);
    }

    #[tokio::test]
    async fn scoreboard_miss_waits_for_in_flight_mutation() {
        let state = ready_state().await;
        let created = create_match(
            &state,
            request(r#"{ "teams": [{ "name": "Blue" }, { "name": "Red" }] }"#),
        )
        .await
        .unwrap();
        let id = created.match_summary.id;
        state.scoreboard().invalidate(id);

        let store = state.require_store().await.unwrap();
        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let writer = tokio::spawn({
            let state = state.clone();
            async move {
                state
                    .run_locked(id, move || async move {
                        let _ = locked_tx.send(());
                        let _ = release_rx.await;
                        let mut entity = load_match(&store, id).await?;
                        MatchStateMachine::apply(&mut entity, MatchEvent::Start, SystemTime::now())
                            .map_err(|err| ServiceError::InvalidState(err.to_string()))?;
                        store.save_match(entity).await?;
                        Ok(())
                    })
                    .await
            }
        });
        locked_rx.await.unwrap();

        let reader = tokio::spawn({
            let state = state.clone();
            async move { get_scoreboard(&state, id).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!reader.is_finished());

        release_tx.send(()).unwrap();
        writer.await.unwrap().unwrap();
        let board = reader.await.unwrap().unwrap();
        assert_eq!(board.match_summary.status, MatchStatusDto::InProgress);
        assert_eq!(
            state.scoreboard().get(id).unwrap().match_entity.status,
            MatchStatus::InProgress
        );
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let state = ready_state().await;
        let err = get_scoreboard(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
