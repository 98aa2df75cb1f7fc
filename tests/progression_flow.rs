use std::sync::Arc;

use foosball_back::{
    config::AppConfig,
    dao::match_store::InMemoryMatchStore,
    dto::{
        events::{GoalResponse, RecordGoalRequest},
        matches::{CreateMatchRequest, MatchStatusDto, SetStatusDto},
    },
    services::{match_service, scoring_service},
    state::{AppState, SharedState},
};
use uuid::Uuid;

async fn setup() -> (SharedState, Uuid) {
    let state = AppState::new(AppConfig::default());
    state.set_store(Arc::new(InMemoryMatchStore::new())).await;

    let request: CreateMatchRequest = serde_json::from_str(
        r#"{
            "teams": [
                { "name": "Blue", "players": ["Ana", "Ben"] },
                { "name": "Red", "players": ["Cleo", "Dan"] }
            ]
        }"#,
    )
    .unwrap();
    let created = match_service::create_match(&state, request).await.unwrap();
    (state, created.match_summary.id)
}

async fn score(state: &SharedState, match_id: Uuid, team_index: u8, goals: u32) -> GoalResponse {
    let mut last = None;
    for _ in 0..goals {
        let request = RecordGoalRequest {
            team_index,
            set_id: None,
            scoring_row: None,
        };
        last = Some(
            scoring_service::record_goal(state, match_id, request)
                .await
                .unwrap(),
        );
    }
    last.unwrap()
}

#[tokio::test]
async fn best_of_three_with_deciding_set_correction() {
    let (state, match_id) = setup().await;

    let set_one = score(&state, match_id, 0, 5).await.progression;
    assert!(set_one.set_completed);
    assert!(set_one.new_set_created);
    assert!(!set_one.match_completed);
    assert_eq!(set_one.set.unwrap().winner, Some(0));

    let set_two = score(&state, match_id, 1, 5).await.progression;
    assert!(set_two.new_set_created);
    let summary = set_two.match_summary.unwrap();
    assert_eq!(
        (summary.teams[0].sets_won, summary.teams[1].sets_won),
        (1, 1)
    );

    // Deciding set: 5-4 is not enough.
    score(&state, match_id, 0, 4).await;
    score(&state, match_id, 1, 4).await;
    let five_four = score(&state, match_id, 0, 1).await.progression;
    assert!(!five_four.set_completed);
    assert_eq!(five_four.set.unwrap().status, SetStatusDto::InProgress);

    let decisive = score(&state, match_id, 0, 1).await;
    let progression = decisive.progression;
    assert!(progression.set_completed);
    assert!(progression.match_completed);
    assert!(!progression.new_set_created);
    let finished = progression.match_summary.unwrap();
    assert_eq!(finished.status, MatchStatusDto::Completed);
    assert!(finished.end_time.is_some());
    assert_eq!(finished.sets.len(), 3);

    // The referee voids the decisive goal.
    let corrected = scoring_service::set_goal_voided(&state, decisive.goal.id, true)
        .await
        .unwrap()
        .progression;
    assert!(corrected.match_reopened);
    let set = corrected.set.unwrap();
    assert_eq!(set.status, SetStatusDto::InProgress);
    assert_eq!(set.scores, [5, 4]);
    let reopened = corrected.match_summary.unwrap();
    assert_eq!(reopened.status, MatchStatusDto::InProgress);
    assert!(reopened.end_time.is_none());
    assert_eq!(
        (reopened.teams[0].sets_won, reopened.teams[1].sets_won),
        (1, 1)
    );

    // And changes their mind.
    let restored = scoring_service::set_goal_voided(&state, decisive.goal.id, false)
        .await
        .unwrap()
        .progression;
    assert!(restored.match_completed);
    assert!(!restored.new_set_created);

    let board = match_service::get_scoreboard(&state, match_id).await.unwrap();
    assert_eq!(board.match_summary.status, MatchStatusDto::Completed);
    assert_eq!(board.sets.len(), 3);
    assert_eq!(board.sets[2].scores, [6, 4]);
    assert_eq!(board.sets[2].winner, Some(0));
}

#[tokio::test]
async fn completed_match_refuses_new_goals() {
    let (state, match_id) = setup().await;
    score(&state, match_id, 1, 5).await;
    let last = score(&state, match_id, 1, 5).await;
    assert!(last.progression.match_completed);

    let request = RecordGoalRequest {
        team_index: 0,
        set_id: None,
        scoring_row: None,
    };
    assert!(
        scoring_service::record_goal(&state, match_id, request)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn progression_is_published_on_the_public_stream() {
    let (state, match_id) = setup().await;
    let mut events = state.public_sse().subscribe();

    score(&state, match_id, 0, 1).await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.event.as_deref(), Some("progression"));
    let body: serde_json::Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(body["match_id"], match_id.to_string());
    assert_eq!(body["set"]["scores"], serde_json::json!([1, 0]));
    assert_eq!(body["match"]["status"], "in_progress");
    assert_eq!(body["set_completed"], false);
    assert_eq!(body["match_reopened"], false);
}
